// 基本的なデータ型と幾何ユーティリティ
pub mod common;

// エージェントの基本インターフェース（trait）定義
pub mod traits;

// 各モデルの実装
pub mod tank;
pub mod rocket;
pub mod particle_beam;
pub mod effects;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use tank::{Tank, find_closest_enemy};
pub use rocket::{Rocket, RocketEndReason};
pub use particle_beam::ParticleBeam;
pub use effects::{Explosion, Smoke, tick_and_compact};
