//! 二陣営の戦車戦シミュレーション
//!
//! 数千両の戦車が経路探索で目的地へ進軍し、最寄りの敵へロケットを発射します。
//! 戦車同士の分離とロケットの命中判定はワーカープール上で並列に処理され、
//! 生存戦車の凸包（フォースフィールド）が外へ出たロケットを除去します。

pub mod collision;
pub mod forcefield;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;
pub mod terrain;
