//! 衝突判定システム
//!
//! 戦車同士の分離（broad phase）とロケット命中判定（narrow phase）を
//! ワーカープール上で範囲分割して並列実行します。共有状態への書き込みは
//! 単一のロックで保護された短いクリティカルセクションに限定されます。

pub mod broad_phase;
pub mod narrow_phase;

pub use broad_phase::{Bound, BoundKind, build_bounds, resolve_tank_collisions, sweep};
pub use narrow_phase::{NarrowPhaseOutcome, TankProbe, find_hit, resolve_rocket_collisions, sorted_probes};

/// `len` 要素を `workers` 個のワーカーに割り当てる際の1チャンクの長さ（切り上げ除算）
pub(crate) fn chunk_len(len: usize, workers: usize) -> usize {
    len.div_ceil(workers.max(1)).max(1)
}
