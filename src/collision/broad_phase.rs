//! 戦車同士の分離処理（sweep & prune）
//!
//! アクティブな戦車ごとにx軸上の区間端点（開始・終了）を作成してソートし、
//! 左から走査しながら「区間が現在の走査位置を含む戦車」の集合を保持します。
//! 開始イベントでは集合内の各戦車とy方向の距離のみを比較し、重なっていれば
//! 双方に互いから離れる向きの押し出しを加えます。
//!
//! 並列実行時はソート済み端点配列を連続したチャンクに分割し、各ワーカーが
//! 独自の集合で走査します。チャンク境界をまたぐペアは検出されません。

use crate::collision::chunk_len;
use crate::models::{
    common::{Vec2, direction_or_zero},
    tank::Tank,
    traits::IAgent,
};
use parking_lot::Mutex;
use rayon::ThreadPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// 区間端点の種別
///
/// 同一座標では開始が終了より先に並びます（接触する区間も重なりとして扱う）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BoundKind {
    Start,
    End,
}

/// x軸上の区間端点
#[derive(Debug, Clone, Copy)]
pub struct Bound {
    pub x: f32,
    pub kind: BoundKind,
    /// 戦車配列上のインデックス
    pub agent: usize,
    pub center: Vec2,
    pub radius: f32,
}

/// アクティブな戦車の区間端点を作成し、座標順にソート
pub fn build_bounds(tanks: &[Tank]) -> Vec<Bound> {
    let mut bounds = Vec::with_capacity(tanks.len() * 2);

    for (index, tank) in tanks.iter().enumerate() {
        if !tank.is_active() {
            continue;
        }
        let radius = tank.collision_radius;
        bounds.push(Bound {
            x: tank.position.x - radius,
            kind: BoundKind::Start,
            agent: index,
            center: tank.position,
            radius,
        });
        bounds.push(Bound {
            x: tank.position.x + radius,
            kind: BoundKind::End,
            agent: index,
            center: tank.position,
            radius,
        });
    }

    bounds.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.kind.cmp(&b.kind)));
    bounds
}

/// y方向の重なり判定（平方根を使わない1次元比較）
fn y_overlap(a: &Bound, b: &Bound) -> bool {
    (a.center.y - b.center.y).abs() < a.radius + b.radius
}

/// ソート済み端点列を走査し、重なっている戦車ペアを列挙
///
/// 端点列の途中から走査を始めた場合、開始端点を持たない戦車は集合に入らず、
/// その戦車を含むペアは検出されません。
pub fn sweep(bounds: &[Bound]) -> Vec<(usize, usize)> {
    let mut active: Vec<&Bound> = Vec::new();
    let mut pairs = Vec::new();

    for bound in bounds {
        match bound.kind {
            BoundKind::Start => {
                for other in &active {
                    if y_overlap(bound, other) {
                        pairs.push((other.agent, bound.agent));
                    }
                }
                active.push(bound);
            }
            BoundKind::End => {
                if let Some(slot) = active.iter().position(|b| b.agent == bound.agent) {
                    active.swap_remove(slot);
                }
            }
        }
    }

    pairs
}

/// 重なっている戦車ペアに押し出しを加える
///
/// 端点配列をワーカー数で分割して並列に走査し、各ワーカーは検出したペアの
/// 押し出しをロックを1回取得してまとめて適用します。
///
/// # 戻り値
///
/// 検出したペア数
pub fn resolve_tank_collisions(pool: &ThreadPool, tanks: &mut [Tank], nudge_magnitude: f32) -> usize {
    let bounds = build_bounds(tanks);
    if bounds.is_empty() {
        return 0;
    }

    let chunk = chunk_len(bounds.len(), pool.current_num_threads());
    let shared = Mutex::new(tanks);
    let pair_count = AtomicUsize::new(0);

    pool.scope(|scope| {
        for chunk_bounds in bounds.chunks(chunk) {
            let shared = &shared;
            let pair_count = &pair_count;
            scope.spawn(move |_| {
                let pairs = sweep(chunk_bounds);
                if pairs.is_empty() {
                    return;
                }
                pair_count.fetch_add(pairs.len(), Ordering::Relaxed);

                let mut guard = shared.lock();
                let tanks = &mut **guard;
                for (a, b) in pairs {
                    let away_from_b = direction_or_zero(tanks[b].position, tanks[a].position);
                    tanks[a].push(away_from_b, nudge_magnitude);
                    tanks[b].push(-away_from_b, nudge_magnitude);
                }
            });
        }
    });

    let pairs = pair_count.into_inner();
    trace!(bounds = bounds.len(), chunk, pairs, "BROAD_PHASE: 戦車の分離処理完了");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::{AgentStatus, Team};
    use crate::scenario::TankConfig;
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use rayon::ThreadPoolBuilder;
    use std::collections::BTreeSet;

    fn make_tank(id: usize, position: Vec2) -> Tank {
        let mut tank = Tank::new(id, Team::Blue, position, position);
        tank.initialize(&TankConfig::default());
        tank
    }

    fn pool(threads: usize) -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(threads).build().expect("thread pool")
    }

    fn normalized(pairs: Vec<(usize, usize)>) -> BTreeSet<(usize, usize)> {
        pairs.into_iter().map(|(a, b)| (a.min(b), a.max(b))).collect()
    }

    /// 全ペア総当たりによる参照実装
    fn brute_force_pairs(tanks: &[Tank]) -> BTreeSet<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for i in 0..tanks.len() {
            for j in (i + 1)..tanks.len() {
                let (a, b) = (&tanks[i], &tanks[j]);
                if !a.is_active() || !b.is_active() {
                    continue;
                }
                let x_overlap = (a.position.x - a.collision_radius).max(b.position.x - b.collision_radius)
                    <= (a.position.x + a.collision_radius).min(b.position.x + b.collision_radius);
                let y_overlap =
                    (a.position.y - b.position.y).abs() < a.collision_radius + b.collision_radius;
                if x_overlap && y_overlap {
                    pairs.insert((i, j));
                }
            }
        }
        pairs
    }

    #[test]
    fn test_two_overlapping_tanks_are_pushed_apart() {
        let mut tanks = vec![make_tank(0, Vec2::new(0.0, 0.0)), make_tank(1, Vec2::new(5.0, 0.0))];

        let pairs = resolve_tank_collisions(&pool(1), &mut tanks, 1.0);

        assert_eq!(pairs, 1);
        assert!(tanks[0].nudge.x < 0.0);
        assert!(tanks[1].nudge.x > 0.0);
        assert_eq!(tanks[0].nudge.y, 0.0);
        assert_eq!(tanks[1].nudge.y, 0.0);
    }

    #[test]
    fn test_separated_and_destroyed_tanks_are_ignored() {
        let mut tanks = vec![
            make_tank(0, Vec2::new(0.0, 0.0)),
            make_tank(1, Vec2::new(0.0, 7.0)),
            make_tank(2, Vec2::new(2.0, 0.0)),
        ];
        tanks[2].status = AgentStatus::Destroyed;

        assert_eq!(resolve_tank_collisions(&pool(2), &mut tanks, 1.0), 0);
        assert!(tanks.iter().all(|t| t.nudge == Vec2::ZERO));
    }

    #[test]
    fn test_coincident_tanks_get_zero_direction() {
        let mut tanks = vec![make_tank(0, Vec2::new(3.0, 3.0)), make_tank(1, Vec2::new(3.0, 3.0))];
        assert_eq!(resolve_tank_collisions(&pool(1), &mut tanks, 1.0), 1);
        assert_eq!(tanks[0].nudge, Vec2::ZERO);
        assert_eq!(tanks[1].nudge, Vec2::ZERO);
    }

    #[test]
    fn test_touching_intervals_count_as_overlap() {
        // x区間が端点で接触し、y方向は重なる
        let tanks = vec![make_tank(0, Vec2::new(0.0, 0.0)), make_tank(1, Vec2::new(6.0, 1.0))];
        assert_eq!(normalized(sweep(&build_bounds(&tanks))), BTreeSet::from([(0, 1)]));
    }

    #[test]
    fn test_sequential_sweep_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            let count = rng.random_range(2..120);
            let mut tanks: Vec<Tank> = (0..count)
                .map(|id| {
                    let position = Vec2::new(
                        rng.random_range(0..80) as f32 * 0.5,
                        rng.random_range(0..80) as f32 * 0.5,
                    );
                    let mut tank = make_tank(id, position);
                    tank.collision_radius = rng.random_range(1..6) as f32;
                    tank
                })
                .collect();
            for tank in tanks.iter_mut() {
                if rng.random_range(0..10) == 0 {
                    tank.status = AgentStatus::Destroyed;
                }
            }

            let swept = sweep(&build_bounds(&tanks));
            let unique = normalized(swept.clone());
            assert_eq!(unique.len(), swept.len(), "a pair was reported twice");
            assert_eq!(unique, brute_force_pairs(&tanks));
        }
    }

    #[test]
    fn test_parallel_pass_is_subset_of_sequential_sweep() {
        let mut rng = StdRng::seed_from_u64(11);
        let tanks: Vec<Tank> = (0..200)
            .map(|id| {
                make_tank(
                    id,
                    Vec2::new(rng.random_range(0.0..60.0), rng.random_range(0.0..60.0)),
                )
            })
            .collect();
        let sequential = sweep(&build_bounds(&tanks)).len();

        let mut single = tanks.clone();
        assert_eq!(resolve_tank_collisions(&pool(1), &mut single, 1.0), sequential);

        let mut parallel = tanks.clone();
        assert!(resolve_tank_collisions(&pool(4), &mut parallel, 1.0) <= sequential);
    }
}
