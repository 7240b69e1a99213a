//! ロケットの命中判定（nearest target）
//!
//! アクティブな戦車をフレームごとにx座標でソートした読み取り専用の配列を作り、
//! ロケット配列をワーカー数で分割して並列に判定します。
//! 戦車の耐久値の変更とエフェクトの追加のみロック下で行います。

use crate::collision::chunk_len;
use crate::models::{
    common::{Team, Vec2},
    effects::{Explosion, Smoke},
    rocket::{Rocket, RocketEndReason},
    tank::Tank,
    traits::{IAgent, ICollision},
};
use crate::scenario::{EffectsConfig, RocketConfig};
use parking_lot::Mutex;
use rayon::ThreadPool;
use tracing::trace;

/// 判定用の戦車の読み取り専用スナップショット
#[derive(Debug, Clone, Copy)]
pub struct TankProbe {
    /// 戦車配列上のインデックス
    pub index: usize,
    pub position: Vec2,
    pub radius: f32,
    pub team: Team,
}

/// アクティブな戦車のスナップショットをx座標順に作成
pub fn sorted_probes(tanks: &[Tank]) -> Vec<TankProbe> {
    let mut probes: Vec<TankProbe> = tanks
        .iter()
        .enumerate()
        .filter(|(_, tank)| tank.is_active())
        .map(|(index, tank)| TankProbe {
            index,
            position: tank.position,
            radius: tank.collision_radius,
            team: tank.team,
        })
        .collect();
    probes.sort_by(|a, b| a.position.x.total_cmp(&b.position.x));
    probes
}

/// ロケットが命中する敵戦車を探索
///
/// x方向の距離が半径和（戦車側は最大半径）を超える候補は二分探索と打ち切りで除外し、
/// 残りの敵戦車のうち円が重なっている最も近い1両を返します。
pub fn find_hit(probes: &[TankProbe], max_tank_radius: f32, rocket: &Rocket) -> Option<usize> {
    let reach = rocket.collision_radius + max_tank_radius;
    let first = probes.partition_point(|p| p.position.x < rocket.position.x - reach);

    let mut nearest: Option<(usize, f32)> = None;
    for probe in &probes[first..] {
        let dx = probe.position.x - rocket.position.x;
        if dx > reach {
            break;
        }
        if probe.team == rocket.team || dx.abs() > rocket.collision_radius + probe.radius {
            continue;
        }
        if !rocket.intersects(probe.position, probe.radius) {
            continue;
        }

        let distance_sq = (probe.position - rocket.position).length_squared();
        if nearest.is_none_or(|(_, best)| distance_sq < best) {
            nearest = Some((probe.index, distance_sq));
        }
    }

    nearest.map(|(index, _)| index)
}

/// 命中判定パスの結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NarrowPhaseOutcome {
    pub hits: usize,
    pub kills: usize,
}

/// ロック下で更新する共有状態
struct Impacts<'a> {
    tanks: &'a mut [Tank],
    explosions: &'a mut Vec<Explosion>,
    smokes: &'a mut Vec<Smoke>,
    outcome: NarrowPhaseOutcome,
}

/// ロケットを1ティック進め、敵戦車への命中を解決
///
/// 命中したロケットは非アクティブ化され、爆発エフェクトを追加します。
/// 撃破した場合は煙エフェクトも追加します。同一フレーム内で他のロケットが
/// 先に撃破した戦車に命中したロケットは、ダメージを与えずに爆発します。
pub fn resolve_rocket_collisions(
    pool: &ThreadPool,
    rockets: &mut [Rocket],
    tanks: &mut [Tank],
    explosions: &mut Vec<Explosion>,
    smokes: &mut Vec<Smoke>,
    rocket_config: &RocketConfig,
    effects_config: &EffectsConfig,
) -> NarrowPhaseOutcome {
    if rockets.is_empty() {
        return NarrowPhaseOutcome::default();
    }

    let probes = sorted_probes(tanks);
    let max_tank_radius = probes.iter().map(|p| p.radius).fold(0.0_f32, f32::max);
    let chunk = chunk_len(rockets.len(), pool.current_num_threads());
    let shared = Mutex::new(Impacts {
        tanks,
        explosions,
        smokes,
        outcome: NarrowPhaseOutcome::default(),
    });

    pool.scope(|scope| {
        for chunk_rockets in rockets.chunks_mut(chunk) {
            let shared = &shared;
            let probes = &probes;
            scope.spawn(move |_| {
                for rocket in chunk_rockets.iter_mut() {
                    if !rocket.is_active() {
                        continue;
                    }
                    rocket.tick();

                    let Some(target) = find_hit(probes, max_tank_radius, rocket) else {
                        continue;
                    };
                    rocket.deactivate(RocketEndReason::Hit);

                    let mut impacts = shared.lock();
                    impacts.outcome.hits += 1;
                    impacts
                        .explosions
                        .push(Explosion::new(rocket.get_position(), effects_config.explosion_frames));

                    let tank = &mut impacts.tanks[target];
                    if tank.hit(rocket_config.hit_value) {
                        let position = tank.position;
                        impacts.smokes.push(Smoke::new(position, effects_config.smoke_frames));
                        impacts.outcome.kills += 1;
                    }
                }
            });
        }
    });

    let outcome = shared.into_inner().outcome;
    trace!(
        rockets = rockets.len(),
        probes = probes.len(),
        hits = outcome.hits,
        kills = outcome.kills,
        "NARROW_PHASE: ロケットの命中判定完了"
    );
    outcome
}
