//! # Simulation モジュール
//!
//! 戦車戦シミュレーションの中核となるフレームループを提供します。
//!
//! [`SimulationEngine`] はワーカープールとワールド状態（戦車・ロケット・ビーム・
//! エフェクト・フォースフィールド）を所有し、毎フレーム決まった順序で各システムを
//! 実行します。ワーカープールは起動時に1度だけ構築され、実行中は再利用されます。
//!
//! ## フレーム処理順序
//!
//! 1. **危険地帯更新**: パーティクルビームのダメージ適用と位相更新
//! 2. **戦車分離**: sweep & prune による押し出し（並列）
//! 3. **戦車更新**: 経路追従移動、最寄りの敵への射撃
//! 4. **フォースフィールド再構築**: 移動後の位置から凸包を計算
//! 5. **ロケット命中判定**: 最寄りの敵戦車への命中解決（並列）
//! 6. **ロケット除去**: 凸包・ワールド領域による除去
//! 7. **後片付け**: 非アクティブなロケットと終了したエフェクトを除去
//!
//! 並列パスの結果は次の段階が始まる前に全て確定します。
//!
//! ## 使用例
//!
//! ```no_run
//! use battlesim::scenario::ScenarioConfig;
//! use battlesim::simulation::SimulationEngine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ScenarioConfig::from_file("scenarios/battle_default.yaml")?;
//!
//! let mut engine = SimulationEngine::new(config, 1)?;
//! engine.initialize()?;
//! let stats = engine.run();
//! println!("生存: 青 {} / 赤 {}", stats.survivors_blue, stats.survivors_red);
//! # Ok(())
//! # }
//! ```

use crate::collision::{resolve_rocket_collisions, resolve_tank_collisions};
use crate::forcefield::Forcefield;
use crate::models::*;
use crate::scenario::{ScenarioConfig, ScenarioError};
use crate::terrain::{Grid, TerrainError};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, trace};

/// シミュレーション実行時のエラー
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Terrain(#[from] TerrainError),
    #[error("ワーカープールの構築に失敗しました: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("レポート書き込みエラー {}: {}", .0.display(), .1)]
    ReportIo(PathBuf, #[source] std::io::Error),
    #[error("レポート変換エラー: {0}")]
    ReportSerialize(#[from] serde_yaml::Error),
}

/// シミュレーション対象の全状態
///
/// 戦車の配列は実行中に要素が削除されないため、インデックスは戦車の識別子として
/// 常に有効です。
#[derive(Debug, Clone)]
pub struct WorldState {
    pub tanks: Vec<Tank>,
    pub rockets: Vec<Rocket>,
    pub particle_beams: Vec<ParticleBeam>,
    pub explosions: Vec<Explosion>,
    pub smokes: Vec<Smoke>,
    pub forcefield: Forcefield,
    /// ワールド領域（戦車の移動範囲とロケットの生存範囲）
    pub bounds: Rect2D,
}

impl WorldState {
    pub fn new(bounds: Rect2D) -> Self {
        Self {
            tanks: Vec::new(),
            rockets: Vec::new(),
            particle_beams: Vec::new(),
            explosions: Vec::new(),
            smokes: Vec::new(),
            forcefield: Forcefield::new(),
            bounds,
        }
    }

    /// 陣営ごとのアクティブな戦車数
    pub fn active_count(&self, team: Team) -> usize {
        self.tanks
            .iter()
            .filter(|tank| tank.team == team && tank.is_active())
            .count()
    }
}

impl Default for WorldState {
    /// 領域制限のないワールド
    fn default() -> Self {
        Self::new(Rect2D::new(Vec2::splat(f32::MIN), Vec2::splat(f32::MAX)))
    }
}

/// 1フレーム分の統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub collision_pairs: usize,
    pub rockets_fired: usize,
    pub rocket_hits: usize,
    pub rocket_kills: usize,
    pub beam_kills: usize,
    pub rockets_culled: usize,
    pub rockets_out_of_bounds: usize,
    pub rockets_in_flight: usize,
    pub active_blue: usize,
    pub active_red: usize,
}

impl FrameStats {
    /// いずれかの陣営が全滅しているか
    pub fn is_decided(&self) -> bool {
        self.active_blue == 0 || self.active_red == 0
    }
}

/// 実行全体の統計（レポート出力用）
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationStats {
    pub scenario: String,
    pub workers: usize,
    pub frames: u64,
    pub elapsed_ms: f64,
    pub initial_blue: usize,
    pub initial_red: usize,
    pub survivors_blue: usize,
    pub survivors_red: usize,
    pub rockets_fired: u64,
    pub rocket_hits: u64,
    pub rocket_kills: u64,
    pub beam_kills: u64,
    pub rockets_culled: u64,
    pub rockets_out_of_bounds: u64,
    pub peak_rockets: usize,
    pub winner: Option<Team>,
}

impl SimulationStats {
    fn accumulate(&mut self, frame: &FrameStats) {
        self.frames = frame.frame + 1;
        self.rockets_fired += frame.rockets_fired as u64;
        self.rocket_hits += frame.rocket_hits as u64;
        self.rocket_kills += frame.rocket_kills as u64;
        self.beam_kills += frame.beam_kills as u64;
        self.rockets_culled += frame.rockets_culled as u64;
        self.rockets_out_of_bounds += frame.rockets_out_of_bounds as u64;
        self.peak_rockets = self.peak_rockets.max(frame.rockets_in_flight);
        self.survivors_blue = frame.active_blue;
        self.survivors_red = frame.active_red;
    }

    /// 1フレームあたりの平均処理時間（ミリ秒）
    pub fn ms_per_frame(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.elapsed_ms / self.frames as f64
        }
    }

    /// YAML形式でレポートを書き出す
    pub fn write_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), SimulationError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path, yaml).map_err(|e| SimulationError::ReportIo(path.to_path_buf(), e))
    }
}

/// 描画用の戦車情報
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TankView {
    pub id: usize,
    pub position: Vec2,
    pub health: i32,
    pub max_health: i32,
    pub team: Team,
}

impl From<&Tank> for TankView {
    fn from(tank: &Tank) -> Self {
        Self {
            id: tank.id,
            position: tank.position,
            health: tank.health,
            max_health: tank.max_health,
            team: tank.team,
        }
    }
}

/// 描画用のスプライト情報（位置とアニメーションフレーム）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteView {
    pub position: Vec2,
    pub frame: u32,
}

/// 1フレーム分の描画用スナップショット
#[derive(Debug, Clone, Default)]
pub struct FrameSnapshot {
    pub tanks: Vec<TankView>,
    pub rockets: Vec<SpriteView>,
    pub smokes: Vec<SpriteView>,
    pub explosions: Vec<SpriteView>,
    pub forcefield: Vec<Vec2>,
}

pub struct SimulationEngine {
    pub frame: u64,
    pub world: WorldState,
    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
    pool: ThreadPool,
}

impl SimulationEngine {
    /// エンジンを作成し、ワーカープールを構築します
    ///
    /// `sim.workers` が0の場合はハードウェアの並列度に合わせます。
    /// ワールドは空で作成されるため、`initialize` または `spawn_tank` で戦車を配置します。
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Result<Self, SimulationError> {
        scenario.validate()?;

        let mut builder =
            ThreadPoolBuilder::new().thread_name(|index| format!("battlesim-worker-{}", index));
        if scenario.sim.workers > 0 {
            builder = builder.num_threads(scenario.sim.workers);
        }
        let pool = builder.build()?;

        Ok(Self {
            frame: 0,
            world: WorldState::default(),
            scenario_config: scenario,
            verbose_level,
            pool,
        })
    }

    /// ワーカースレッド数
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// 地形ファイルを読み込み、部隊と危険地帯を配置
    pub fn initialize(&mut self) -> Result<(), SimulationError> {
        let layout_path = self.scenario_config.layout_path();
        if self.verbose_level > 0 {
            info!("シミュレーションエンジンを初期化中...");
            info!("地形ファイル: {}", layout_path.display());
        }

        let grid = Grid::from_file(&layout_path, self.scenario_config.terrain.tile_size)?;
        self.initialize_with_grid(grid);
        Ok(())
    }

    /// 読み込み済みの地形で部隊と危険地帯を配置し、経路を計画
    pub fn initialize_with_grid(&mut self, mut grid: Grid) {
        self.frame = 0;
        self.world = WorldState::new(grid.world_bounds());

        self.initialize_forces();
        self.initialize_particle_beams();
        let unreachable = self.plan_routes(&mut grid);
        self.world.forcefield.rebuild(&self.world.tanks);

        if self.verbose_level > 0 {
            info!("初期化完了:");
            info!("  地形: {}x{} タイル", grid.width(), grid.height());
            info!("  青軍: {}両", self.world.active_count(Team::Blue));
            info!("  赤軍: {}両", self.world.active_count(Team::Red));
            info!("  パーティクルビーム: {}基", self.world.particle_beams.len());
            info!("  ワーカー: {}", self.workers());
        }
        if unreachable > 0 {
            debug!(unreachable, "目的地へ到達できない戦車があります");
        }
    }

    fn initialize_forces(&mut self) {
        let forces = self.scenario_config.forces.clone();
        for force in &forces {
            let origin = Vec2::new(force.origin.x, force.origin.y);
            for i in 0..force.count {
                let offset = Vec2::new((i % force.columns) as f32, (i / force.columns) as f32);
                let position = origin + offset * force.spacing;
                let target = Vec2::new(force.destination_x, position.y + force.destination_y_offset);
                self.spawn_tank(force.team, position, target);
            }

            if self.verbose_level > 1 {
                debug!(
                    "部隊初期化: {:?} ({}両, 原点: {:.0}, {:.0})",
                    force.team, force.count, force.origin.x, force.origin.y
                );
            }
        }
    }

    fn initialize_particle_beams(&mut self) {
        for beam_config in &self.scenario_config.particle_beams {
            self.world.particle_beams.push(ParticleBeam::from_config(beam_config));
        }
    }

    /// 全戦車の経路を計画
    ///
    /// 同じ開始タイルと目標タイルの組み合わせは探索結果を共有します。
    ///
    /// # 戻り値
    ///
    /// 経路が見つからなかった戦車数
    fn plan_routes(&mut self, grid: &mut Grid) -> usize {
        let mut cache: HashMap<(Option<usize>, Option<usize>), Vec<Vec2>> = HashMap::new();
        let mut unreachable = 0;

        for tank in self.world.tanks.iter_mut() {
            let key = (grid.tile_at_world(tank.position), grid.tile_at_world(tank.target));
            let route = cache
                .entry(key)
                .or_insert_with(|| grid.get_route(tank.position, tank.target))
                .clone();
            if route.is_empty() {
                unreachable += 1;
            }
            tank.set_route(route);
        }

        trace!(
            tanks = self.world.tanks.len(),
            searches = cache.len(),
            "ROUTES_PLANNED: 経路計画が完了しました"
        );
        unreachable
    }

    /// 戦車を1両配置
    ///
    /// # 戻り値
    ///
    /// 戦車配列上のインデックス
    pub fn spawn_tank(&mut self, team: Team, position: Vec2, target: Vec2) -> usize {
        let id = self.world.tanks.len();
        let mut tank = Tank::new(id, team, position, target);
        tank.initialize(&self.scenario_config.tanks);
        self.world.tanks.push(tank);
        id
    }

    /// シミュレーションを最大フレーム数まで実行
    ///
    /// `sim.stop_on_victory` が有効な場合、いずれかの陣営が全滅した時点で終了します。
    pub fn run(&mut self) -> SimulationStats {
        info!("=== シミュレーション実行開始 ===");

        let max_frames = self.scenario_config.sim.max_frames;
        let interval = self.scenario_config.sim.progress_interval;
        let started = Instant::now();
        let mut stats = SimulationStats {
            scenario: self.scenario_config.meta.name.clone(),
            workers: self.workers(),
            initial_blue: self.world.active_count(Team::Blue),
            initial_red: self.world.active_count(Team::Red),
            survivors_blue: self.world.active_count(Team::Blue),
            survivors_red: self.world.active_count(Team::Red),
            ..SimulationStats::default()
        };

        while self.frame < max_frames {
            let frame = self.step();
            stats.accumulate(&frame);

            if self.verbose_level > 2 {
                trace!(
                    frame = frame.frame,
                    pairs = frame.collision_pairs,
                    fired = frame.rockets_fired,
                    hits = frame.rocket_hits,
                    culled = frame.rockets_culled,
                    "FRAME"
                );
            }

            if interval > 0 && self.frame % interval == 0 && self.verbose_level > 0 {
                let progress = (self.frame as f64 / max_frames as f64) * 100.0;
                info!(
                    "進行状況: {:.1}% ({}/{}フレーム) 青 {} / 赤 {} / ロケット {}",
                    progress,
                    self.frame,
                    max_frames,
                    frame.active_blue,
                    frame.active_red,
                    frame.rockets_in_flight
                );
            }

            if self.scenario_config.sim.stop_on_victory && frame.is_decided() {
                info!(
                    frame = frame.frame,
                    blue = frame.active_blue,
                    red = frame.active_red,
                    "BATTLE_DECIDED: 一方の陣営が全滅しました"
                );
                break;
            }
        }

        stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        stats.winner = self.winner();

        info!("=== シミュレーション完了 ===");
        info!("実行フレーム数: {}", stats.frames);
        info!("処理時間: {:.1}ms ({:.3}ms/フレーム)", stats.elapsed_ms, stats.ms_per_frame());
        info!("生存: 青 {}両 / 赤 {}両", stats.survivors_blue, stats.survivors_red);
        info!(
            "ロケット: 発射 {} / 命中 {} / 除去 {}",
            stats.rockets_fired, stats.rocket_hits, stats.rockets_culled
        );
        match stats.winner {
            Some(team) => info!("勝者: {:?}", team),
            None => info!("勝敗未決"),
        }

        stats
    }

    /// 1フレームを実行
    pub fn step(&mut self) -> FrameStats {
        let mut stats = FrameStats {
            frame: self.frame,
            ..FrameStats::default()
        };

        self.refresh_hazards(&mut stats);

        stats.collision_pairs = resolve_tank_collisions(
            &self.pool,
            &mut self.world.tanks,
            self.scenario_config.tanks.nudge_magnitude,
        );

        self.update_tanks(&mut stats);

        self.world.forcefield.rebuild(&self.world.tanks);

        let impacts = resolve_rocket_collisions(
            &self.pool,
            &mut self.world.rockets,
            &mut self.world.tanks,
            &mut self.world.explosions,
            &mut self.world.smokes,
            &self.scenario_config.rockets,
            &self.scenario_config.effects,
        );
        stats.rocket_hits = impacts.hits;
        stats.rocket_kills = impacts.kills;

        let culled = self.world.forcefield.cull(
            &mut self.world.rockets,
            self.scenario_config.forcefield.cull_mode,
            self.world.bounds,
            &mut self.world.explosions,
            self.scenario_config.effects.explosion_frames,
        );
        stats.rockets_culled = culled.culled;
        stats.rockets_out_of_bounds = culled.out_of_bounds;

        self.collect_garbage();

        stats.rockets_in_flight = self.world.rockets.len();
        stats.active_blue = self.world.active_count(Team::Blue);
        stats.active_red = self.world.active_count(Team::Red);

        self.frame += 1;
        stats
    }

    /// パーティクルビームのダメージ適用と位相更新
    fn refresh_hazards(&mut self, stats: &mut FrameStats) {
        let smoke_frames = self.scenario_config.effects.smoke_frames;

        for beam in self.world.particle_beams.iter_mut() {
            for index in beam.apply_damage(&mut self.world.tanks) {
                self.world
                    .smokes
                    .push(Smoke::new(self.world.tanks[index].position, smoke_frames));
                stats.beam_kills += 1;
            }
            beam.tick();
        }
    }

    /// 戦車の移動と射撃
    fn update_tanks(&mut self, stats: &mut FrameStats) {
        let bounds = self.world.bounds;
        let tanks = &mut self.world.tanks;

        for index in 0..tanks.len() {
            if !tanks[index].is_active() {
                continue;
            }

            tanks[index].tick();
            tanks[index].position = bounds.clamp_point(tanks[index].position);

            if !tanks[index].rocket_reloaded() {
                continue;
            }
            let Some(enemy) = find_closest_enemy(tanks, index) else {
                continue;
            };
            let target = tanks[enemy].position;
            if let Some(rocket) = tanks[index].fire_at(target, &self.scenario_config.rockets) {
                self.world.rockets.push(rocket);
                stats.rockets_fired += 1;
            }
        }
    }

    /// 非アクティブなロケットと終了したエフェクトを除去
    fn collect_garbage(&mut self) {
        self.world.rockets.retain(|rocket| rocket.is_active());
        tick_and_compact(&mut self.world.explosions);
        tick_and_compact(&mut self.world.smokes);
    }

    /// 勝者（一方のみ生存している場合）
    pub fn winner(&self) -> Option<Team> {
        [Team::Blue, Team::Red].into_iter().find(|&team| {
            self.world.active_count(team) > 0 && self.world.active_count(team.opponent()) == 0
        })
    }

    /// 描画用スナップショット
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            tanks: self
                .world
                .tanks
                .iter()
                .filter(|tank| tank.is_active())
                .map(TankView::from)
                .collect(),
            rockets: self
                .world
                .rockets
                .iter()
                .map(|rocket| SpriteView {
                    position: rocket.position,
                    frame: rocket.animation_frame,
                })
                .collect(),
            smokes: sprite_views(&self.world.smokes),
            explosions: sprite_views(&self.world.explosions),
            forcefield: self.world.forcefield.hull().to_vec(),
        }
    }

    /// フォースフィールドの頂点列
    pub fn forcefield(&self) -> &[Vec2] {
        self.world.forcefield.hull()
    }

    /// 指定陣営のアクティブな戦車を耐久値の昇順で返す（体力バー描画用）
    pub fn tanks_by_health(&self, team: Team) -> Vec<TankView> {
        let mut views: Vec<TankView> = self
            .world
            .tanks
            .iter()
            .filter(|tank| tank.team == team && tank.is_active())
            .map(TankView::from)
            .collect();
        views.sort_by_key(|view| view.health);
        views
    }
}

fn sprite_views<E: IEffect>(effects: &[E]) -> Vec<SpriteView> {
    effects
        .iter()
        .map(|effect| SpriteView {
            position: effect.get_position(),
            frame: effect.get_frame(),
        })
        .collect()
}
