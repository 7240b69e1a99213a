use crate::models::common::Team;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: "default".to_string(),
            description: "2陣営の戦車戦".to_string(),
        }
    }
}

/// シミュレーション設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 最大フレーム数
    pub max_frames: u64,
    /// ワーカースレッド数（0でハードウェア並列度）
    pub workers: usize,
    /// 進行状況ログの出力間隔（フレーム）
    pub progress_interval: u64,
    /// 一方の陣営が全滅した時点で終了するか
    pub stop_on_victory: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_frames: 2000,
            workers: 0,
            progress_interval: 100,
            stop_on_victory: false,
        }
    }
}

/// 地形設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// レイアウトファイル（シナリオファイルからの相対パス）
    pub layout_file: PathBuf,
    /// タイル1枚のワールド座標でのサイズ
    pub tile_size: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            layout_file: PathBuf::from("terrain.txt"),
            tile_size: 16.0,
        }
    }
}

/// 戦車の性能設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TankConfig {
    pub collision_radius: f32,
    pub max_health: i32,
    pub max_speed: f32,
    pub reload_frames: u32,
    /// 衝突時の押し出しの大きさ
    pub nudge_magnitude: f32,
    /// 押し出しの毎ティック減衰係数（0〜1）
    pub nudge_decay: f32,
    pub waypoint_tolerance: f32,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            collision_radius: 3.0,
            max_health: 1000,
            max_speed: 1.0,
            reload_frames: 200,
            nudge_magnitude: 1.0,
            nudge_decay: 0.0,
            waypoint_tolerance: 1.0,
        }
    }
}

/// ロケットの性能設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RocketConfig {
    pub collision_radius: f32,
    pub speed: f32,
    pub hit_value: i32,
}

impl Default for RocketConfig {
    fn default() -> Self {
        Self {
            collision_radius: 5.0,
            speed: 3.0,
            hit_value: 60,
        }
    }
}

/// 演出エフェクト設定
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EffectsConfig {
    pub explosion_frames: u32,
    pub smoke_frames: u32,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            explosion_frames: 18,
            smoke_frames: 240,
        }
    }
}

/// フォースフィールドによるロケット除去方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CullMode {
    /// 中心が凸包の外側に出たロケットを除去
    #[default]
    Outside,
    /// 中心が凸包の外側にあり、当たり判定円が凸包の辺に接触しているロケットを除去
    Touch,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ForcefieldConfig {
    pub cull_mode: CullMode,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Position2D {
    pub x: f32,
    pub y: f32,
}

/// 部隊の配置設定
///
/// `origin` から `columns` 列の格子状に `spacing` 間隔で戦車を並べます。
/// 各戦車の目的地は (`destination_x`, 初期y + `destination_y_offset`) です。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForceConfig {
    pub team: Team,
    pub count: usize,
    pub origin: Position2D,
    pub columns: usize,
    pub spacing: f32,
    pub destination_x: f32,
    #[serde(default)]
    pub destination_y_offset: f32,
}

/// パーティクルビーム設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParticleBeamConfig {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub hit_value: i32,
    #[serde(default = "default_beam_period")]
    pub period_frames: u32,
    #[serde(default = "default_beam_active")]
    pub active_frames: u32,
}

fn default_beam_period() -> u32 {
    30
}

fn default_beam_active() -> u32 {
    10
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub sim: SimulationConfig,
    #[serde(default)]
    pub terrain: TerrainConfig,
    #[serde(default)]
    pub tanks: TankConfig,
    #[serde(default)]
    pub rockets: RocketConfig,
    #[serde(default)]
    pub effects: EffectsConfig,
    #[serde(default)]
    pub forcefield: ForcefieldConfig,
    #[serde(default)]
    pub forces: Vec<ForceConfig>,
    #[serde(default)]
    pub particle_beams: Vec<ParticleBeamConfig>,
    /// 読み込み元ディレクトリ（相対パス解決用）
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        // ファイル読み込み
        let contents =
            fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let mut config = Self::from_yaml(&contents)
            .map_err(|e| match e {
                ScenarioError::Parse(_, err) => ScenarioError::Parse(path.to_path_buf(), err),
                other => other,
            })?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を解析して検証
    pub fn from_yaml(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::Parse(PathBuf::new(), e))?;

        // 基本的な検証
        config.validate()?;

        Ok(config)
    }

    /// 地形レイアウトファイルの解決済みパス
    pub fn layout_path(&self) -> PathBuf {
        if self.terrain.layout_file.is_absolute() {
            self.terrain.layout_file.clone()
        } else {
            self.base_dir.join(&self.terrain.layout_file)
        }
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.sim.max_frames == 0 {
            return Err(ScenarioError::Validation("max_frames must be positive".to_string()));
        }
        if self.terrain.tile_size <= 0.0 {
            return Err(ScenarioError::Validation("tile_size must be positive".to_string()));
        }
        if self.tanks.collision_radius <= 0.0 || self.rockets.collision_radius <= 0.0 {
            return Err(ScenarioError::Validation("collision radii must be positive".to_string()));
        }
        if self.tanks.max_health <= 0 {
            return Err(ScenarioError::Validation("max_health must be positive".to_string()));
        }
        if self.tanks.max_speed < 0.0 || self.rockets.speed <= 0.0 {
            return Err(ScenarioError::Validation("invalid tank or rocket speed".to_string()));
        }
        if !(0.0..=1.0).contains(&self.tanks.nudge_decay) {
            return Err(ScenarioError::Validation("nudge_decay must be within 0..=1".to_string()));
        }

        for (index, force) in self.forces.iter().enumerate() {
            if force.columns == 0 {
                return Err(ScenarioError::Validation(format!(
                    "force #{} ({:?}) has zero columns",
                    index, force.team
                )));
            }
            if force.spacing <= 0.0 {
                return Err(ScenarioError::Validation(format!(
                    "force #{} ({:?}) spacing must be positive",
                    index, force.team
                )));
            }
        }

        for (index, beam) in self.particle_beams.iter().enumerate() {
            if beam.width <= 0.0 || beam.height <= 0.0 {
                return Err(ScenarioError::Validation(format!(
                    "particle beam #{} has an empty rectangle",
                    index
                )));
            }
            if beam.period_frames == 0 || beam.active_frames > beam.period_frames {
                return Err(ScenarioError::Validation(format!(
                    "particle beam #{} active_frames {} exceeds period_frames {}",
                    index, beam.active_frames, beam.period_frames
                )));
            }
        }

        Ok(())
    }

    /// 陣営ごとの総戦車数
    pub fn team_count(&self, team: Team) -> usize {
        self.forces.iter().filter(|f| f.team == team).map(|f| f.count).sum()
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("最大フレーム数: {}", self.sim.max_frames);
        if self.sim.workers == 0 {
            println!("ワーカー数: 自動");
        } else {
            println!("ワーカー数: {}", self.sim.workers);
        }
        println!("地形ファイル: {}", self.layout_path().display());
        println!("タイルサイズ: {:.1}", self.terrain.tile_size);
        println!("除去方式: {:?}", self.forcefield.cull_mode);
        println!();

        println!("=== 戦力 ===");
        println!("青軍: {}両", self.team_count(Team::Blue));
        println!("赤軍: {}両", self.team_count(Team::Red));
        println!("パーティクルビーム: {}基", self.particle_beams.len());
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    Validation(String),
}
