use crate::models::{
    common::{Rect2D, Vec2},
    tank::Tank,
    traits::{IAgent, ICollision},
};
use crate::scenario::ParticleBeamConfig;

/// パーティクルビーム（範囲攻撃）
///
/// 固定された矩形領域の危険地帯です。位相カウンタを `period_frames` で周回させ、
/// `phase < active_frames` の間だけ照射状態となり、領域に重なるアクティブな戦車へ
/// 毎ティック固定ダメージを与えます。
#[derive(Debug, Clone)]
pub struct ParticleBeam {
    pub rectangle: Rect2D,
    pub hit_value: i32,
    pub period_frames: u32,
    pub active_frames: u32,
    pub phase: u32,
}

impl ParticleBeam {
    pub fn new(rectangle: Rect2D, hit_value: i32, period_frames: u32, active_frames: u32) -> Self {
        Self {
            rectangle,
            hit_value,
            period_frames: period_frames.max(1),
            active_frames,
            phase: 0,
        }
    }

    pub fn from_config(config: &ParticleBeamConfig) -> Self {
        Self::new(
            Rect2D::from_origin_size(
                Vec2::new(config.x, config.y),
                Vec2::new(config.width, config.height),
            ),
            config.hit_value,
            config.period_frames,
            config.active_frames,
        )
    }

    /// 照射中かどうか
    pub fn is_firing(&self) -> bool {
        self.phase < self.active_frames
    }

    /// 位相を1ティック進める
    pub fn tick(&mut self) {
        self.phase = (self.phase + 1) % self.period_frames;
    }

    /// 照射中であれば領域内の戦車にダメージを与える
    ///
    /// # 戻り値
    ///
    /// このティックで撃破された戦車のインデックス
    pub fn apply_damage(&self, tanks: &mut [Tank]) -> Vec<usize> {
        let mut destroyed = Vec::new();
        if !self.is_firing() {
            return destroyed;
        }

        for (index, tank) in tanks.iter_mut().enumerate() {
            if tank.is_active()
                && self
                    .rectangle
                    .intersects_circle(tank.position, tank.get_collision_radius())
                && tank.hit(self.hit_value)
            {
                destroyed.push(index);
            }
        }
        destroyed
    }
}
