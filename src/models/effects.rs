//! 演出エフェクト（煙・爆発）
//!
//! ダメージや撃破のイベントで生成され、アニメーションが終わると除去されます。
//! シミュレーションのロジックには影響しません。

use crate::models::{common::Vec2, traits::IEffect};

/// 撃破された戦車から立ち上る煙
#[derive(Debug, Clone)]
pub struct Smoke {
    pub position: Vec2,
    pub frame: u32,
    pub lifetime: u32,
}

impl Smoke {
    pub fn new(position: Vec2, lifetime: u32) -> Self {
        Self { position, frame: 0, lifetime }
    }
}

impl IEffect for Smoke {
    fn tick(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    fn is_done(&self) -> bool {
        self.frame >= self.lifetime
    }

    fn get_position(&self) -> Vec2 {
        self.position
    }

    fn get_frame(&self) -> u32 {
        self.frame
    }
}

/// ロケットの命中・消滅時の爆発
#[derive(Debug, Clone)]
pub struct Explosion {
    pub position: Vec2,
    pub frame: u32,
    pub lifetime: u32,
}

impl Explosion {
    pub fn new(position: Vec2, lifetime: u32) -> Self {
        Self { position, frame: 0, lifetime }
    }
}

impl IEffect for Explosion {
    fn tick(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }

    fn is_done(&self) -> bool {
        self.frame >= self.lifetime
    }

    fn get_position(&self) -> Vec2 {
        self.position
    }

    fn get_frame(&self) -> u32 {
        self.frame
    }
}

/// エフェクトを1フレーム進め、終了したものを除去
///
/// # 戻り値
///
/// 除去したエフェクト数
pub fn tick_and_compact<E: IEffect>(effects: &mut Vec<E>) -> usize {
    for effect in effects.iter_mut() {
        effect.tick();
    }
    let before = effects.len();
    effects.retain(|effect| !effect.is_done());
    before - effects.len()
}
