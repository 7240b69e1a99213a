use crate::models::{
    common::{Team, Vec2},
    traits::{IAgent, ICollision},
};

/// ロケット終了理由
///
/// ロケットがアクティブ状態から終了した理由を表します。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RocketEndReason {
    /// 敵戦車に命中した
    Hit,
    /// フォースフィールドの境界を越えた
    Culled,
    /// ワールド領域外に出た
    OutOfBounds,
}

/// ロケット
///
/// 戦車から発射され、等速直線運動で飛翔します。最初に命中した敵戦車1両にのみ
/// ダメージを与え、命中またはフォースフィールド外への離脱で非アクティブとなり、
/// フレーム末尾に配列から除去されます。
#[derive(Debug, Clone)]
pub struct Rocket {
    pub position: Vec2,
    pub velocity: Vec2,
    pub collision_radius: f32,
    /// 発射した戦車の陣営
    pub team: Team,
    pub active: bool,
    pub end_reason: Option<RocketEndReason>,
    /// スプライトのアニメーションフレーム（0〜8）
    pub animation_frame: u32,
}

impl Rocket {
    pub fn new(position: Vec2, velocity: Vec2, collision_radius: f32, team: Team) -> Self {
        Self {
            position,
            velocity,
            collision_radius,
            team,
            active: true,
            end_reason: None,
            animation_frame: 0,
        }
    }

    /// 運動状態の更新
    pub fn tick(&mut self) {
        if !self.active {
            return;
        }
        self.position += self.velocity;
        self.animation_frame = (self.animation_frame + 1) % 9;
    }

    /// ロケットを非アクティブ化
    ///
    /// # 戻り値
    ///
    /// この呼び出しで非アクティブになった場合はtrue（既に非アクティブならfalse）
    pub fn deactivate(&mut self, reason: RocketEndReason) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.end_reason = Some(reason);
        true
    }
}

impl IAgent for Rocket {
    fn get_position(&self) -> Vec2 {
        self.position
    }

    fn get_team(&self) -> Team {
        self.team
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

impl ICollision for Rocket {
    fn get_collision_radius(&self) -> f32 {
        self.collision_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_uses_radius_sum() {
        let rocket = Rocket::new(Vec2::new(0.0, 0.0), Vec2::ZERO, 5.0, Team::Red);
        // 距離4 <= 半径和8
        assert!(rocket.intersects(Vec2::new(4.0, 0.0), 3.0));
        // 距離10 > 半径和8
        assert!(!rocket.intersects(Vec2::new(10.0, 0.0), 3.0));
    }

    #[test]
    fn test_tick_integrates_velocity() {
        let mut rocket = Rocket::new(Vec2::new(1.0, 1.0), Vec2::new(3.0, 0.0), 5.0, Team::Blue);
        rocket.tick();
        rocket.tick();
        assert_eq!(rocket.position, Vec2::new(7.0, 1.0));
        assert_eq!(rocket.animation_frame, 2);
    }

    #[test]
    fn test_deactivate_only_once() {
        let mut rocket = Rocket::new(Vec2::ZERO, Vec2::X, 5.0, Team::Blue);
        assert!(rocket.deactivate(RocketEndReason::Hit));
        assert!(!rocket.deactivate(RocketEndReason::Culled));
        assert_eq!(rocket.end_reason, Some(RocketEndReason::Hit));

        let position = rocket.position;
        rocket.tick();
        assert_eq!(rocket.position, position);
    }
}
