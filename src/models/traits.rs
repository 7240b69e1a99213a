use crate::models::common::{Team, Vec2};

/// 戦場に存在する全ての移動エージェントが実装する基本インターフェース
pub trait IAgent {
    /// 現在位置の取得
    fn get_position(&self) -> Vec2;

    /// 所属陣営の取得
    fn get_team(&self) -> Team;

    /// エージェントがアクティブかどうか
    fn is_active(&self) -> bool;
}

/// 円形の当たり判定を持つエージェントのインターフェース
pub trait ICollision: IAgent {
    /// 当たり判定半径の取得
    fn get_collision_radius(&self) -> f32;

    /// 指定した円との交差判定（距離の2乗で比較）
    fn intersects(&self, position_other: Vec2, radius_other: f32) -> bool {
        crate::models::common::circles_overlap(
            self.get_position(),
            self.get_collision_radius(),
            position_other,
            radius_other,
        )
    }
}

/// 有限寿命の演出エフェクトのインターフェース
pub trait IEffect {
    /// 1フレーム分アニメーションを進める
    fn tick(&mut self);

    /// アニメーションが終了したかどうか
    fn is_done(&self) -> bool;

    /// 描画用の位置
    fn get_position(&self) -> Vec2;

    /// 描画用のアニメーションフレーム
    fn get_frame(&self) -> u32;
}
