use crate::models::{
    common::{AgentStatus, Team, Vec2, direction_or_zero},
    rocket::Rocket,
    traits::{IAgent, ICollision},
};
use crate::scenario::{RocketConfig, TankConfig};
use tracing::{debug, warn};

/// 戦車エージェント
///
/// 経路探索で得たウェイポイント列に沿って目的地へ移動し、装填が完了すると
/// 最も近い敵戦車に向けてロケットを発射します。衝突判定からの押し出し（nudge）を
/// 蓄積し、毎ティック減衰させます。
///
/// 耐久値が0になった戦車は撃破状態となり、以後の衝突・照準・描画の対象から
/// 外れますが、配列上のスロットは解放されません（インデックスは安定）。
#[derive(Debug, Clone)]
pub struct Tank {
    /// 配列上のインデックスと一致する識別子
    pub id: usize,
    /// 所属陣営
    pub team: Team,
    /// 現在位置
    pub position: Vec2,
    /// 衝突による押し出しの蓄積
    pub nudge: Vec2,
    /// 現在の耐久値（0で撃破）
    pub health: i32,
    /// 最大耐久値
    pub max_health: i32,
    /// 当たり判定半径
    pub collision_radius: f32,
    /// 最大移動速度（1ティックあたり）
    pub max_speed: f32,
    /// 押し出しの減衰係数（0で毎ティックリセット）
    pub nudge_decay: f32,
    /// ウェイポイント到達判定距離
    pub waypoint_tolerance: f32,
    /// 装填に必要なティック数
    pub reload_frames: u32,
    /// 残り装填ティック数
    pub reload_remaining: u32,
    /// 経路（ワールド座標のウェイポイント列）
    pub route: Vec<Vec2>,
    /// 次に向かうウェイポイントのインデックス
    pub waypoint: usize,
    /// 目的地
    pub target: Vec2,
    /// 現在状態
    pub status: AgentStatus,
    /// スプライトのアニメーションフレーム
    pub animation_frame: u32,
}

impl Tank {
    /// 新しい戦車を作成します
    ///
    /// # 引数
    ///
    /// * `id` - 戦車配列上のインデックス
    /// * `team` - 所属陣営
    /// * `position` - 初期位置
    /// * `target` - 目的地
    ///
    /// # 戻り値
    ///
    /// 戦車インスタンス（initializeメソッドで性能パラメータの設定が必要）
    pub fn new(id: usize, team: Team, position: Vec2, target: Vec2) -> Self {
        Self {
            id,
            team,
            position,
            nudge: Vec2::ZERO,
            health: 0,               // initializeで設定
            max_health: 0,           // initializeで設定
            collision_radius: 0.0,   // initializeで設定
            max_speed: 0.0,          // initializeで設定
            nudge_decay: 0.0,        // initializeで設定
            waypoint_tolerance: 0.0, // initializeで設定
            reload_frames: 0,        // initializeで設定
            reload_remaining: 0,
            route: Vec::new(),
            waypoint: 0,
            target,
            status: AgentStatus::Active,
            animation_frame: 0,
        }
    }

    /// 性能パラメータを設定
    pub fn initialize(&mut self, config: &TankConfig) {
        self.health = config.max_health;
        self.max_health = config.max_health;
        self.collision_radius = config.collision_radius;
        self.max_speed = config.max_speed;
        self.nudge_decay = config.nudge_decay;
        self.waypoint_tolerance = config.waypoint_tolerance;
        self.reload_frames = config.reload_frames;
        self.reload_remaining = config.reload_frames;
        self.status = AgentStatus::Active;
    }

    /// 経路を設定
    ///
    /// 空の経路（目的地到達不能）が渡された場合は既存の経路を保持します。
    pub fn set_route(&mut self, route: Vec<Vec2>) {
        if route.is_empty() {
            warn!(
                tank_id = self.id,
                team = ?self.team,
                position_x = self.position.x,
                position_y = self.position.y,
                target_x = self.target.x,
                target_y = self.target.y,
                "TANK_ROUTE_UNREACHABLE: 目的地への経路が見つかりません。現在の経路を維持します"
            );
            return;
        }
        self.route = route;
        self.waypoint = 0;
    }

    /// 押し出しを加算
    pub fn push(&mut self, direction: Vec2, magnitude: f32) {
        if self.status == AgentStatus::Active {
            self.nudge += direction * magnitude;
        }
    }

    /// ダメージを受ける
    ///
    /// 耐久値は0で下限クリップされます。撃破状態への遷移は一度だけ発生し、
    /// 撃破済みの戦車へのダメージは無視されます。
    ///
    /// # 戻り値
    ///
    /// このダメージで撃破された場合はtrue
    pub fn hit(&mut self, damage: i32) -> bool {
        if self.status != AgentStatus::Active {
            return false;
        }

        self.health = (self.health - damage).max(0);
        if self.health == 0 {
            self.status = AgentStatus::Destroyed;
            self.nudge = Vec2::ZERO;
            debug!(
                tank_id = self.id,
                team = ?self.team,
                position_x = self.position.x,
                position_y = self.position.y,
                "TANK_DESTROYED: 戦車が撃破されました"
            );
            return true;
        }
        false
    }

    /// 装填完了しているか
    pub fn rocket_reloaded(&self) -> bool {
        self.reload_remaining == 0
    }

    /// 装填タイマーを再設定
    pub fn reload_rocket(&mut self) {
        self.reload_remaining = self.reload_frames;
    }

    /// 指定位置に向けてロケットを発射
    ///
    /// 方向ベクトルが定義できない場合（目標が自身と同位置）は発射せず、
    /// 装填状態を維持します。
    pub fn fire_at(&mut self, target_position: Vec2, config: &RocketConfig) -> Option<Rocket> {
        if !self.is_active() || !self.rocket_reloaded() {
            return None;
        }

        let direction = direction_or_zero(self.position, target_position);
        if direction == Vec2::ZERO {
            return None;
        }

        self.reload_rocket();
        Some(Rocket::new(
            self.position,
            direction * config.speed,
            config.collision_radius,
            self.team,
        ))
    }

    /// 1ティックの処理実行
    ///
    /// 現在のウェイポイントへ向かう移動量と押し出しを合成して位置を更新し、
    /// 押し出しを減衰させ、装填タイマーを進めます。
    pub fn tick(&mut self) {
        if self.status != AgentStatus::Active {
            return;
        }

        let mut direction = Vec2::ZERO;
        while let Some(&waypoint) = self.route.get(self.waypoint) {
            let to_waypoint = waypoint - self.position;
            if to_waypoint.length_squared() <= self.waypoint_tolerance * self.waypoint_tolerance {
                self.waypoint += 1;
                continue;
            }
            direction = to_waypoint.normalize_or_zero();
            break;
        }

        self.position += direction * self.max_speed + self.nudge;
        self.nudge *= self.nudge_decay;

        self.reload_remaining = self.reload_remaining.saturating_sub(1);
        self.animation_frame = (self.animation_frame + 1) % 9;
    }
}

impl IAgent for Tank {
    fn get_position(&self) -> Vec2 {
        self.position
    }

    fn get_team(&self) -> Team {
        self.team
    }

    fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }
}

impl ICollision for Tank {
    fn get_collision_radius(&self) -> f32 {
        self.collision_radius
    }
}

/// 指定した戦車から最も近いアクティブな敵戦車のインデックスを探索
///
/// 距離の2乗で比較する線形探索です。敵が存在しない場合はNoneを返します。
pub fn find_closest_enemy(tanks: &[Tank], current: usize) -> Option<usize> {
    let origin = &tanks[current];
    let mut closest: Option<(usize, f32)> = None;

    for (index, tank) in tanks.iter().enumerate() {
        if tank.team == origin.team || !tank.is_active() {
            continue;
        }
        let distance_sq = (tank.position - origin.position).length_squared();
        match closest {
            Some((_, best)) if best <= distance_sq => {}
            _ => closest = Some((index, distance_sq)),
        }
    }

    closest.map(|(index, _)| index)
}
