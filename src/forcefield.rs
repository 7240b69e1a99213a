//! フォースフィールド（アクティブな戦車を囲む凸包）
//!
//! 毎フレーム、アクティブな戦車の位置からギフトラッピング法（Jarvis march）で
//! 凸包を再構築し、凸包から外へ出たロケットを除去します。
//! 頂点が3点未満の凸包は境界を持たず、ロケットを除去しません。

use crate::models::{
    common::{Rect2D, Vec2, circle_segment_intersect, cross, left_of_line},
    effects::Explosion,
    rocket::{Rocket, RocketEndReason},
    tank::Tank,
    traits::{IAgent, ICollision},
};
use crate::scenario::CullMode;
use tracing::trace;

/// 点集合の凸包を計算
///
/// 最も左（同じxなら最も上）の点から開始し、現在の頂点から見て他のどの点も
/// 左側に残らない点を次の頂点として選びます。同一直線上の候補は最も遠い点を
/// 選ぶため、辺の途中の点は頂点になりません。
///
/// 開始点は入力順に依存しません。同じxの点が複数ある場合、最小yの点は必ず
/// 凸包の頂点ですが、左辺の途中の点は頂点にならず周回が開始点に戻らないため、
/// 入力順で後勝ちにはしません。
///
/// 返される頂点列は、各辺 a→b に対して全ての点が `cross(a, b, p) >= 0` を
/// 満たす向きに並びます。
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    let Some(&start) = points
        .iter()
        .min_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)))
    else {
        return Vec::new();
    };

    let mut hull = Vec::new();
    let mut current = start;

    loop {
        hull.push(current);

        let Some(mut endpoint) = points.iter().copied().find(|&p| p != current) else {
            // 全ての点が同一位置
            break;
        };
        for &point in points {
            if point == current {
                continue;
            }
            let side = cross(current, endpoint, point);
            if side < 0.0
                || (side == 0.0
                    && current.distance_squared(point) > current.distance_squared(endpoint))
            {
                endpoint = point;
            }
        }

        current = endpoint;
        if current == start || hull.len() >= points.len() {
            break;
        }
    }

    hull
}

/// 除去パスの結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullOutcome {
    /// 凸包により除去されたロケット数
    pub culled: usize,
    /// ワールド領域外に出て除去されたロケット数
    pub out_of_bounds: usize,
}

/// フォースフィールド
#[derive(Debug, Clone, Default)]
pub struct Forcefield {
    hull: Vec<Vec2>,
}

impl Forcefield {
    pub fn new() -> Self {
        Self::default()
    }

    /// アクティブな戦車の現在位置から凸包を再構築
    pub fn rebuild(&mut self, tanks: &[Tank]) {
        let points: Vec<Vec2> = tanks
            .iter()
            .filter(|tank| tank.is_active())
            .map(|tank| tank.position)
            .collect();
        self.hull = convex_hull(&points);
        trace!(
            points = points.len(),
            vertices = self.hull.len(),
            "FORCEFIELD_REBUILT: 凸包を再構築しました"
        );
    }

    /// 凸包の頂点列（描画用）
    pub fn hull(&self) -> &[Vec2] {
        &self.hull
    }

    /// 除去境界として有効か（頂点3点以上）
    pub fn has_boundary(&self) -> bool {
        self.hull.len() >= 3
    }

    fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        self.hull
            .iter()
            .copied()
            .zip(self.hull.iter().copied().cycle().skip(1))
    }

    /// 点が凸包の厳密に外側にあるか（境界を持たない場合は常にfalse）
    pub fn is_outside(&self, point: Vec2) -> bool {
        self.has_boundary() && self.edges().any(|(a, b)| left_of_line(a, b, point))
    }

    /// 円が凸包のいずれかの辺と接触しているか
    pub fn touches_circle(&self, center: Vec2, radius: f32) -> bool {
        self.has_boundary()
            && self
                .edges()
                .any(|(a, b)| circle_segment_intersect(a, b, center, radius))
    }

    /// ロケットを凸包とワールド領域で除去
    ///
    /// 凸包による除去では爆発エフェクトを1つ追加します。
    pub fn cull(
        &self,
        rockets: &mut [Rocket],
        mode: CullMode,
        world: Rect2D,
        explosions: &mut Vec<Explosion>,
        explosion_frames: u32,
    ) -> CullOutcome {
        let mut outcome = CullOutcome::default();

        for rocket in rockets.iter_mut().filter(|rocket| rocket.is_active()) {
            let crossed = match mode {
                CullMode::Outside => self.is_outside(rocket.position),
                CullMode::Touch => {
                    self.is_outside(rocket.position)
                        && self.touches_circle(rocket.position, rocket.get_collision_radius())
                }
            };

            if crossed {
                if rocket.deactivate(RocketEndReason::Culled) {
                    explosions.push(Explosion::new(rocket.position, explosion_frames));
                    outcome.culled += 1;
                }
            } else if !world.contains_point(rocket.position)
                && rocket.deactivate(RocketEndReason::OutOfBounds)
            {
                outcome.out_of_bounds += 1;
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::Team;
    use crate::scenario::TankConfig;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn world() -> Rect2D {
        Rect2D::new(Vec2::splat(-1000.0), Vec2::splat(1000.0))
    }

    fn square_field() -> Forcefield {
        let tanks: Vec<Tank> = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (5.0, 5.0)]
            .iter()
            .enumerate()
            .map(|(id, &(x, y))| {
                let mut tank = Tank::new(id, Team::Blue, Vec2::new(x, y), Vec2::new(x, y));
                tank.initialize(&TankConfig::default());
                tank
            })
            .collect();
        let mut field = Forcefield::new();
        field.rebuild(&tanks);
        field
    }

    fn is_collinear(points: &[Vec2]) -> bool {
        let first = points[0];
        match points.iter().find(|&&p| p != first) {
            None => true,
            Some(&other) => points.iter().all(|&p| cross(first, other, p) == 0.0),
        }
    }

    #[test]
    fn test_square_hull_excludes_interior_point() {
        let field = square_field();
        assert_eq!(field.hull().len(), 4);
        assert!(!field.hull().contains(&Vec2::new(5.0, 5.0)));
        assert_eq!(field.hull()[0], Vec2::new(0.0, 0.0));
    }

    #[test]
    fn test_degenerate_inputs_have_no_boundary() {
        assert!(convex_hull(&[]).is_empty());
        assert_eq!(convex_hull(&[Vec2::ONE]), vec![Vec2::ONE]);
        assert_eq!(convex_hull(&[Vec2::ONE, Vec2::ONE, Vec2::ONE]), vec![Vec2::ONE]);

        let collinear = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 2.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(3.0, 3.0),
        ];
        let hull = convex_hull(&collinear);
        assert_eq!(hull, vec![Vec2::new(0.0, 0.0), Vec2::new(3.0, 3.0)]);

        let field = Forcefield { hull };
        assert!(!field.has_boundary());
        assert!(!field.is_outside(Vec2::new(100.0, -50.0)));
    }

    #[test]
    fn test_collinear_edge_points_are_not_vertices() {
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(5.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
        ];
        assert_eq!(convex_hull(&points).len(), 4);
    }

    #[test]
    fn test_random_hulls_are_convex_enclosing_and_minimal() {
        let mut rng = StdRng::seed_from_u64(2024);

        for _ in 0..200 {
            let count = rng.random_range(3..60);
            let points: Vec<Vec2> = (0..count)
                .map(|_| Vec2::new(rng.random_range(0..20) as f32, rng.random_range(0..20) as f32))
                .collect();
            if is_collinear(&points) {
                continue;
            }

            let hull = convex_hull(&points);
            let h = hull.len();
            assert!(h >= 3);

            for i in 0..h {
                let (a, b, c) = (hull[i], hull[(i + 1) % h], hull[(i + 2) % h]);
                // 凸性（直線上の頂点なし）
                assert!(cross(a, b, c) > 0.0);
                // 全ての点が内側または境界上
                for &p in &points {
                    assert!(cross(a, b, p) >= 0.0);
                }
            }

            // いずれの頂点を取り除いても、その頂点自身が外側に出る
            if h >= 4 {
                for removed in 0..h {
                    let reduced: Vec<Vec2> = hull
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| i != removed)
                        .map(|(_, &p)| p)
                        .collect();
                    let field = Forcefield { hull: reduced };
                    assert!(field.is_outside(hull[removed]));
                }
            }
        }
    }

    #[test]
    fn test_cull_outside_is_idempotent() {
        let field = square_field();
        let mut rockets = vec![
            Rocket::new(Vec2::new(5.0, 5.0), Vec2::ZERO, 5.0, Team::Red),
            Rocket::new(Vec2::new(10.0, 5.0), Vec2::ZERO, 5.0, Team::Red),
            Rocket::new(Vec2::new(10.5, 5.0), Vec2::ZERO, 5.0, Team::Red),
        ];
        let mut explosions = Vec::new();

        let first = field.cull(&mut rockets, CullMode::Outside, world(), &mut explosions, 18);
        assert_eq!(first, CullOutcome { culled: 1, out_of_bounds: 0 });
        assert!(rockets[0].is_active());
        assert!(rockets[1].is_active());
        assert_eq!(rockets[2].end_reason, Some(RocketEndReason::Culled));

        let second = field.cull(&mut rockets, CullMode::Outside, world(), &mut explosions, 18);
        assert_eq!(second, CullOutcome::default());
        assert_eq!(explosions.len(), 1);
    }

    #[test]
    fn test_rockets_inside_or_on_boundary_survive_both_modes() {
        let field = square_field();

        for mode in [CullMode::Outside, CullMode::Touch] {
            // 頂点上の戦車から発射した直後、辺に接する内側、中央
            let mut rockets = vec![
                Rocket::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), 5.0, Team::Blue),
                Rocket::new(Vec2::new(5.0, 1.0), Vec2::ZERO, 2.0, Team::Red),
                Rocket::new(Vec2::new(5.0, 5.0), Vec2::ZERO, 2.0, Team::Red),
            ];
            let mut explosions = Vec::new();

            let outcome = field.cull(&mut rockets, mode, world(), &mut explosions, 18);
            assert_eq!(outcome, CullOutcome::default(), "{mode:?}");
            assert!(rockets.iter().all(|rocket| rocket.is_active()), "{mode:?}");
            assert!(explosions.is_empty());
        }
    }

    #[test]
    fn test_cull_touch_mode_requires_outside_center_near_edge() {
        let field = square_field();
        let mut rockets = vec![
            // 辺を越えた直後
            Rocket::new(Vec2::new(11.0, 5.0), Vec2::ZERO, 2.0, Team::Red),
            // 辺から離れた外側
            Rocket::new(Vec2::new(30.0, 5.0), Vec2::ZERO, 2.0, Team::Red),
        ];
        let mut explosions = Vec::new();

        let outcome = field.cull(&mut rockets, CullMode::Touch, world(), &mut explosions, 18);
        assert_eq!(outcome, CullOutcome { culled: 1, out_of_bounds: 0 });
        assert_eq!(rockets[0].end_reason, Some(RocketEndReason::Culled));
        assert!(rockets[1].is_active());
        assert_eq!(explosions.len(), 1);
    }

    #[test]
    fn test_start_vertex_is_lowest_of_leftmost_points() {
        // 左辺の途中の点 (0,5) を最後に置いても開始点は (0,0)
        let points = [
            Vec2::new(0.0, 0.0),
            Vec2::new(10.0, 0.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(0.0, 10.0),
            Vec2::new(0.0, 5.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert_eq!(hull[0], Vec2::new(0.0, 0.0));
        assert!(!hull.contains(&Vec2::new(0.0, 5.0)));
    }

    #[test]
    fn test_rockets_leaving_world_without_boundary() {
        let field = Forcefield::new();
        let bounds = Rect2D::new(Vec2::ZERO, Vec2::splat(100.0));
        let mut rockets = vec![
            Rocket::new(Vec2::new(50.0, 50.0), Vec2::ZERO, 5.0, Team::Blue),
            Rocket::new(Vec2::new(150.0, 50.0), Vec2::ZERO, 5.0, Team::Blue),
        ];
        let mut explosions = Vec::new();

        let outcome = field.cull(&mut rockets, CullMode::Outside, bounds, &mut explosions, 18);
        assert_eq!(outcome, CullOutcome { culled: 0, out_of_bounds: 1 });
        assert!(rockets[0].is_active());
        assert_eq!(rockets[1].end_reason, Some(RocketEndReason::OutOfBounds));
        assert!(explosions.is_empty());
    }
}
