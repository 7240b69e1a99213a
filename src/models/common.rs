//! 基本的なデータ型と2次元幾何ユーティリティ
//!
//! 戦車・ロケット・ビームの各モデル、衝突判定、フォースフィールドが共通で使用する
//! ベクトル演算と交差判定プリミティブをまとめています。

use serde::{Deserialize, Serialize};

pub use glam::Vec2;

/// 陣営
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Blue,
    Red,
}

impl Team {
    /// 敵陣営を返す
    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Red,
            Team::Red => Team::Blue,
        }
    }
}

/// エージェントの状態を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Active,    // アクティブ
    Destroyed, // 撃破（スロットは保持したまま以後の処理から除外）
}

/// 軸平行な矩形領域
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect2D {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect2D {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// 左上座標とサイズから矩形を作成
    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self::new(origin, origin + size)
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// 円との交差判定
    ///
    /// 矩形上で円の中心に最も近い点を求め、その点までの距離の2乗と半径の2乗を比較します。
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest = center.clamp(self.min, self.max);
        (center - closest).length_squared() <= radius * radius
    }

    /// 点を矩形内に制限
    pub fn clamp_point(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max)
    }
}

/// 有向線分 start→end に対する点の外積
///
/// 正なら右側、負なら左側（画面座標系、y軸下向き）、0なら同一直線上。
pub fn cross(start: Vec2, end: Vec2, point: Vec2) -> f32 {
    (end.x - start.x) * (point.y - start.y) - (end.y - start.y) * (point.x - start.x)
}

/// 点が線分の左側にあるかを判定
pub fn left_of_line(start: Vec2, end: Vec2, point: Vec2) -> bool {
    cross(start, end, point) < 0.0
}

/// 2つの円が重なっているか（距離の2乗で比較し平方根を避ける）
pub fn circles_overlap(a: Vec2, radius_a: f32, b: Vec2, radius_b: f32) -> bool {
    let radius_sum = radius_a + radius_b;
    (b - a).length_squared() <= radius_sum * radius_sum
}

/// from から to への単位方向ベクトル
///
/// 長さ0の場合はゼロベクトルを返します。
pub fn direction_or_zero(from: Vec2, to: Vec2) -> Vec2 {
    (to - from).normalize_or_zero()
}

/// 線分と円の交差判定
///
/// 線分 s1→s2 をパラメータ t∈[0,1] で表し、円の方程式との二次方程式の解が
/// 区間内に存在するかで判定します。円が線分を完全に内包する場合は交差なしとします。
pub fn circle_segment_intersect(s1: Vec2, s2: Vec2, center: Vec2, radius: f32) -> bool {
    let d = s2 - s1;
    let f = s1 - center;

    let a = d.dot(d);
    let b = 2.0 * f.dot(d);
    let c = f.dot(f) - radius * radius;

    if a <= f32::EPSILON {
        // 長さ0の線分は点として扱う
        return c <= 0.0;
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return false;
    }

    let discriminant = discriminant.sqrt();
    let t1 = (-b - discriminant) / (2.0 * a);
    let t2 = (-b + discriminant) / (2.0 * a);

    (0.0..=1.0).contains(&t1) || (0.0..=1.0).contains(&t2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_opponent() {
        assert_eq!(Team::Blue.opponent(), Team::Red);
        assert_eq!(Team::Red.opponent(), Team::Blue);
    }

    #[test]
    fn test_left_of_line_screen_orientation() {
        let start = Vec2::new(0.0, 0.0);
        let end = Vec2::new(10.0, 0.0);
        // y軸下向きの画面座標では y<0 が左側
        assert!(left_of_line(start, end, Vec2::new(5.0, -1.0)));
        assert!(!left_of_line(start, end, Vec2::new(5.0, 1.0)));
        assert!(!left_of_line(start, end, Vec2::new(20.0, 0.0)));
    }

    #[test]
    fn test_rect_intersects_circle() {
        let rect = Rect2D::from_origin_size(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        assert!(rect.intersects_circle(Vec2::new(5.0, 5.0), 1.0));
        assert!(rect.intersects_circle(Vec2::new(12.0, 5.0), 2.0));
        assert!(!rect.intersects_circle(Vec2::new(13.0, 5.0), 2.0));
        assert!(!rect.intersects_circle(Vec2::new(12.0, 12.0), 2.0));
    }

    #[test]
    fn test_circle_segment_intersect() {
        let s1 = Vec2::new(0.0, 0.0);
        let s2 = Vec2::new(10.0, 0.0);
        assert!(circle_segment_intersect(s1, s2, Vec2::new(5.0, 2.0), 3.0));
        assert!(!circle_segment_intersect(s1, s2, Vec2::new(5.0, 4.0), 3.0));
        // 線分の延長上は交差しない
        assert!(!circle_segment_intersect(s1, s2, Vec2::new(15.0, 0.0), 3.0));
        // 線分を内包する大きな円は交差扱いしない
        assert!(!circle_segment_intersect(s1, s2, Vec2::new(5.0, 0.0), 20.0));
    }

    #[test]
    fn test_direction_or_zero_handles_degenerate_vector() {
        let p = Vec2::new(3.0, 4.0);
        assert_eq!(direction_or_zero(p, p), Vec2::ZERO);
        let dir = direction_or_zero(Vec2::ZERO, p);
        assert!((dir.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_circles_overlap_uses_inclusive_radius_sum() {
        assert!(circles_overlap(Vec2::ZERO, 5.0, Vec2::new(8.0, 0.0), 3.0));
        assert!(!circles_overlap(Vec2::ZERO, 5.0, Vec2::new(8.1, 0.0), 3.0));
    }
}
