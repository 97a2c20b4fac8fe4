//! 数学基础类型
//!
//! 统一使用 nalgebra 的双精度 2D 点/向量，并集中定义数值容差。

use serde::{Deserialize, Serialize};

pub type Point2 = nalgebra::Point2<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;

/// 平行/退化判定容差
pub const EPSILON: f64 = 1e-9;

/// 交点去重与按值匹配的容差
pub const MATCH_TOLERANCE: f64 = 1e-6;

/// 2D 叉积（z 分量）
#[inline]
pub fn cross(a: &Vector2, b: &Vector2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// 两点是否在容差内重合（逐坐标绝对比较）
#[inline]
pub fn coincident(a: &Point2, b: &Point2, tolerance: f64) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

/// 轴对齐包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox2 {
    pub min: Point2,
    pub max: Point2,
}

impl BoundingBox2 {
    pub fn new(min: Point2, max: Point2) -> Self {
        Self { min, max }
    }

    /// 以原点为中心、半边长为 `half_span` 的正方形
    pub fn square(half_span: f64) -> Self {
        Self {
            min: Point2::new(-half_span, -half_span),
            max: Point2::new(half_span, half_span),
        }
    }

    /// 点是否在盒内（含边界，带容差）
    pub fn contains(&self, point: &Point2, tolerance: f64) -> bool {
        point.x >= self.min.x - tolerance
            && point.x <= self.max.x + tolerance
            && point.y >= self.min.y - tolerance
            && point.y <= self.max.y + tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_box() {
        let bbox = BoundingBox2::square(5.0);
        assert_eq!(bbox.min, Point2::new(-5.0, -5.0));
        assert!(bbox.contains(&Point2::new(5.0, -5.0), EPSILON));
        assert!(!bbox.contains(&Point2::new(5.1, 0.0), EPSILON));
    }

    #[test]
    fn test_coincident() {
        let a = Point2::new(1.0, 2.0);
        assert!(coincident(&a, &Point2::new(1.0 + 1e-12, 2.0), EPSILON));
        assert!(!coincident(&a, &Point2::new(1.0 + 1e-6, 2.0), EPSILON));
    }
}
