//! 几何内核
//!
//! 纯函数，无副作用：
//! - 线段-线段、线段-圆、圆-圆交点
//! - 点到线段/直线的距离与垂足
//! - 将两点确定的直线裁剪到固定包围盒
//!
//! 共线重叠的线段不报告交点区间，统一视为"无交点"。

use crate::math::{cross, BoundingBox2, Point2, Vector2, EPSILON, MATCH_TOLERANCE};
use serde::{Deserialize, Serialize};

/// 圆
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point2,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point2, radius: f64) -> Self {
        Self { center, radius }
    }

    /// 由圆心和圆上一点构造
    pub fn from_center_edge(center: Point2, edge: Point2) -> Self {
        Self {
            center,
            radius: (edge - center).norm(),
        }
    }

    /// 点到圆周的有符号距离（负值表示在圆内）
    pub fn distance_to_point(&self, point: &Point2) -> f64 {
        (point - self.center).norm() - self.radius
    }
}

/// 由两个端点确定的线段
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point2,
    pub end: Point2,
}

impl Segment {
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    pub fn direction(&self) -> Vector2 {
        self.end - self.start
    }

    pub fn length(&self) -> f64 {
        self.direction().norm()
    }

    pub fn is_degenerate(&self) -> bool {
        self.length() < EPSILON
    }
}

/// 参与求交的几何形状
///
/// `Line` 是延长线：概念上无限长，但以裁剪后的可见跨度参与求交。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Point(Point2),
    Segment(Segment),
    Line(Segment),
    Circle(Circle),
}

impl Shape {
    /// 与另一形状的全部交点
    ///
    /// 点不参与曲线求交（点相关的组合由编排层按规则处理）。
    pub fn intersections(&self, other: &Shape) -> Vec<Point2> {
        match (self, other) {
            (Shape::Segment(a) | Shape::Line(a), Shape::Segment(b) | Shape::Line(b)) => {
                segment_intersection(a.start, a.end, b.start, b.end)
                    .into_iter()
                    .collect()
            }
            (Shape::Segment(s) | Shape::Line(s), Shape::Circle(c))
            | (Shape::Circle(c), Shape::Segment(s) | Shape::Line(s)) => {
                segment_circle_intersections(s.start, s.end, c.center, c.radius)
            }
            (Shape::Circle(c0), Shape::Circle(c1)) => {
                circle_circle_intersections(c0.center, c0.radius, c1.center, c1.radius)
            }
            _ => vec![],
        }
    }

    /// 点到形状的距离（用于模型空间的命中测试）
    pub fn distance_to(&self, point: &Point2) -> f64 {
        match self {
            Shape::Point(p) => (point - p).norm(),
            Shape::Segment(s) => point_segment_distance(*point, s.start, s.end),
            Shape::Line(s) => point_line_distance(*point, s.start, s.end),
            Shape::Circle(c) => c.distance_to_point(point).abs(),
        }
    }
}

/// 线段-线段交点
///
/// 解 `p + t(p2-p) = q + u(q2-q)`，仅当两个参数都落在 `[0,1]`（带容差）时返回交点。
/// 平行或共线时返回 `None`。
pub fn segment_intersection(p: Point2, p2: Point2, q: Point2, q2: Point2) -> Option<Point2> {
    let r = p2 - p;
    let s = q2 - q;

    let denom = cross(&r, &s);
    if denom.abs() < EPSILON {
        return None;
    }

    let qp = q - p;
    let t = cross(&qp, &s) / denom;
    let u = cross(&qp, &r) / denom;

    if in_unit_range(t) && in_unit_range(u) {
        Some(p + r * t)
    } else {
        None
    }
}

/// 线段-圆交点（0~2 个）
///
/// 判别式接近零时视为相切，只返回一个交点。
pub fn segment_circle_intersections(
    p1: Point2,
    p2: Point2,
    center: Point2,
    radius: f64,
) -> Vec<Point2> {
    let d = p2 - p1;
    let f = p1 - center;

    let a = d.dot(&d);
    if a < EPSILON {
        return vec![];
    }
    let b = 2.0 * f.dot(&d);
    let c = f.dot(&f) - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < -EPSILON {
        return vec![];
    }

    let mut hits = Vec::with_capacity(2);

    if discriminant.abs() <= EPSILON {
        // 相切
        let t = -b / (2.0 * a);
        if in_unit_range(t) {
            hits.push(p1 + d * t);
        }
    } else {
        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        if in_unit_range(t1) {
            hits.push(p1 + d * t1);
        }
        if in_unit_range(t2) {
            hits.push(p1 + d * t2);
        }
    }

    hits
}

/// 圆-圆交点（根轴法）
///
/// 同心、相离、内含时无交点；内切/外切时返回一个交点。
pub fn circle_circle_intersections(c0: Point2, r0: f64, c1: Point2, r1: f64) -> Vec<Point2> {
    let delta = c1 - c0;
    let d = delta.norm();

    if d < EPSILON || d > r0 + r1 + EPSILON || d < (r0 - r1).abs() - EPSILON {
        return vec![];
    }

    let a = (r0 * r0 - r1 * r1 + d * d) / (2.0 * d);
    let h2 = r0 * r0 - a * a;

    let dir = delta / d;
    let base = c0 + dir * a;

    if h2 <= EPSILON {
        return vec![base];
    }

    let h = h2.sqrt();
    let perp = Vector2::new(-dir.y, dir.x);
    vec![base + perp * h, base - perp * h]
}

/// 将过 `p1`、`p2` 的直线裁剪到包围盒
///
/// 收集直线与四条边的交点，去除距离小于 1e-6 的重复点；
/// 若有至少两个不同交点，按主轴（`|dx| >= |dy|` 取 x，否则取 y）上的投影排序，
/// 返回两端的极值点；否则原样返回两点。
pub fn clip_line_to_box(p1: Point2, p2: Point2, bbox: &BoundingBox2) -> (Point2, Point2) {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;

    let mut hits: Vec<Point2> = Vec::with_capacity(4);
    let mut push_unique = |candidate: Point2| {
        if !hits
            .iter()
            .any(|h| (h - candidate).norm() < MATCH_TOLERANCE)
        {
            hits.push(candidate);
        }
    };

    if dx.abs() > EPSILON {
        for x in [bbox.min.x, bbox.max.x] {
            let t = (x - p1.x) / dx;
            let candidate = Point2::new(x, p1.y + t * dy);
            if bbox.contains(&candidate, EPSILON) {
                push_unique(candidate);
            }
        }
    }
    if dy.abs() > EPSILON {
        for y in [bbox.min.y, bbox.max.y] {
            let t = (y - p1.y) / dy;
            let candidate = Point2::new(p1.x + t * dx, y);
            if bbox.contains(&candidate, EPSILON) {
                push_unique(candidate);
            }
        }
    }

    if hits.len() < 2 {
        return (p1, p2);
    }

    let along_x = dx.abs() >= dy.abs();
    let key = |p: &Point2| if along_x { p.x } else { p.y };
    hits.sort_by(|a, b| key(a).total_cmp(&key(b)));

    (hits[0], hits[hits.len() - 1])
}

/// 点到线段的距离
pub fn point_segment_distance(point: Point2, a: Point2, b: Point2) -> f64 {
    match project_point(point, a, b, true) {
        Some(foot) => (point - foot).norm(),
        None => (point - a).norm(),
    }
}

/// 点到（无限）直线的距离
pub fn point_line_distance(point: Point2, a: Point2, b: Point2) -> f64 {
    let d = b - a;
    let len = d.norm();
    if len < EPSILON {
        return (point - a).norm();
    }
    cross(&d, &(point - a)).abs() / len
}

/// 点在 `a`-`b` 上的垂足
///
/// `clamp` 为真时参数限制在 `[0,1]`（线段），否则不限制（直线）。
/// 方向向量退化时返回 `None`。
pub fn project_point(point: Point2, a: Point2, b: Point2, clamp: bool) -> Option<Point2> {
    let d = b - a;
    let len2 = d.dot(&d);
    if len2 < EPSILON {
        return None;
    }
    let mut t = (point - a).dot(&d) / len2;
    if clamp {
        t = t.clamp(0.0, 1.0);
    }
    Some(a + d * t)
}

/// 过 `through` 且垂直于 `a`-`b` 的线段，两侧各延伸 `half_length`
pub fn normal_through(
    a: Point2,
    b: Point2,
    through: Point2,
    half_length: f64,
) -> Option<(Point2, Point2)> {
    let d = b - a;
    let len = d.norm();
    if len < EPSILON {
        return None;
    }
    let n = Vector2::new(-d.y, d.x) / len;
    Some((through - n * half_length, through + n * half_length))
}

/// 点是否在圆周上（容差内）
pub fn point_on_circle(point: Point2, circle: &Circle, tolerance: f64) -> bool {
    circle.distance_to_point(&point).abs() <= tolerance
}

#[inline]
fn in_unit_range(t: f64) -> bool {
    (-EPSILON..=1.0 + EPSILON).contains(&t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    fn close(a: Point2, b: Point2) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn test_segment_intersection_cross() {
        let hit = segment_intersection(p(0.0, 0.0), p(10.0, 10.0), p(0.0, 10.0), p(10.0, 0.0));
        assert!(close(hit.unwrap(), p(5.0, 5.0)));
    }

    #[test]
    fn test_segment_intersection_symmetry() {
        let cases = [
            (p(-3.0, 1.0), p(4.0, -2.0), p(0.5, -4.0), p(1.5, 3.0)),
            (p(0.0, 0.0), p(2.0, 0.0), p(1.0, -1.0), p(1.0, 1.0)),
            (p(0.0, 0.0), p(1.0, 1.0), p(2.0, 0.0), p(3.0, 1.0)),
        ];
        for (a, b, c, d) in cases {
            let forward = segment_intersection(a, b, c, d);
            let backward = segment_intersection(c, d, a, b);
            match (forward, backward) {
                (Some(x), Some(y)) => assert!(close(x, y)),
                (None, None) => {}
                other => panic!("asymmetric result: {:?}", other),
            }
        }
    }

    #[test]
    fn test_segment_intersection_misses_outside_range() {
        assert!(segment_intersection(p(0.0, 0.0), p(1.0, 0.0), p(2.0, -1.0), p(2.0, 1.0)).is_none());
    }

    #[test]
    fn test_segment_intersection_touching_endpoint() {
        let hit = segment_intersection(p(0.0, 0.0), p(1.0, 0.0), p(1.0, 0.0), p(1.0, 1.0));
        assert!(close(hit.unwrap(), p(1.0, 0.0)));
    }

    #[test]
    fn test_collinear_overlap_reports_nothing() {
        assert!(segment_intersection(p(0.0, 0.0), p(2.0, 0.0), p(1.0, 0.0), p(3.0, 0.0)).is_none());
    }

    #[test]
    fn test_segment_circle_two_hits() {
        let hits = segment_circle_intersections(p(-5.0, 0.0), p(5.0, 0.0), p(0.0, 0.0), 3.0);
        assert_eq!(hits.len(), 2);
        assert!(close(hits[0], p(-3.0, 0.0)));
        assert!(close(hits[1], p(3.0, 0.0)));
    }

    #[test]
    fn test_segment_circle_tangent() {
        let hits = segment_circle_intersections(p(-5.0, 3.0), p(5.0, 3.0), p(0.0, 0.0), 3.0);
        assert_eq!(hits.len(), 1);
        assert!(close(hits[0], p(0.0, 3.0)));
    }

    #[test]
    fn test_segment_circle_partial() {
        // 线段只穿过圆周一次
        let hits = segment_circle_intersections(p(0.0, 0.0), p(5.0, 0.0), p(0.0, 0.0), 3.0);
        assert_eq!(hits.len(), 1);
        assert!(close(hits[0], p(3.0, 0.0)));
    }

    #[test]
    fn test_circle_circle_two_hits() {
        let hits = circle_circle_intersections(p(0.0, 0.0), 5.0, p(6.0, 0.0), 5.0);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().any(|h| close(*h, p(3.0, 4.0))));
        assert!(hits.iter().any(|h| close(*h, p(3.0, -4.0))));
    }

    #[test]
    fn test_circle_circle_count_law() {
        // 相离
        assert!(circle_circle_intersections(p(0.0, 0.0), 1.0, p(5.0, 0.0), 1.0).is_empty());
        // 内含
        assert!(circle_circle_intersections(p(0.0, 0.0), 5.0, p(1.0, 0.0), 1.0).is_empty());
        // 同心
        assert!(circle_circle_intersections(p(0.0, 0.0), 2.0, p(0.0, 0.0), 3.0).is_empty());
        // 外切
        let outer = circle_circle_intersections(p(0.0, 0.0), 2.0, p(5.0, 0.0), 3.0);
        assert_eq!(outer.len(), 1);
        assert!(close(outer[0], p(2.0, 0.0)));
        // 内切
        let inner = circle_circle_intersections(p(0.0, 0.0), 5.0, p(2.0, 0.0), 3.0);
        assert_eq!(inner.len(), 1);
        assert!(close(inner[0], p(5.0, 0.0)));
    }

    #[test]
    fn test_clip_diagonal() {
        let (a, b) = clip_line_to_box(p(0.0, 0.0), p(1.0, 1.0), &BoundingBox2::square(5.0));
        assert!(close(a, p(-5.0, -5.0)));
        assert!(close(b, p(5.0, 5.0)));
    }

    #[test]
    fn test_clip_orders_by_dominant_axis() {
        // 陡峭直线按 y 排序，与端点给出的方向无关
        let (a, b) = clip_line_to_box(p(1.0, 2.0), p(0.0, -1.0), &BoundingBox2::square(5.0));
        assert!(a.y < b.y);
        assert!((a.y + 5.0).abs() < 1e-9);
        assert!((b.y - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_clip_tie_break_uses_x() {
        let (a, b) = clip_line_to_box(p(1.0, -1.0), p(0.0, 0.0), &BoundingBox2::square(5.0));
        assert!(close(a, p(-5.0, 5.0)));
        assert!(close(b, p(5.0, -5.0)));
    }

    #[test]
    fn test_clip_outside_box_falls_back() {
        let a = p(10.0, 10.0);
        let b = p(11.0, 10.0);
        let clipped = clip_line_to_box(a, b, &BoundingBox2::square(5.0));
        assert_eq!(clipped, (a, b));
    }

    #[test]
    fn test_distances() {
        assert!((point_segment_distance(p(5.0, 5.0), p(0.0, 0.0), p(10.0, 0.0)) - 5.0).abs() < 1e-12);
        assert!((point_segment_distance(p(-3.0, 4.0), p(0.0, 0.0), p(10.0, 0.0)) - 5.0).abs() < 1e-12);
        assert!((point_line_distance(p(-3.0, 4.0), p(0.0, 0.0), p(10.0, 0.0)) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_project_point_clamp() {
        let clamped = project_point(p(-3.0, 4.0), p(0.0, 0.0), p(10.0, 0.0), true).unwrap();
        assert!(close(clamped, p(0.0, 0.0)));
        let free = project_point(p(-3.0, 4.0), p(0.0, 0.0), p(10.0, 0.0), false).unwrap();
        assert!(close(free, p(-3.0, 0.0)));
        assert!(project_point(p(1.0, 1.0), p(2.0, 2.0), p(2.0, 2.0), true).is_none());
    }

    #[test]
    fn test_normal_through() {
        let (a, b) = normal_through(p(0.0, 0.0), p(4.0, 0.0), p(1.0, 1.0), 10.0).unwrap();
        assert!(close(a, p(1.0, -9.0)));
        assert!(close(b, p(1.0, 11.0)));
        assert!(normal_through(p(1.0, 1.0), p(1.0, 1.0), p(0.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_shape_dispatch() {
        let seg = Shape::Segment(Segment::new(p(-5.0, 0.0), p(5.0, 0.0)));
        let circle = Shape::Circle(Circle::new(p(0.0, 0.0), 3.0));
        assert_eq!(seg.intersections(&circle).len(), 2);
        assert_eq!(circle.intersections(&seg).len(), 2);
        assert!(Shape::Point(p(0.0, 0.0)).intersections(&seg).is_empty());
    }
}
