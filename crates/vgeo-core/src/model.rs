//! 构造模型
//!
//! 独占持有点、线段、延长线、圆四个集合及其标签，并维护线段与点之间的引用完整性：
//! - 点按坐标去重（容差内重合的点不可重复插入）
//! - 同一无序点对之间最多一条线段
//! - 删除点时级联删除引用它的线段，压缩点索引并通过翻译表重映射剩余线段
//!
//! 所有修改在返回前一次性完成，外部不会观察到半更新的状态。

use crate::config::EngineConfig;
use crate::entity::{
    CircleEntry, ExtendedLine, Line, LineEnds, ObjectKind, ObjectRef, PointEntry,
};
use crate::error::ConstructionError;
use crate::geometry::{Circle, Segment, Shape};
use crate::math::{coincident, Point2, EPSILON};
use crate::selection::Selection;
use tracing::{debug, warn};

/// 未经校验的构造数据（文件读写使用）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructionParts {
    pub points: Vec<PointEntry>,
    pub lines: Vec<Line>,
    pub extended_lines: Vec<ExtendedLine>,
    pub circles: Vec<CircleEntry>,
}

/// 一次删除操作的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub points: usize,
    pub lines: usize,
    pub extended_lines: usize,
    pub circles: usize,
}

impl DeleteSummary {
    pub fn total(&self) -> usize {
        self.points + self.lines + self.extended_lines + self.circles
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct Construction {
    points: Vec<PointEntry>,
    lines: Vec<Line>,
    extended_lines: Vec<ExtendedLine>,
    circles: Vec<CircleEntry>,
    selection: Selection,
    config: EngineConfig,
}

impl Construction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 由未经校验的数据构建模型
    ///
    /// 重合的点合并为一个，悬空/退化/重复的线段和半径非正的圆被丢弃。
    pub fn from_parts(config: EngineConfig, parts: ConstructionParts) -> Self {
        let mut model = Self::with_config(config);

        // 文件中的点索引 -> 模型中的点索引
        let mut translation = Vec::with_capacity(parts.points.len());
        for entry in parts.points {
            let index = match model.find_point(entry.position, model.config.point_tolerance) {
                Some(existing) => {
                    warn!(
                        "Merging coincident point ({}, {}) into index {}",
                        entry.position.x, entry.position.y, existing
                    );
                    existing
                }
                None => {
                    model.points.push(entry);
                    model.points.len() - 1
                }
            };
            translation.push(index);
        }

        for line in parts.lines {
            let result = match line.ends {
                LineEnds::Indexed { a, b } => {
                    match (translation.get(a).copied(), translation.get(b).copied()) {
                        (Some(a), Some(b)) => model.add_line(a, b, Some(&line.label)),
                        _ => Err(ConstructionError::UnknownObject {
                            kind: ObjectKind::Point,
                            index: a.max(b),
                        }),
                    }
                }
                LineEnds::Literal { start, end } => {
                    model.add_literal_line(start, end, Some(&line.label))
                }
            };
            if let Err(e) = result {
                warn!("Skipping line '{}': {}", line.label, e);
            }
        }

        for ext in parts.extended_lines {
            if let Err(e) = model.add_extended_line(ext.start, ext.end, Some(&ext.label)) {
                warn!("Skipping extended line '{}': {}", ext.label, e);
            }
        }

        for entry in parts.circles {
            if let Err(e) = model.add_circle(entry.circle.center, entry.circle.radius, Some(&entry.label)) {
                warn!("Skipping circle '{}': {}", entry.label, e);
            }
        }

        model
    }

    /// 导出全部数据
    pub fn to_parts(&self) -> ConstructionParts {
        ConstructionParts {
            points: self.points.clone(),
            lines: self.lines.clone(),
            extended_lines: self.extended_lines.clone(),
            circles: self.circles.clone(),
        }
    }

    /// 用另一个模型整体替换当前内容，保留本模型的配置并清空选择
    pub fn replace_with(&mut self, other: Construction) {
        let config = self.config.clone();
        *self = other;
        self.config = config;
        self.selection.clear();
    }

    // ========== 访问器 ==========

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn points(&self) -> &[PointEntry] {
        &self.points
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn extended_lines(&self) -> &[ExtendedLine] {
        &self.extended_lines
    }

    pub fn circles(&self) -> &[CircleEntry] {
        &self.circles
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
            && self.lines.is_empty()
            && self.extended_lines.is_empty()
            && self.circles.is_empty()
    }

    pub fn count_of(&self, kind: ObjectKind) -> usize {
        match kind {
            ObjectKind::Point => self.points.len(),
            ObjectKind::Line => self.lines.len(),
            ObjectKind::ExtendedLine => self.extended_lines.len(),
            ObjectKind::Circle => self.circles.len(),
        }
    }

    /// 引用是否指向存在的对象
    pub fn contains(&self, obj: ObjectRef) -> bool {
        obj.index() < self.count_of(obj.kind())
    }

    pub fn point_position(&self, index: usize) -> Option<Point2> {
        self.points.get(index).map(|p| p.position)
    }

    /// 线段的实际端点（索引线段经点集合解析）
    pub fn line_endpoints(&self, index: usize) -> Option<(Point2, Point2)> {
        let line = self.lines.get(index)?;
        match line.ends {
            LineEnds::Indexed { a, b } => Some((self.point_position(a)?, self.point_position(b)?)),
            LineEnds::Literal { start, end } => Some((start, end)),
        }
    }

    pub fn extended_line_endpoints(&self, index: usize) -> Option<(Point2, Point2)> {
        self.extended_lines.get(index).map(|l| (l.start, l.end))
    }

    /// 对象的几何形状
    pub fn shape(&self, obj: ObjectRef) -> Option<Shape> {
        match obj {
            ObjectRef::Point(i) => self.point_position(i).map(Shape::Point),
            ObjectRef::Line(i) => self
                .line_endpoints(i)
                .map(|(a, b)| Shape::Segment(Segment::new(a, b))),
            ObjectRef::ExtendedLine(i) => self.extended_lines.get(i).map(|l| l.shape()),
            ObjectRef::Circle(i) => self.circles.get(i).map(|c| c.shape()),
        }
    }

    pub fn label(&self, obj: ObjectRef) -> Option<&str> {
        match obj {
            ObjectRef::Point(i) => self.points.get(i).map(|p| p.label.as_str()),
            ObjectRef::Line(i) => self.lines.get(i).map(|l| l.label.as_str()),
            ObjectRef::ExtendedLine(i) => self.extended_lines.get(i).map(|l| l.label.as_str()),
            ObjectRef::Circle(i) => self.circles.get(i).map(|c| c.label.as_str()),
        }
    }

    /// 全部非点对象（线段、延长线、圆）
    pub fn curve_objects(&self) -> Vec<ObjectRef> {
        (0..self.lines.len())
            .map(ObjectRef::Line)
            .chain((0..self.extended_lines.len()).map(ObjectRef::ExtendedLine))
            .chain((0..self.circles.len()).map(ObjectRef::Circle))
            .collect()
    }

    // ========== 按值查找 ==========

    pub fn find_point(&self, position: Point2, tolerance: f64) -> Option<usize> {
        self.points
            .iter()
            .position(|p| coincident(&p.position, &position, tolerance))
    }

    /// 按端点查找线段（端点无序）
    pub fn find_line(&self, a: Point2, b: Point2, tolerance: f64) -> Option<usize> {
        (0..self.lines.len()).find(|&i| {
            self.line_endpoints(i)
                .is_some_and(|(s, e)| same_endpoints(s, e, a, b, tolerance))
        })
    }

    pub fn find_extended_line(&self, a: Point2, b: Point2, tolerance: f64) -> Option<usize> {
        self.extended_lines
            .iter()
            .position(|l| same_endpoints(l.start, l.end, a, b, tolerance))
    }

    pub fn find_circle(&self, center: Point2, radius: f64, tolerance: f64) -> Option<usize> {
        self.circles.iter().position(|c| {
            coincident(&c.circle.center, &center, tolerance)
                && (c.circle.radius - radius).abs() <= tolerance
        })
    }

    /// 模型空间命中测试：点优先，其次距离最近的线段/延长线/圆
    pub fn hit_test(&self, position: Point2, tolerance: f64) -> Option<ObjectRef> {
        let nearest = |candidates: Vec<ObjectRef>| {
            candidates
                .into_iter()
                .filter_map(|obj| {
                    let d = self.shape(obj)?.distance_to(&position);
                    (d <= tolerance).then_some((obj, d))
                })
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(obj, _)| obj)
        };

        nearest((0..self.points.len()).map(ObjectRef::Point).collect())
            .or_else(|| nearest(self.curve_objects()))
    }

    // ========== 创建 ==========

    /// 未给出名称时按类别自动编号；显式给出的名称（包括空串）原样保留
    fn resolve_label(&self, kind: ObjectKind, label: Option<&str>) -> String {
        match label {
            Some(text) => text.to_string(),
            None => kind.auto_label(self.count_of(kind)),
        }
    }

    /// 添加点；已有重合点时失败
    ///
    /// `mark_selected` 为真时把新点追加到点选择的末尾（其它类别的选择被清空）。
    pub fn add_point(
        &mut self,
        position: Point2,
        label: Option<&str>,
        mark_selected: bool,
    ) -> Result<usize, ConstructionError> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return Err(ConstructionError::Degenerate(
                "point coordinates must be finite".to_string(),
            ));
        }
        if self.find_point(position, self.config.point_tolerance).is_some() {
            return Err(ConstructionError::DuplicatePoint {
                x: position.x,
                y: position.y,
            });
        }

        let label = self.resolve_label(ObjectKind::Point, label);
        self.points.push(PointEntry { position, label });
        let index = self.points.len() - 1;

        if mark_selected {
            self.selection.retain_only(ObjectKind::Point);
            self.selection.add(ObjectRef::Point(index));
        }

        debug!("Added point {} at ({}, {})", index, position.x, position.y);
        Ok(index)
    }

    /// 添加引用两个点的线段；同一无序点对已有线段时失败
    pub fn add_line(
        &mut self,
        a: usize,
        b: usize,
        label: Option<&str>,
    ) -> Result<usize, ConstructionError> {
        for index in [a, b] {
            if index >= self.points.len() {
                return Err(ConstructionError::UnknownObject {
                    kind: ObjectKind::Point,
                    index,
                });
            }
        }
        if a == b {
            return Err(ConstructionError::Degenerate(
                "a line needs two distinct points".to_string(),
            ));
        }
        if self.lines.iter().any(|l| l.ends.same_pair(a, b)) {
            return Err(ConstructionError::DuplicateLine { a, b });
        }

        let label = self.resolve_label(ObjectKind::Line, label);
        self.lines.push(Line {
            ends: LineEnds::Indexed { a, b },
            label,
        });
        debug!("Added line {} between points {} and {}", self.lines.len() - 1, a, b);
        Ok(self.lines.len() - 1)
    }

    /// 添加直接存储端点坐标的有限线段
    pub fn add_literal_line(
        &mut self,
        start: Point2,
        end: Point2,
        label: Option<&str>,
    ) -> Result<usize, ConstructionError> {
        if Segment::new(start, end).is_degenerate() {
            return Err(ConstructionError::Degenerate(
                "line endpoints coincide".to_string(),
            ));
        }
        let label = self.resolve_label(ObjectKind::Line, label);
        self.lines.push(Line {
            ends: LineEnds::Literal { start, end },
            label,
        });
        debug!(
            "Added literal line {} from ({}, {}) to ({}, {})",
            self.lines.len() - 1,
            start.x,
            start.y,
            end.x,
            end.y
        );
        Ok(self.lines.len() - 1)
    }

    /// 添加延长线（无唯一性约束）
    pub fn add_extended_line(
        &mut self,
        start: Point2,
        end: Point2,
        label: Option<&str>,
    ) -> Result<usize, ConstructionError> {
        if Segment::new(start, end).is_degenerate() {
            return Err(ConstructionError::Degenerate(
                "extended line endpoints coincide".to_string(),
            ));
        }
        let label = self.resolve_label(ObjectKind::ExtendedLine, label);
        self.extended_lines.push(ExtendedLine { start, end, label });
        debug!("Added extended line {}", self.extended_lines.len() - 1);
        Ok(self.extended_lines.len() - 1)
    }

    /// 添加圆；半径必须为正
    pub fn add_circle(
        &mut self,
        center: Point2,
        radius: f64,
        label: Option<&str>,
    ) -> Result<usize, ConstructionError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ConstructionError::Degenerate(format!(
                "circle radius must be positive, got {}",
                radius
            )));
        }
        let label = self.resolve_label(ObjectKind::Circle, label);
        self.circles.push(CircleEntry {
            circle: Circle::new(center, radius),
            label,
        });
        debug!(
            "Added circle {} at ({}, {}) r={}",
            self.circles.len() - 1,
            center.x,
            center.y,
            radius
        );
        Ok(self.circles.len() - 1)
    }

    /// 连接最先选中的两个点
    pub fn connect_selected(&mut self) -> Result<usize, ConstructionError> {
        let ordered = self.selection.ordered_points();
        if ordered.len() < 2 {
            return Err(ConstructionError::InvalidSelection(
                "select at least two points to connect".to_string(),
            ));
        }
        let (a, b) = (ordered[0], ordered[1]);
        self.add_line(a, b, None)
    }

    /// 以第一个选中的点为圆心、第二个为圆上一点创建圆
    pub fn add_circle_from_selection(&mut self) -> Result<usize, ConstructionError> {
        let ordered = self.selection.ordered_points();
        if ordered.len() != 2 {
            return Err(ConstructionError::InvalidSelection(
                "select exactly two points: center, then edge".to_string(),
            ));
        }
        let (center, edge) = match (
            self.point_position(ordered[0]),
            self.point_position(ordered[1]),
        ) {
            (Some(c), Some(e)) => (c, e),
            _ => {
                return Err(ConstructionError::InvalidSelection(
                    "selected points no longer exist".to_string(),
                ))
            }
        };

        let circle = Circle::from_center_edge(center, edge);
        if circle.radius <= EPSILON {
            return Err(ConstructionError::Degenerate(
                "center and edge points coincide".to_string(),
            ));
        }
        self.add_circle(circle.center, circle.radius, None)
    }

    // ========== 删除 ==========

    /// 删除选中的对象
    ///
    /// 引用被删点的线段一并删除；剩余点压缩后，线段通过翻译表重映射端点索引。
    pub fn delete_selected(&mut self) -> Result<DeleteSummary, ConstructionError> {
        if self.selection.is_empty() {
            return Err(ConstructionError::EmptySelection);
        }

        let mut summary = DeleteSummary::default();

        // 旧索引 -> 新索引（被删除为 None）
        let mut translation: Vec<Option<usize>> = Vec::with_capacity(self.points.len());
        let mut kept_points = Vec::with_capacity(self.points.len());
        for (i, entry) in std::mem::take(&mut self.points).into_iter().enumerate() {
            if self.selection.contains(ObjectRef::Point(i)) {
                translation.push(None);
                summary.points += 1;
            } else {
                translation.push(Some(kept_points.len()));
                kept_points.push(entry);
            }
        }
        self.points = kept_points;

        let mut kept_lines = Vec::with_capacity(self.lines.len());
        for (i, mut line) in std::mem::take(&mut self.lines).into_iter().enumerate() {
            if self.selection.contains(ObjectRef::Line(i)) {
                summary.lines += 1;
                continue;
            }
            if let LineEnds::Indexed { a, b } = line.ends {
                match (
                    translation.get(a).copied().flatten(),
                    translation.get(b).copied().flatten(),
                ) {
                    (Some(a), Some(b)) => line.ends = LineEnds::Indexed { a, b },
                    _ => {
                        summary.lines += 1;
                        continue;
                    }
                }
            }
            kept_lines.push(line);
        }
        self.lines = kept_lines;

        let selection = &self.selection;
        let before = self.extended_lines.len();
        let mut index = 0;
        self.extended_lines.retain(|_| {
            let keep = !selection.contains(ObjectRef::ExtendedLine(index));
            index += 1;
            keep
        });
        summary.extended_lines = before - self.extended_lines.len();

        let before = self.circles.len();
        let mut index = 0;
        self.circles.retain(|_| {
            let keep = !selection.contains(ObjectRef::Circle(index));
            index += 1;
            keep
        });
        summary.circles = before - self.circles.len();

        self.selection.clear();

        debug!(
            "Deleted {} points, {} lines, {} extended lines, {} circles",
            summary.points, summary.lines, summary.extended_lines, summary.circles
        );
        Ok(summary)
    }

    /// 清空全部对象和选择，返回之前是否有内容
    pub fn delete_all(&mut self) -> bool {
        let had_content = !self.is_empty();
        self.points.clear();
        self.lines.clear();
        self.extended_lines.clear();
        self.circles.clear();
        self.selection.clear();
        had_content
    }

    /// 按索引删除一条线段，不影响其它集合
    pub(crate) fn remove_line(&mut self, index: usize) -> Option<Line> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    // ========== 标签 ==========

    /// 为唯一选中的对象设置标签
    pub fn set_label(&mut self, text: &str) -> Result<ObjectRef, ConstructionError> {
        let target = self.selection.single().ok_or_else(|| {
            ConstructionError::InvalidSelection(format!(
                "select exactly one object to label, {} selected",
                self.selection.count()
            ))
        })?;

        let slot = match target {
            ObjectRef::Point(i) => self.points.get_mut(i).map(|p| &mut p.label),
            ObjectRef::Line(i) => self.lines.get_mut(i).map(|l| &mut l.label),
            ObjectRef::ExtendedLine(i) => self.extended_lines.get_mut(i).map(|l| &mut l.label),
            ObjectRef::Circle(i) => self.circles.get_mut(i).map(|c| &mut c.label),
        };
        let slot = slot.ok_or(ConstructionError::UnknownObject {
            kind: target.kind(),
            index: target.index(),
        })?;
        *slot = text.to_string();

        debug!("Labelled {} {} as '{}'", target.kind(), target.index(), text);
        Ok(target)
    }

    // ========== 选择 ==========

    fn check_exists(&self, obj: ObjectRef) -> Result<(), ConstructionError> {
        if self.contains(obj) {
            Ok(())
        } else {
            Err(ConstructionError::UnknownObject {
                kind: obj.kind(),
                index: obj.index(),
            })
        }
    }

    /// 普通选择
    pub fn select(&mut self, obj: ObjectRef) -> Result<(), ConstructionError> {
        self.check_exists(obj)?;
        self.selection.select(obj);
        Ok(())
    }

    /// 追加选择（切换）
    pub fn toggle_selection(&mut self, obj: ObjectRef) -> Result<bool, ConstructionError> {
        self.check_exists(obj)?;
        self.selection.toggle(obj)
    }

    /// 追加选中（不切换、不限制类别）
    pub fn add_to_selection(&mut self, obj: ObjectRef) -> Result<(), ConstructionError> {
        self.check_exists(obj)?;
        self.selection.add(obj);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub(crate) fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }
}

fn same_endpoints(s: Point2, e: Point2, a: Point2, b: Point2, tolerance: f64) -> bool {
    (coincident(&s, &a, tolerance) && coincident(&e, &b, tolerance))
        || (coincident(&s, &b, tolerance) && coincident(&e, &a, tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn test_add_point_dedup() {
        let mut model = Construction::new();
        assert_eq!(model.add_point(p(1.0, 2.0), None, false), Ok(0));
        let second = model.add_point(p(1.0, 2.0 + 1e-12), None, false);
        assert!(matches!(second, Err(ConstructionError::DuplicatePoint { .. })));
        assert_eq!(model.point_count(), 1);
    }

    #[test]
    fn test_auto_and_explicit_labels() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, false).unwrap();
        model.add_point(p(1.0, 0.0), Some("A"), false).unwrap();
        model.add_point(p(2.0, 0.0), Some(""), false).unwrap();
        model.add_point(p(3.0, 0.0), None, false).unwrap();
        let labels: Vec<_> = model.points().iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["P1", "A", "", "P4"]);

        model.add_line(0, 1, None).unwrap();
        model.add_circle(p(0.0, 0.0), 1.0, None).unwrap();
        assert_eq!(model.label(ObjectRef::Line(0)), Some("L1"));
        assert_eq!(model.label(ObjectRef::Circle(0)), Some("C1"));
    }

    #[test]
    fn test_duplicate_line_unordered() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, false).unwrap();
        model.add_point(p(1.0, 0.0), None, false).unwrap();
        model.add_line(0, 1, None).unwrap();
        assert_eq!(
            model.add_line(1, 0, None),
            Err(ConstructionError::DuplicateLine { a: 1, b: 0 })
        );
        assert!(model.add_line(0, 0, None).is_err());
        assert!(model.add_line(0, 9, None).is_err());
        assert_eq!(model.lines().len(), 1);
    }

    #[test]
    fn test_add_circle_rejects_non_positive_radius() {
        let mut model = Construction::new();
        assert!(model.add_circle(p(0.0, 0.0), 0.0, None).is_err());
        assert!(model.add_circle(p(0.0, 0.0), -1.0, None).is_err());
        assert!(model.circles().is_empty());
    }

    #[test]
    fn test_mark_selected_appends_to_point_order() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, true).unwrap();
        model.add_point(p(1.0, 0.0), None, true).unwrap();
        assert_eq!(model.selection().ordered_points(), &[0, 1]);

        model.connect_selected().unwrap();
        assert_eq!(model.line_endpoints(0), Some((p(0.0, 0.0), p(1.0, 0.0))));
    }

    #[test]
    fn test_circle_from_selection_uses_order() {
        let mut model = Construction::new();
        model.add_point(p(3.0, 0.0), None, false).unwrap();
        model.add_point(p(0.0, 0.0), None, false).unwrap();
        model.toggle_selection(ObjectRef::Point(1)).unwrap();
        model.toggle_selection(ObjectRef::Point(0)).unwrap();

        let index = model.add_circle_from_selection().unwrap();
        let circle = model.circles()[index].circle;
        assert_eq!(circle.center, p(0.0, 0.0));
        assert!((circle.radius - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_cascading_delete_remaps_lines() {
        let mut model = Construction::new();
        for x in 0..4 {
            model.add_point(p(x as f64, 0.0), None, false).unwrap();
        }
        model.add_point(p(0.0, 1.0), None, false).unwrap();
        model.add_line(0, 1, None).unwrap();
        model.add_line(2, 3, None).unwrap();
        model.add_line(3, 4, None).unwrap();
        model.add_literal_line(p(-1.0, -1.0), p(1.0, 1.0), None).unwrap();

        model.select(ObjectRef::Point(1)).unwrap();
        let summary = model.delete_selected().unwrap();

        assert_eq!(summary.points, 1);
        assert_eq!(summary.lines, 1);
        assert_eq!(model.point_count(), 4);
        assert_eq!(model.lines().len(), 3);
        for line in model.lines() {
            if let LineEnds::Indexed { a, b } = line.ends {
                assert!(a < model.point_count() && b < model.point_count());
            }
        }
        assert_eq!(model.line_endpoints(0), Some((p(2.0, 0.0), p(3.0, 0.0))));
        assert_eq!(model.line_endpoints(1), Some((p(3.0, 0.0), p(0.0, 1.0))));
        assert!(model.selection().is_empty());
    }

    #[test]
    fn test_delete_selected_mixed_kinds() {
        let mut model = Construction::new();
        model.add_circle(p(0.0, 0.0), 1.0, None).unwrap();
        model.add_circle(p(0.0, 0.0), 2.0, None).unwrap();
        model.add_extended_line(p(-5.0, 0.0), p(5.0, 0.0), None).unwrap();

        model.select(ObjectRef::Circle(0)).unwrap();
        model.add_to_selection(ObjectRef::ExtendedLine(0)).unwrap();
        let summary = model.delete_selected().unwrap();

        assert_eq!(summary.circles, 1);
        assert_eq!(summary.extended_lines, 1);
        assert_eq!(model.circles()[0].circle.radius, 2.0);
        assert!(model.extended_lines().is_empty());
    }

    #[test]
    fn test_delete_with_empty_selection_fails() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, false).unwrap();
        assert_eq!(model.delete_selected(), Err(ConstructionError::EmptySelection));
        assert_eq!(model.point_count(), 1);
    }

    #[test]
    fn test_delete_all() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, true).unwrap();
        model.add_circle(p(0.0, 0.0), 1.0, None).unwrap();
        assert!(model.delete_all());
        assert!(model.is_empty());
        assert!(model.selection().is_empty());
        assert!(!model.delete_all());
    }

    #[test]
    fn test_set_label_requires_single_selection() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, false).unwrap();
        model.add_point(p(1.0, 0.0), None, false).unwrap();

        assert!(model.set_label("X").is_err());

        model.select(ObjectRef::Point(1)).unwrap();
        model.toggle_selection(ObjectRef::Point(0)).unwrap();
        assert!(model.set_label("X").is_err());
        assert_eq!(model.label(ObjectRef::Point(0)), Some("P1"));

        model.select(ObjectRef::Point(1)).unwrap();
        assert_eq!(model.set_label("X"), Ok(ObjectRef::Point(1)));
        assert_eq!(model.label(ObjectRef::Point(1)), Some("X"));
    }

    #[test]
    fn test_from_parts_drops_invalid_entries() {
        let parts = ConstructionParts {
            points: vec![
                PointEntry { position: p(0.0, 0.0), label: "A".into() },
                PointEntry { position: p(1.0, 0.0), label: "B".into() },
                PointEntry { position: p(0.0, 0.0), label: "A'".into() },
            ],
            lines: vec![
                Line { ends: LineEnds::Indexed { a: 0, b: 1 }, label: "AB".into() },
                Line { ends: LineEnds::Indexed { a: 2, b: 1 }, label: "dup".into() },
                Line { ends: LineEnds::Indexed { a: 0, b: 7 }, label: "dangling".into() },
            ],
            extended_lines: vec![],
            circles: vec![
                CircleEntry { circle: Circle::new(p(0.0, 0.0), 0.0), label: "bad".into() },
                CircleEntry { circle: Circle::new(p(0.0, 0.0), 2.0), label: "ok".into() },
            ],
        };

        let model = Construction::from_parts(EngineConfig::default(), parts);
        assert_eq!(model.point_count(), 2);
        assert_eq!(model.lines().len(), 1);
        assert_eq!(model.label(ObjectRef::Line(0)), Some("AB"));
        assert_eq!(model.circles().len(), 1);
        assert_eq!(model.label(ObjectRef::Circle(0)), Some("ok"));
    }

    #[test]
    fn test_hit_test_prefers_points() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, false).unwrap();
        model.add_point(p(4.0, 0.0), None, false).unwrap();
        model.add_line(0, 1, None).unwrap();
        model.add_circle(p(0.0, 0.0), 2.0, None).unwrap();

        assert_eq!(model.hit_test(p(0.01, 0.0), 0.1), Some(ObjectRef::Point(0)));
        assert_eq!(model.hit_test(p(3.0, 0.05), 0.1), Some(ObjectRef::Line(0)));
        assert_eq!(model.hit_test(p(0.0, 2.05), 0.1), Some(ObjectRef::Circle(0)));
        assert_eq!(model.hit_test(p(3.0, 3.0), 0.1), None);
    }

    #[test]
    fn test_find_by_value() {
        let mut model = Construction::new();
        model.add_point(p(0.0, 0.0), None, false).unwrap();
        model.add_point(p(2.0, 2.0), None, false).unwrap();
        model.add_line(0, 1, None).unwrap();
        model.add_circle(p(1.0, 1.0), 3.0, None).unwrap();

        assert_eq!(model.find_line(p(2.0, 2.0), p(0.0, 0.0), 1e-6), Some(0));
        assert_eq!(model.find_circle(p(1.0, 1.0 + 1e-9), 3.0, 1e-6), Some(0));
        assert_eq!(model.find_circle(p(1.0, 1.0), 3.1, 1e-6), None);
    }
}
