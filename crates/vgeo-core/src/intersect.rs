//! 交点编排
//!
//! 决定对哪些对象求交，并把结果物化为点（经 `add_point` 自动去重）。
//!
//! - 全量：新建或变化的对象与所有线段、延长线、圆求交
//! - 选择对：恰好选中两个对象时按类别组合选择求交方式
//! - 延长：把选中的线段转换为裁剪到包围盒的延长线
//! - 法线：过选中的点作选中直线的垂线

use crate::entity::{ObjectKind, ObjectRef};
use crate::error::ConstructionError;
use crate::geometry::{clip_line_to_box, normal_through, point_on_circle, project_point, Segment};
use crate::math::Point2;
use crate::model::Construction;
use tracing::{debug, info};

impl Construction {
    /// 在 `position` 处物化一个交点，新建时返回其索引
    pub fn materialize(&mut self, position: Point2) -> Option<usize> {
        self.add_point(position, None, false).ok()
    }

    fn materialize_all(&mut self, hits: Vec<Point2>) -> Vec<usize> {
        hits.into_iter()
            .filter_map(|hit| self.materialize(hit))
            .collect()
    }

    /// `obj` 与其它所有线段、延长线、圆求交，返回新建的点
    pub fn intersect_with_all(&mut self, obj: ObjectRef) -> Vec<usize> {
        let Some(shape) = self.shape(obj) else {
            return Vec::new();
        };

        let hits: Vec<Point2> = self
            .curve_objects()
            .into_iter()
            .filter(|other| *other != obj)
            .filter_map(|other| self.shape(other))
            .flat_map(|other| shape.intersections(&other))
            .collect();

        let created = self.materialize_all(hits);
        debug!(
            "Intersected {} {} with all objects: {} new points",
            obj.kind(),
            obj.index(),
            created.len()
        );
        created
    }

    /// 所有对象两两求交
    pub fn recompute_all_intersections(&mut self) -> Vec<usize> {
        let shapes: Vec<_> = self
            .curve_objects()
            .into_iter()
            .filter_map(|obj| self.shape(obj))
            .collect();

        let mut hits = Vec::new();
        for (i, a) in shapes.iter().enumerate() {
            for b in &shapes[i + 1..] {
                hits.extend(a.intersections(b));
            }
        }

        let created = self.materialize_all(hits);
        info!("Recomputed all intersections: {} new points", created.len());
        created
    }

    /// 对恰好选中的两个对象求交
    ///
    /// 点与有限线段取夹紧的垂足，点与延长线取不夹紧的垂足；
    /// 点与圆只在点位于圆周上时接受（点已存在，不新增）。
    pub fn intersect_selected_pair(&mut self) -> Result<Vec<usize>, ConstructionError> {
        let (first, second) = self.selection().pair().ok_or_else(|| {
            ConstructionError::InvalidSelection(format!(
                "select exactly two objects to intersect, {} selected",
                self.selection().count()
            ))
        })?;

        let hits = match (first, second) {
            (ObjectRef::Point(_), ObjectRef::Point(_)) => {
                return Err(ConstructionError::InvalidSelection(
                    "two points have no intersection".to_string(),
                ))
            }
            (ObjectRef::Point(p), other) | (other, ObjectRef::Point(p)) => {
                let position = self.point_position(p).ok_or(ConstructionError::UnknownObject {
                    kind: ObjectKind::Point,
                    index: p,
                })?;
                self.point_against(position, other)
            }
            (a, b) => match (self.shape(a), self.shape(b)) {
                (Some(a), Some(b)) => a.intersections(&b),
                _ => Vec::new(),
            },
        };

        let created = self.materialize_all(hits);
        debug!(
            "Intersected {} {} with {} {}: {} new points",
            first.kind(),
            first.index(),
            second.kind(),
            second.index(),
            created.len()
        );
        Ok(created)
    }

    fn point_against(&self, position: Point2, other: ObjectRef) -> Vec<Point2> {
        let foot = match other {
            ObjectRef::Line(i) => self
                .line_endpoints(i)
                .and_then(|(a, b)| project_point(position, a, b, true)),
            ObjectRef::ExtendedLine(i) => self
                .extended_line_endpoints(i)
                .and_then(|(a, b)| project_point(position, a, b, false)),
            ObjectRef::Circle(i) => self
                .circles()
                .get(i)
                .filter(|c| point_on_circle(position, &c.circle, self.config().match_tolerance))
                .map(|_| position),
            ObjectRef::Point(_) => None,
        };
        foot.into_iter().collect()
    }

    /// 按当前选择重新求交
    ///
    /// 无选择时全量求交；恰好两个对象时按选择对求交；
    /// 其余情况对每个选中的线段、延长线、圆做全量求交。
    pub fn recompute_intersections(&mut self) -> Result<Vec<usize>, ConstructionError> {
        match self.selection().count() {
            0 => Ok(self.recompute_all_intersections()),
            2 => self.intersect_selected_pair(),
            _ => {
                let targets: Vec<ObjectRef> = self
                    .selection()
                    .objects()
                    .into_iter()
                    .filter(|obj| !matches!(obj, ObjectRef::Point(_)))
                    .collect();
                Ok(targets
                    .into_iter()
                    .flat_map(|obj| self.intersect_with_all(obj))
                    .collect())
            }
        }
    }

    /// 把选中的线段替换为延长线，保留标签，返回新延长线的索引
    ///
    /// 新延长线成为当前选择，并与所有对象求交。
    pub fn extend_selected_lines(&mut self) -> Result<Vec<usize>, ConstructionError> {
        let selected: Vec<usize> = self.selection().lines().collect();
        if selected.is_empty() {
            return Err(ConstructionError::InvalidSelection(
                "select at least one line to extend".to_string(),
            ));
        }

        let bbox = self.config().view_box();
        let mut plans = Vec::with_capacity(selected.len());
        for &index in &selected {
            let (a, b) = self
                .line_endpoints(index)
                .ok_or(ConstructionError::UnknownObject {
                    kind: ObjectKind::Line,
                    index,
                })?;
            if Segment::new(a, b).is_degenerate() {
                return Err(ConstructionError::Degenerate(format!(
                    "line {} has coincident endpoints",
                    index
                )));
            }
            plans.push((index, clip_line_to_box(a, b, &bbox)));
        }

        // 从大到小删除，前面的索引保持有效
        plans.sort_by(|x, y| y.0.cmp(&x.0));
        let mut created = Vec::with_capacity(plans.len());
        for (index, (start, end)) in plans {
            let label = self.remove_line(index).map(|l| l.label).unwrap_or_default();
            created.push(self.add_extended_line(start, end, Some(&label))?);
        }
        created.reverse();

        let selection = self.selection_mut();
        selection.clear();
        for &index in &created {
            selection.add(ObjectRef::ExtendedLine(index));
        }

        for &index in &created {
            self.intersect_with_all(ObjectRef::ExtendedLine(index));
        }

        info!("Extended {} lines", created.len());
        Ok(created)
    }

    /// 过选中的点作选中线段（或延长线）的法线，返回新延长线的索引
    pub fn add_normal_from_selection(&mut self) -> Result<usize, ConstructionError> {
        let (line, point) = match self.selection().pair() {
            Some((ObjectRef::Point(p), l @ (ObjectRef::Line(_) | ObjectRef::ExtendedLine(_))))
            | Some((l @ (ObjectRef::Line(_) | ObjectRef::ExtendedLine(_)), ObjectRef::Point(p))) => {
                (l, p)
            }
            _ => {
                return Err(ConstructionError::InvalidSelection(
                    "select one line and one point to construct a normal".to_string(),
                ))
            }
        };

        let ends = match line {
            ObjectRef::Line(i) => self.line_endpoints(i),
            ObjectRef::ExtendedLine(i) => self.extended_line_endpoints(i),
            _ => None,
        };
        let ((a, b), through) = ends
            .zip(self.point_position(point))
            .ok_or(ConstructionError::UnknownObject {
                kind: line.kind(),
                index: line.index(),
            })?;

        self.add_normal(a, b, through)
    }

    /// 过 `through` 作 `a`-`b` 的法线
    pub fn add_normal(
        &mut self,
        a: Point2,
        b: Point2,
        through: Point2,
    ) -> Result<usize, ConstructionError> {
        let (start, end) = normal_through(a, b, through, self.config().normal_half_length)
            .ok_or_else(|| {
                ConstructionError::Degenerate("cannot build a normal to a zero-length line".to_string())
            })?;

        let index = self.add_extended_line(start, end, None)?;
        self.intersect_with_all(ObjectRef::ExtendedLine(index));
        info!("Added normal {} through ({}, {})", index, through.x, through.y);
        Ok(index)
    }
}
