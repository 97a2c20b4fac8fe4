//! 选择控制器
//!
//! 四个互斥的选择集合（点、线段、延长线、圆）加上点的选择顺序。
//!
//! - 普通选择：清空其它类别，只保留当前对象
//! - 追加选择（切换）：选择为空或同类时直接切换；跨类别只允许凑成两个对象，
//!   供两对象求交、作法线等组合操作使用
//! - 点的选择顺序独立维护：取消选择时移除，重新选择时追加到末尾

use crate::entity::{ObjectKind, ObjectRef};
use crate::error::ConstructionError;
use std::collections::BTreeSet;

/// 跨类别追加选择允许的最大对象数
const MAX_MIXED_SELECTION: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    points: BTreeSet<usize>,
    lines: BTreeSet<usize>,
    extended_lines: BTreeSet<usize>,
    circles: BTreeSet<usize>,
    /// 点的选择顺序，与 `points` 保持同一成员
    point_order: Vec<usize>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, kind: ObjectKind) -> &BTreeSet<usize> {
        match kind {
            ObjectKind::Point => &self.points,
            ObjectKind::Line => &self.lines,
            ObjectKind::ExtendedLine => &self.extended_lines,
            ObjectKind::Circle => &self.circles,
        }
    }

    fn set_mut(&mut self, kind: ObjectKind) -> &mut BTreeSet<usize> {
        match kind {
            ObjectKind::Point => &mut self.points,
            ObjectKind::Line => &mut self.lines,
            ObjectKind::ExtendedLine => &mut self.extended_lines,
            ObjectKind::Circle => &mut self.circles,
        }
    }

    fn insert(&mut self, obj: ObjectRef) {
        self.set_mut(obj.kind()).insert(obj.index());
        if let ObjectRef::Point(i) = obj {
            self.point_order.retain(|&p| p != i);
            self.point_order.push(i);
        }
    }

    /// 普通选择：清空全部后只选中 `obj`
    pub fn select(&mut self, obj: ObjectRef) {
        self.clear();
        self.insert(obj);
    }

    /// 追加选择（切换），返回操作后 `obj` 是否处于选中状态
    pub fn toggle(&mut self, obj: ObjectRef) -> Result<bool, ConstructionError> {
        if self.contains(obj) {
            self.remove(obj);
            return Ok(false);
        }

        if let Some(existing) = self.kinds().into_iter().find(|k| *k != obj.kind()) {
            if self.count() + 1 > MAX_MIXED_SELECTION {
                return Err(ConstructionError::MixedSelection {
                    existing,
                    requested: obj.kind(),
                });
            }
        }

        self.insert(obj);
        Ok(true)
    }

    /// 追加选中 `obj`（已选中时仅把点移到顺序末尾）
    ///
    /// 不做类别限制，用于按记录的坐标恢复选择。
    pub fn add(&mut self, obj: ObjectRef) {
        self.insert(obj);
    }

    /// 取消选中，返回之前是否选中
    pub fn remove(&mut self, obj: ObjectRef) -> bool {
        let removed = self.set_mut(obj.kind()).remove(&obj.index());
        if let ObjectRef::Point(i) = obj {
            self.point_order.retain(|&p| p != i);
        }
        removed
    }

    /// 清空除 `kind` 以外的所有类别
    pub fn retain_only(&mut self, kind: ObjectKind) {
        for other in ObjectKind::ALL {
            if other != kind {
                self.set_mut(other).clear();
            }
        }
        if kind != ObjectKind::Point {
            self.point_order.clear();
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.lines.clear();
        self.extended_lines.clear();
        self.circles.clear();
        self.point_order.clear();
    }

    pub fn contains(&self, obj: ObjectRef) -> bool {
        self.set(obj.kind()).contains(&obj.index())
    }

    /// 四类选择的总数
    pub fn count(&self) -> usize {
        self.points.len() + self.lines.len() + self.extended_lines.len() + self.circles.len()
    }

    pub fn count_of(&self, kind: ObjectKind) -> usize {
        self.set(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// 当前非空的类别
    pub fn kinds(&self) -> Vec<ObjectKind> {
        ObjectKind::ALL
            .into_iter()
            .filter(|k| !self.set(*k).is_empty())
            .collect()
    }

    /// 按选择顺序排列的点索引
    pub fn ordered_points(&self) -> &[usize] {
        &self.point_order
    }

    pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.lines.iter().copied()
    }

    pub fn extended_lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.extended_lines.iter().copied()
    }

    pub fn circles(&self) -> impl Iterator<Item = usize> + '_ {
        self.circles.iter().copied()
    }

    /// 全部选中对象：点按选择顺序，其余按索引
    pub fn objects(&self) -> Vec<ObjectRef> {
        self.point_order
            .iter()
            .map(|&i| ObjectRef::Point(i))
            .chain(self.lines.iter().map(|&i| ObjectRef::Line(i)))
            .chain(self.extended_lines.iter().map(|&i| ObjectRef::ExtendedLine(i)))
            .chain(self.circles.iter().map(|&i| ObjectRef::Circle(i)))
            .collect()
    }

    /// 恰好选中一个对象时返回它
    pub fn single(&self) -> Option<ObjectRef> {
        match self.objects().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// 恰好选中两个对象时返回它们
    pub fn pair(&self) -> Option<(ObjectRef, ObjectRef)> {
        match self.objects().as_slice() {
            [first, second] => Some((*first, *second)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_is_exclusive() {
        let mut sel = Selection::new();
        sel.select(ObjectRef::Point(0));
        sel.toggle(ObjectRef::Point(1)).unwrap();
        sel.select(ObjectRef::Circle(3));

        assert_eq!(sel.kinds(), vec![ObjectKind::Circle]);
        assert_eq!(sel.count(), 1);
        assert!(sel.ordered_points().is_empty());
    }

    #[test]
    fn test_toggle_same_kind() {
        let mut sel = Selection::new();
        assert!(sel.toggle(ObjectRef::Line(2)).unwrap());
        assert!(sel.toggle(ObjectRef::Line(5)).unwrap());
        assert_eq!(sel.count_of(ObjectKind::Line), 2);
        assert!(!sel.toggle(ObjectRef::Line(2)).unwrap());
        assert_eq!(sel.lines().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_point_order_tracks_reselection() {
        let mut sel = Selection::new();
        sel.toggle(ObjectRef::Point(4)).unwrap();
        sel.toggle(ObjectRef::Point(1)).unwrap();
        sel.toggle(ObjectRef::Point(7)).unwrap();
        assert_eq!(sel.ordered_points(), &[4, 1, 7]);

        sel.toggle(ObjectRef::Point(4)).unwrap();
        assert_eq!(sel.ordered_points(), &[1, 7]);

        sel.toggle(ObjectRef::Point(4)).unwrap();
        assert_eq!(sel.ordered_points(), &[1, 7, 4]);
    }

    #[test]
    fn test_mixed_toggle_limited_to_pair() {
        let mut sel = Selection::new();
        sel.select(ObjectRef::Line(0));
        assert!(sel.toggle(ObjectRef::Circle(0)).unwrap());
        assert_eq!(
            sel.pair(),
            Some((ObjectRef::Line(0), ObjectRef::Circle(0)))
        );

        let err = sel.toggle(ObjectRef::Point(0)).unwrap_err();
        assert!(matches!(err, ConstructionError::MixedSelection { .. }));
        assert_eq!(sel.count(), 2);
    }

    #[test]
    fn test_mixed_toggle_rejected_when_kind_already_has_two() {
        let mut sel = Selection::new();
        sel.toggle(ObjectRef::Point(0)).unwrap();
        sel.toggle(ObjectRef::Point(1)).unwrap();
        assert!(sel.toggle(ObjectRef::Line(0)).is_err());
    }

    #[test]
    fn test_add_moves_point_last() {
        let mut sel = Selection::new();
        sel.add(ObjectRef::Point(1));
        sel.add(ObjectRef::Point(2));
        sel.add(ObjectRef::Point(1));
        assert_eq!(sel.ordered_points(), &[2, 1]);
        assert_eq!(sel.count(), 2);
    }

    #[test]
    fn test_single_and_retain_only() {
        let mut sel = Selection::new();
        sel.add(ObjectRef::Point(1));
        sel.add(ObjectRef::Circle(0));
        assert!(sel.single().is_none());

        sel.retain_only(ObjectKind::Point);
        assert_eq!(sel.single(), Some(ObjectRef::Point(1)));
    }
}
