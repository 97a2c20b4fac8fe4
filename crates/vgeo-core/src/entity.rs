//! 构造实体
//!
//! 点、线段、延长线、圆四类实体，以及指向它们的索引引用。

use crate::geometry::{Circle, Segment, Shape};
use crate::math::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 实体类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Point,
    Line,
    ExtendedLine,
    Circle,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 4] = [
        ObjectKind::Point,
        ObjectKind::Line,
        ObjectKind::ExtendedLine,
        ObjectKind::Circle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Point => "point",
            ObjectKind::Line => "line",
            ObjectKind::ExtendedLine => "extended line",
            ObjectKind::Circle => "circle",
        }
    }

    /// 自动标签前缀
    pub fn label_prefix(&self) -> &'static str {
        match self {
            ObjectKind::Point => "P",
            ObjectKind::Line => "L",
            ObjectKind::ExtendedLine => "E",
            ObjectKind::Circle => "C",
        }
    }

    /// 按集合当前大小生成自动标签：`<前缀><序号+1>`
    pub fn auto_label(&self, ordinal: usize) -> String {
        format!("{}{}", self.label_prefix(), ordinal + 1)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 按类别和索引引用一个实体
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectRef {
    Point(usize),
    Line(usize),
    ExtendedLine(usize),
    Circle(usize),
}

impl ObjectRef {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectRef::Point(_) => ObjectKind::Point,
            ObjectRef::Line(_) => ObjectKind::Line,
            ObjectRef::ExtendedLine(_) => ObjectKind::ExtendedLine,
            ObjectRef::Circle(_) => ObjectKind::Circle,
        }
    }

    pub fn index(&self) -> usize {
        match *self {
            ObjectRef::Point(i)
            | ObjectRef::Line(i)
            | ObjectRef::ExtendedLine(i)
            | ObjectRef::Circle(i) => i,
        }
    }

    pub fn new(kind: ObjectKind, index: usize) -> Self {
        match kind {
            ObjectKind::Point => ObjectRef::Point(index),
            ObjectKind::Line => ObjectRef::Line(index),
            ObjectKind::ExtendedLine => ObjectRef::ExtendedLine(index),
            ObjectKind::Circle => ObjectRef::Circle(index),
        }
    }
}

/// 点
#[derive(Debug, Clone, PartialEq)]
pub struct PointEntry {
    pub position: Point2,
    pub label: String,
}

/// 有限线段的端点来源
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineEnds {
    /// 引用两个点的索引
    Indexed { a: usize, b: usize },
    /// 直接存储端点坐标（文件中的 `custom` 线）
    Literal { start: Point2, end: Point2 },
}

impl LineEnds {
    /// 是否引用同一无序点对
    pub fn same_pair(&self, a: usize, b: usize) -> bool {
        match *self {
            LineEnds::Indexed { a: x, b: y } => (x == a && y == b) || (x == b && y == a),
            LineEnds::Literal { .. } => false,
        }
    }
}

/// 有限线段
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub ends: LineEnds,
    pub label: String,
}

/// 延长线：裁剪到包围盒后的两个端点，不引用任何点
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedLine {
    pub start: Point2,
    pub end: Point2,
    pub label: String,
}

impl ExtendedLine {
    pub fn segment(&self) -> Segment {
        Segment::new(self.start, self.end)
    }

    pub fn shape(&self) -> Shape {
        Shape::Line(self.segment())
    }
}

/// 圆
#[derive(Debug, Clone, PartialEq)]
pub struct CircleEntry {
    pub circle: Circle,
    pub label: String,
}

impl CircleEntry {
    pub fn shape(&self) -> Shape {
        Shape::Circle(self.circle)
    }
}
