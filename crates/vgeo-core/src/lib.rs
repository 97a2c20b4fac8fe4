//! VibeGeometry 核心构造引擎
//!
//! 尺规作图式的平面构造：点、线段、延长线、圆，以及它们之间的交点。
//!
//! # 架构设计
//!
//! - `geometry`: 纯函数几何内核（求交、距离、裁剪）
//! - `model`: 构造模型，按索引引用的扁平集合，删除时级联并重映射
//! - `selection`: 四类互斥选择与点的选择顺序
//! - `intersect`: 决定求交范围并把交点物化为点
//! - `macros`: 自包含文本命令的录制与定时回放
//! - `session`: 面向界面层的意图入口
//!
//! # 示例
//!
//! ```rust
//! use vgeo_core::prelude::*;
//!
//! let mut model = Construction::new();
//! model.add_point(Point2::new(-4.0, 0.0), None, true).unwrap();
//! model.add_point(Point2::new(4.0, 0.0), None, true).unwrap();
//! let line = model.connect_selected().unwrap();
//! let circle = model.add_circle(Point2::new(0.0, 3.0), 4.0, None).unwrap();
//!
//! model.select(ObjectRef::Line(line)).unwrap();
//! model.toggle_selection(ObjectRef::Circle(circle)).unwrap();
//! let created = model.recompute_intersections().unwrap();
//! assert_eq!(created.len(), 2);
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod intersect;
pub mod macros;
pub mod math;
pub mod model;
pub mod selection;
pub mod session;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::config::EngineConfig;
    pub use crate::entity::{
        CircleEntry, ExtendedLine, Line, LineEnds, ObjectKind, ObjectRef, PointEntry,
    };
    pub use crate::error::{ConstructionError, MacroParseError};
    pub use crate::geometry::{Circle, Segment, Shape};
    pub use crate::macros::{
        CancelToken, MacroCommand, MacroPlayer, MacroRecorder, NormalSpec, ReplayReport,
        SelectionSpec,
    };
    pub use crate::math::{BoundingBox2, Point2, Vector2};
    pub use crate::model::{Construction, ConstructionParts, DeleteSummary};
    pub use crate::selection::Selection;
    pub use crate::session::{ChangeEvent, ConstructionStore, Session};
}
