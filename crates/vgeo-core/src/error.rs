//! 构造操作错误定义
//!
//! 所有错误都是可恢复的：返回 `Err` 时模型保持不变。

use crate::entity::ObjectKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("A point already exists at ({x}, {y})")]
    DuplicatePoint { x: f64, y: f64 },

    #[error("A line between points {a} and {b} already exists")]
    DuplicateLine { a: usize, b: usize },

    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    #[error("Cannot add a {requested} to a selection of {existing}s")]
    MixedSelection {
        existing: ObjectKind,
        requested: ObjectKind,
    },

    #[error("Nothing is selected")]
    EmptySelection,

    #[error("Degenerate geometry: {0}")]
    Degenerate(String),

    #[error("Unknown {kind} index: {index}")]
    UnknownObject { kind: ObjectKind, index: usize },

    #[error("No {kind} matches the recorded coordinates")]
    Unresolved { kind: ObjectKind },

    #[error("Storage error: {0}")]
    Storage(String),
}

/// 宏命令文本解析错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MacroParseError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Malformed payload for {command}: {payload}")]
    MalformedPayload { command: String, payload: String },
}
