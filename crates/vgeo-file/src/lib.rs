//! VibeGeometry 文件格式处理
//!
//! 支持：
//! - `.json` 构造文件（点、线段、延长线、圆）
//! - 宏文件（每行一条文本命令）

pub mod construction;
pub mod error;
pub mod macro_file;
pub mod store;

pub use error::FileError;
pub use store::JsonStore;
