//! 文件操作错误定义

use thiserror::Error;
use vgeo_core::error::ConstructionError;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
}

impl From<FileError> for ConstructionError {
    fn from(err: FileError) -> Self {
        ConstructionError::Storage(err.to_string())
    }
}
