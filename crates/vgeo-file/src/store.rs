//! 基于 JSON 文件的构造存储

use std::path::Path;
use vgeo_core::config::EngineConfig;
use vgeo_core::error::ConstructionError;
use vgeo_core::model::Construction;
use vgeo_core::session::ConstructionStore;

/// 把会话的打开/保存映射到 JSON 构造文件
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStore;

impl ConstructionStore for JsonStore {
    fn load(&self, path: &Path, config: &EngineConfig) -> Result<Construction, ConstructionError> {
        Ok(crate::construction::load(path, config)?)
    }

    fn save(&self, path: &Path, model: &Construction) -> Result<(), ConstructionError> {
        Ok(crate::construction::save(model, path)?)
    }
}
