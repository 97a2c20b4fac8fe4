//! 引擎配置

use crate::math::{BoundingBox2, EPSILON, MATCH_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 构造引擎配置
///
/// 所有字段都有默认值，配置文件中缺失的字段使用默认值。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 可视区域半边长（包围盒为 `[-s, s]²`）
    pub view_half_span: f64,
    /// 点重合判定容差
    pub point_tolerance: f64,
    /// 宏回放按值匹配、点在圆上判定的容差
    pub match_tolerance: f64,
    /// 法线两侧的延伸长度，需足以穿过包围盒
    pub normal_half_length: f64,
    /// 宏回放命令间隔（毫秒）
    pub replay_delay_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            view_half_span: 5.0,
            point_tolerance: EPSILON,
            match_tolerance: MATCH_TOLERANCE,
            normal_half_length: 1000.0,
            replay_delay_ms: 1000,
        }
    }
}

impl EngineConfig {
    /// 延长线裁剪所用的包围盒
    pub fn view_box(&self) -> BoundingBox2 {
        BoundingBox2::square(self.view_half_span)
    }

    pub fn replay_delay(&self) -> Duration {
        Duration::from_millis(self.replay_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.view_box(), BoundingBox2::square(5.0));
        assert_eq!(config.replay_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "view_half_span": 10.0, "replay_delay_ms": 0 }"#).unwrap();
        assert_eq!(config.view_half_span, 10.0);
        assert_eq!(config.replay_delay(), Duration::ZERO);
        assert_eq!(config.normal_half_length, 1000.0);
        assert_eq!(config.match_tolerance, MATCH_TOLERANCE);
    }
}
