// ==========================================
// 履约中心人力分配系统 - 配置层
// ==========================================
// 职责: 工种/规则/求解/生成参数管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod pipeline_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigError, ConfigManager, ConfigResult};
pub use pipeline_config::{GeneratorConfig, PipelineConfig};
