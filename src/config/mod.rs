// ==========================================
// 地质数据导入 - 配置层
// ==========================================
// 职责: 导入相关配置的读取与覆写
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, get_default_db_path, ConfigManager, DB_PATH_ENV};
pub use import_config_trait::{ImportConfigReader, DEFAULT_WAIT_TIMEOUT_MS};
