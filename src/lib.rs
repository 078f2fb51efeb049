// ==========================================
// 地质数据导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 定位: 分隔文本文件（点/线/井/属性/测井）导入地质数据库
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 导入文件表示与地质对象
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 解析、列映射与导入运行
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建库）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    GeoPoint, ImportKind, ImportRecord, Line, Property, PropertyType, Stratigraphy, Well, WellLog,
    WellMarker,
};

// 导入
pub use importer::{
    ImportError, ImportHandle, ImportObserver, ImportOutcome, ImportResult, ImportSelection,
    ImportService, Separator,
};

// 仓储
pub use repository::{GeoSession, GeoStore, SqliteGeoStore};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "地质数据导入";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
