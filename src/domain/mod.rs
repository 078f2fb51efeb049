// ==========================================
// 地质数据导入 - 领域层
// ==========================================
// 职责: 导入文件表示 + 地质对象实体 + 枚举类型
// 红线: 领域层不依赖数据库与导入流程
// ==========================================

pub mod geo;
pub mod import_record;
pub mod types;

// 重导出核心类型
pub use geo::{
    GeoPoint, Line, Property, Stratigraphy, Well, WellLog, WellLogValue, WellMarker, UNKNOWN_AGE,
    UNKNOWN_DEPTH,
};
pub use import_record::{ImportColumn, ImportRecord};
pub use types::{ImportKind, PropertyType};
