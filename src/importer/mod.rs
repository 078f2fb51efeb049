// ==========================================
// 地质数据导入 - 导入层
// ==========================================
// 职责: 分隔文本文件 → 列映射 → 地质对象落库
// 流程: 分隔符推断 → 文件解析 → 列分类 → 角色选择 → 导入运行
// ==========================================

// 模块声明
pub mod column_classifier;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod import_job;
pub mod import_service;
pub mod importer_trait;
pub mod line_importer;
pub mod point_importer;
pub mod progress;
pub mod property_importer;
pub mod selection;
pub mod separator;
pub mod well_importer;
pub mod well_log_importer;

// 重导出核心类型
pub use column_classifier::{classify, parse_float_literal, ColumnInfo, ColumnSet};
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper;
pub use file_parser::{read, read_with_inferred_separator, DelimitedTextParser};
pub use import_job::{importer_for, ImportJob};
pub use import_service::{preview_file, FilePreview, ImportHandle, ImportService, PreparedImport};
pub use line_importer::LineImporter;
pub use point_importer::PointImporter;
pub use progress::{
    ImportEvent, ImportObserver, ImportOutcome, JobControl, JobState, NoOpObserver,
    DEFAULT_CANCEL_MESSAGE,
};
pub use property_importer::PropertyImporter;
pub use selection::{ImportSelection, PropertyColumnSpec, Role, SelectionMapping};
pub use separator::{find_separator, Separator};
pub use well_importer::WellImporter;
pub use well_log_importer::WellLogImporter;

// 重导出 Trait 接口
pub use importer_trait::{FileParser, GeoImporter, ImportContext, ImportOrchestrator, RunFlow};
