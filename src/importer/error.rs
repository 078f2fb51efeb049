// ==========================================
// 地质数据导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件读取失败: {0}")]
    Io(String),

    #[error("文件格式错误: {0}")]
    Format(String),

    #[error("找不到足够的数值列（需要至少 {required} 个，实际 {found} 个），请更换分隔符或文件")]
    InsufficientColumns { required: usize, found: usize },

    // ===== 选择映射错误 =====
    #[error("未知的角色: {0}")]
    UnknownRole(String),

    #[error("未知的列: {0}")]
    UnknownColumn(String),

    #[error("必选角色未绑定列: {0}")]
    MissingRequiredRole(String),

    // ===== 数据转换错误 =====
    #[error("数值解析失败 (行 {row}, 列 {column}): {value:?}")]
    ValueParse {
        row: usize,
        column: String,
        value: String,
    },

    #[error("目标记录不存在: {0}")]
    Lookup(String),

    #[error("钻井 {well} 的标记深度 {marker_depth} 超过总深度 {total_depth}")]
    MarkerDepth {
        well: String,
        marker_depth: f64,
        total_depth: f64,
    },

    // ===== 基础设施错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("锁获取失败: {0}")]
    Lock(String),

    #[error("配置错误 (key: {key}): {message}")]
    Config { key: String, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::Io(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
