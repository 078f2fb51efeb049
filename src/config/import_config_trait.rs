// ==========================================
// 地质数据导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入模块所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::importer::error::ImportResult;
use crate::importer::separator::Separator;
use std::path::PathBuf;

/// 等待工作线程结束的默认超时（毫秒）
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 2_000;

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入模块所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
pub trait ImportConfigReader: Send + Sync {
    /// 获取预设分隔符
    ///
    /// # 返回
    /// - Some(Separator): 用户上次选择的分隔符（对新文件无效时仍会重新推断）
    /// - None: 未配置，按表头推断
    fn get_separator(&self) -> ImportResult<Option<Separator>>;

    /// 获取等待工作线程结束的超时
    ///
    /// # 默认值
    /// - 2000 毫秒
    fn get_wait_timeout_ms(&self) -> ImportResult<u64>;

    /// 获取默认参考系（WKT，原样透传）
    ///
    /// # 默认值
    /// - 空串
    fn get_reference_system(&self) -> ImportResult<String>;

    /// 获取上次使用的工作目录（文件选择的起始目录）
    fn get_working_path(&self) -> ImportResult<Option<PathBuf>>;
}
