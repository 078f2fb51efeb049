// ==========================================
// 地质数据导入 - 导入 Trait
// ==========================================
// 职责: 定义文件解析 / 单类型导入策略 / 运行编排 接口（不包含实现）
// ==========================================

use crate::domain::{ImportKind, ImportRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::progress::{ImportOutcome, JobControl, ProgressReporter};
use crate::importer::selection::{PropertyColumnSpec, SelectionMapping};
use crate::importer::separator::Separator;
use crate::repository::GeoSession;
use std::path::Path;
use tracing::warn;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 导入文件解析接口
// 实现者: DelimitedTextParser
pub trait FileParser: Send + Sync {
    /// 按指定分隔符解析文件
    fn parse(&self, file_path: &Path, separator: Separator) -> ImportResult<ImportRecord>;
}

// ==========================================
// RunFlow - 导入循环的结束方式
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFlow {
    /// 全部行处理完毕
    Completed,
    /// 在行/分组边界检测到取消请求
    Canceled,
}

// ==========================================
// ImportContext - 单次运行的输入与运行期状态
// ==========================================
pub struct ImportContext<'a> {
    pub record: &'a ImportRecord,
    pub mapping: &'a SelectionMapping,
    pub properties: &'a [PropertyColumnSpec],
    pub reference_system: &'a str,
    pub session: &'a mut dyn GeoSession,
    pub progress: ProgressReporter<'a>,
    control: &'a JobControl,
    warnings: usize,
}

impl<'a> ImportContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        record: &'a ImportRecord,
        mapping: &'a SelectionMapping,
        properties: &'a [PropertyColumnSpec],
        reference_system: &'a str,
        session: &'a mut dyn GeoSession,
        progress: ProgressReporter<'a>,
        control: &'a JobControl,
    ) -> Self {
        Self {
            record,
            mapping,
            properties,
            reference_system,
            session,
            progress,
            control,
            warnings: 0,
        }
    }

    /// 记录一条可恢复的行级问题（跳过该行/该值，继续导入）
    pub fn warn_row(&mut self, row: usize, message: &str) {
        self.warnings += 1;
        warn!(row = row, "{}", message);
    }

    /// 目标记录不存在：计入警告并跳过该行
    pub fn warn_missing(&mut self, row: usize, target: String) {
        let message = format!("{}，跳过该行", ImportError::Lookup(target));
        self.warn_row(row, &message);
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// 行/分组边界：推进进度并检查取消标志
    ///
    /// # 返回
    /// - true: 已请求取消，调用方应立即结束循环
    pub fn checkpoint(&mut self, processed: usize) -> bool {
        self.progress.advance(processed);
        self.control.is_cancel_requested()
    }
}

// ==========================================
// GeoImporter Trait
// ==========================================
// 用途: 单一导入类型的导入策略
// 实现者: PointImporter, LineImporter, WellImporter, PropertyImporter, WellLogImporter
pub trait GeoImporter: Send + Sync {
    fn kind(&self) -> ImportKind;

    /// 执行导入循环
    ///
    /// # 返回
    /// - Ok(RunFlow::Completed): 正常结束
    /// - Ok(RunFlow::Canceled): 检测到取消，已提交的记录保留
    /// - Err: 致命错误，整次运行失败
    fn execute(&self, ctx: &mut ImportContext<'_>) -> ImportResult<RunFlow>;
}

// ==========================================
// ImportOrchestrator Trait
// ==========================================
// 用途: 一次导入运行的对外控制面
// 实现者: ImportJob
pub trait ImportOrchestrator: Send + Sync {
    /// 在当前线程执行导入，返回终态（只运行一次）
    fn run(&self) -> ImportOutcome;

    /// 请求取消（只保留第一次的消息，终态后无效果）
    fn cancel(&self, message: &str);

    /// 当前进度 0-100
    fn progress(&self) -> u8;

    /// 终态；运行中或未开始为 None
    fn outcome(&self) -> Option<ImportOutcome>;
}
