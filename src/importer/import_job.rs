// ==========================================
// 地质数据导入 - 导入运行（ImportJob）
// ==========================================
// 状态机: Idle → Running → {Succeeded, SucceededWithWarnings, Failed, Canceled}
// 资源: 运行锁（每种导入类型一把）+ 独立会话（任何出口都恰好关闭一次）
// 通知: 每次运行恰好一次终态通知
// ==========================================

use crate::domain::{ImportKind, ImportRecord};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::{
    GeoImporter, ImportContext, ImportOrchestrator, RunFlow,
};
use crate::importer::line_importer::LineImporter;
use crate::importer::point_importer::PointImporter;
use crate::importer::progress::{ImportObserver, ImportOutcome, JobControl, ProgressReporter};
use crate::importer::property_importer::PropertyImporter;
use crate::importer::selection::{PropertyColumnSpec, SelectionMapping};
use crate::importer::well_importer::WellImporter;
use crate::importer::well_log_importer::WellLogImporter;
use crate::repository::{GeoSession, GeoStore, RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// 按导入类型选择导入策略
pub fn importer_for(kind: ImportKind) -> Box<dyn GeoImporter> {
    match kind {
        ImportKind::Point => Box::new(PointImporter),
        ImportKind::Line => Box::new(LineImporter),
        ImportKind::Well => Box::new(WellImporter),
        ImportKind::Property => Box::new(PropertyImporter),
        ImportKind::WellLog => Box::new(WellLogImporter),
    }
}

// ==========================================
// SessionGuard - 会话作用域守卫
// ==========================================
// close() 显式关闭并返回错误；未显式关闭时在 Drop 中关闭
struct SessionGuard {
    session: Option<Box<dyn GeoSession>>,
}

impl SessionGuard {
    fn new(session: Box<dyn GeoSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session_mut(&mut self) -> ImportResult<&mut dyn GeoSession> {
        match self.session.as_mut() {
            Some(session) => Ok(&mut **session),
            None => Err(ImportError::Repository(RepositoryError::SessionClosed)),
        }
    }

    fn close(&mut self) -> RepositoryResult<()> {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => Ok(()),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "会话关闭失败");
        }
    }
}

// ==========================================
// ImportJob
// ==========================================
pub struct ImportJob {
    id: Uuid,
    kind: ImportKind,
    record: ImportRecord,
    mapping: SelectionMapping,
    properties: Vec<PropertyColumnSpec>,
    reference_system: String,
    store: Arc<dyn GeoStore>,
    run_lock: Arc<Mutex<()>>,
    control: Arc<JobControl>,
    observer: Arc<dyn ImportObserver>,
    importer: Box<dyn GeoImporter>,
    created_at: DateTime<Utc>,
}

impl ImportJob {
    /// 创建新的导入运行（状态 Idle）
    ///
    /// # 参数
    /// - record: 已解析的导入文件
    /// - mapping: 角色绑定（创建时校验必选角色）
    /// - properties: 需要导入的附加属性列
    /// - reference_system: 参考系 WKT（原样透传）
    /// - store: 持久化会话工厂
    /// - run_lock: 该导入类型的运行锁
    /// - observer: 进度与终态通知接收者
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        record: ImportRecord,
        mapping: SelectionMapping,
        properties: Vec<PropertyColumnSpec>,
        reference_system: String,
        store: Arc<dyn GeoStore>,
        run_lock: Arc<Mutex<()>>,
        observer: Arc<dyn ImportObserver>,
    ) -> ImportResult<Self> {
        mapping.validate()?;
        let kind = mapping.kind();

        Ok(Self {
            id: Uuid::new_v4(),
            kind,
            record,
            mapping,
            properties,
            reference_system,
            store,
            run_lock,
            control: Arc::new(JobControl::new()),
            observer,
            importer: importer_for(kind),
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 与调用方共享的控制块（取消 / 读取进度与终态）
    pub fn control(&self) -> Arc<JobControl> {
        Arc::clone(&self.control)
    }

    fn execute_locked(&self) -> ImportResult<(RunFlow, usize)> {
        // 运行锁只负责串行化，不保护数据；上一次运行 panic 后照常取回
        let _lock = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);

        // 每次运行都打开新会话，不复用上一次运行遗留的会话
        let mut guard = SessionGuard::new(self.store.open_session()?);

        let (flow, warnings) = {
            let progress = ProgressReporter::new(&self.control, self.observer.as_ref(), 0);
            let mut ctx = ImportContext::new(
                &self.record,
                &self.mapping,
                &self.properties,
                &self.reference_system,
                guard.session_mut()?,
                progress,
                &self.control,
            );

            // 启动前已请求取消时不处理任何行
            let flow = if self.control.is_cancel_requested() {
                RunFlow::Canceled
            } else {
                self.importer.execute(&mut ctx)?
            };
            if flow == RunFlow::Completed {
                ctx.progress.complete();
            }
            (flow, ctx.warnings())
        };

        guard.close()?;
        Ok((flow, warnings))
    }

    fn outcome_of(&self, result: ImportResult<(RunFlow, usize)>) -> ImportOutcome {
        match result {
            Ok((RunFlow::Completed, 0)) => ImportOutcome::Succeeded,
            Ok((RunFlow::Completed, warnings)) => ImportOutcome::SucceededWithWarnings(format!(
                "{} 条警告（部分行或字段被跳过），详见日志",
                warnings
            )),
            Ok((RunFlow::Canceled, _)) => ImportOutcome::Canceled(self.control.cancel_message()),
            Err(e) => {
                error!(error = %e, error_debug = ?e, "导入失败");
                ImportOutcome::Failed(e.to_string())
            }
        }
    }
}

impl ImportOrchestrator for ImportJob {
    #[instrument(skip(self), fields(job_id = %self.id, kind = %self.kind))]
    fn run(&self) -> ImportOutcome {
        if !self.control.begin() {
            warn!("导入运行已开始或已结束，忽略重复运行");
            return self
                .control
                .outcome()
                .unwrap_or_else(|| ImportOutcome::Failed("导入正在运行".to_string()));
        }

        let started = Instant::now();
        info!(rows = self.record.row_count(), properties = self.properties.len(), "开始导入");

        let result = catch_unwind(AssertUnwindSafe(|| self.execute_locked())).unwrap_or_else(|panic| {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "未知错误".to_string());
            Err(ImportError::Other(anyhow::anyhow!("导入线程异常终止: {}", message)))
        });
        let outcome = self.outcome_of(result);

        if self.control.finish(outcome.clone()) {
            self.observer.on_finished(&outcome);
        }

        info!(
            outcome = %outcome,
            progress = self.control.progress(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "导入结束"
        );
        outcome
    }

    fn cancel(&self, message: &str) {
        if self.control.cancel(message) {
            info!(job_id = %self.id, "已请求取消导入");
        }
    }

    fn progress(&self) -> u8 {
        self.control.progress()
    }

    fn outcome(&self) -> Option<ImportOutcome> {
        self.control.outcome()
    }
}
