// ==========================================
// 地质数据导入 - 导入服务
// ==========================================
// 职责: 文件预览 / 导入准备（同步格式校验）/ 启动后台导入
// 并发: 每种导入类型一把运行锁；运行放在 tokio 阻塞线程池
// ==========================================

use crate::config::{ImportConfigReader, DEFAULT_WAIT_TIMEOUT_MS};
use crate::domain::{ImportKind, ImportRecord};
use crate::importer::column_classifier::{classify, ColumnSet};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{read_header_line, DelimitedTextParser};
use crate::importer::import_job::ImportJob;
use crate::importer::importer_trait::{FileParser, ImportOrchestrator};
use crate::importer::progress::{ImportObserver, ImportOutcome, JobControl, JobState};
use crate::importer::selection::{ImportSelection, PropertyColumnSpec};
use crate::importer::separator::{resolve_separator, Separator};
use crate::repository::GeoStore;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

// ==========================================
// FilePreview - 文件预览（不校验数值列数量）
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct FilePreview {
    pub path: PathBuf,
    pub separator: Separator,
    pub row_count: usize,
    pub columns: ColumnSet,
}

impl FilePreview {
    fn new(path: &Path, separator: Separator, record: &ImportRecord) -> Self {
        Self {
            path: path.to_path_buf(),
            separator,
            row_count: record.row_count(),
            columns: ColumnSet::from_record(record),
        }
    }
}

/// 不依赖数据库的文件预览（给定分隔符优先，否则推断）
pub fn preview_file(path: &Path, separator: Option<Separator>) -> ImportResult<FilePreview> {
    let header = read_header_line(path)?;
    let separator = resolve_separator(&header, separator);
    let record = DelimitedTextParser.parse(path, separator)?;
    Ok(FilePreview::new(path, separator, &record))
}

// ==========================================
// PreparedImport - 通过格式校验、等待选择角色的导入
// ==========================================
#[derive(Debug, Clone)]
pub struct PreparedImport {
    pub path: PathBuf,
    pub separator: Separator,
    pub record: ImportRecord,
    pub selection: ImportSelection,
}

// ==========================================
// ImportService
// ==========================================
pub struct ImportService {
    store: Arc<dyn GeoStore>,
    parser: Box<dyn FileParser>,
    run_locks: HashMap<ImportKind, Arc<Mutex<()>>>,
    default_separator: Option<Separator>,
    default_reference_system: String,
    wait_timeout: Duration,
}

impl ImportService {
    pub fn new(store: Arc<dyn GeoStore>) -> Self {
        Self {
            store,
            parser: Box::new(DelimitedTextParser),
            run_locks: ImportKind::ALL
                .iter()
                .map(|&k| (k, Arc::new(Mutex::new(()))))
                .collect(),
            default_separator: None,
            default_reference_system: String::new(),
            wait_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS),
        }
    }

    /// 按配置创建（预设分隔符、默认参考系、等待超时）
    pub fn with_config<C: ImportConfigReader>(store: Arc<dyn GeoStore>, config: &C) -> ImportResult<Self> {
        let mut service = Self::new(store);
        service.default_separator = config.get_separator()?;
        service.default_reference_system = config.get_reference_system()?;
        service.wait_timeout = Duration::from_millis(config.get_wait_timeout_ms()?);
        Ok(service)
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// 读取文件并确定分隔符（调用方给定的分隔符优先，其次配置，最后推断）
    fn load(&self, path: &Path, separator: Option<Separator>) -> ImportResult<(Separator, ImportRecord)> {
        let header = read_header_line(path)?;
        let separator = resolve_separator(&header, separator.or(self.default_separator));
        let record = self.parser.parse(path, separator)?;
        Ok((separator, record))
    }

    /// 预览文件的列结构
    pub fn preview(&self, path: &Path, separator: Option<Separator>) -> ImportResult<FilePreview> {
        let (separator, record) = self.load(path, separator)?;
        Ok(FilePreview::new(path, separator, &record))
    }

    /// 准备导入：解析文件、分类列、按默认值预填角色
    ///
    /// 格式错误（表头不足、数值列不足）在此同步返回，不会启动任何工作线程
    pub fn prepare(&self, kind: ImportKind, path: &Path, separator: Option<Separator>) -> ImportResult<PreparedImport> {
        let (separator, record) = self.load(path, separator)?;
        let columns = classify(&record)?;
        info!(
            kind = %kind,
            path = %path.display(),
            separator = %separator,
            rows = record.row_count(),
            numeric_columns = columns.numeric.len(),
            "导入文件已就绪"
        );

        Ok(PreparedImport {
            path: path.to_path_buf(),
            separator,
            selection: ImportSelection::with_defaults(kind, columns),
            record,
        })
    }

    /// 创建导入运行（不启动）
    pub fn create_job(
        &self,
        prepared: PreparedImport,
        properties: Vec<PropertyColumnSpec>,
        reference_system: Option<String>,
        observer: Arc<dyn ImportObserver>,
    ) -> ImportResult<ImportJob> {
        let kind = prepared.selection.kind();
        let run_lock = self
            .run_locks
            .get(&kind)
            .cloned()
            .ok_or_else(|| ImportError::Lock(format!("缺少运行锁: {}", kind)))?;

        ImportJob::new(
            prepared.record,
            prepared.selection.mapping().clone(),
            properties,
            reference_system.unwrap_or_else(|| self.default_reference_system.clone()),
            Arc::clone(&self.store),
            run_lock,
            observer,
        )
    }

    /// 在 tokio 阻塞线程池中启动导入（需在 tokio 运行时内调用）
    pub fn start(
        &self,
        prepared: PreparedImport,
        properties: Vec<PropertyColumnSpec>,
        reference_system: Option<String>,
        observer: Arc<dyn ImportObserver>,
    ) -> ImportResult<ImportHandle> {
        let job = self.create_job(prepared, properties, reference_system, observer)?;
        let job_id = job.id();
        let kind = job.kind();
        let control = job.control();

        info!(job_id = %job_id, kind = %kind, "启动后台导入");
        let join = tokio::task::spawn_blocking(move || job.run());

        Ok(ImportHandle {
            job_id,
            kind,
            control,
            join: Some(join),
            wait_timeout: self.wait_timeout,
        })
    }
}

// ==========================================
// ImportHandle - 调用方持有的运行句柄
// ==========================================
pub struct ImportHandle {
    job_id: Uuid,
    kind: ImportKind,
    control: Arc<JobControl>,
    join: Option<JoinHandle<ImportOutcome>>,
    wait_timeout: Duration,
}

impl ImportHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn cancel(&self, message: &str) {
        if self.control.cancel(message) {
            info!(job_id = %self.job_id, "已请求取消导入");
        }
    }

    pub fn progress(&self) -> u8 {
        self.control.progress()
    }

    pub fn state(&self) -> JobState {
        self.control.state()
    }

    pub fn outcome(&self) -> Option<ImportOutcome> {
        self.control.outcome()
    }

    /// 有界等待工作线程结束
    ///
    /// # 返回
    /// - Ok(Some(outcome)): 已结束
    /// - Ok(None): 超时仍未结束（句柄仍可再次等待）
    pub async fn wait(&mut self, timeout: Option<Duration>) -> ImportResult<Option<ImportOutcome>> {
        let Some(join) = self.join.as_mut() else {
            return Ok(self.control.outcome());
        };

        let timeout = timeout.unwrap_or(self.wait_timeout);
        match tokio::time::timeout(timeout, join).await {
            Ok(joined) => {
                self.join = None;
                let outcome = joined
                    .map_err(|e| ImportError::Other(anyhow::anyhow!("导入线程异常: {}", e)))?;
                Ok(Some(outcome))
            }
            Err(_) => {
                warn!(job_id = %self.job_id, timeout_ms = timeout.as_millis() as u64, "等待导入结束超时");
                Ok(None)
            }
        }
    }

    /// 等待直到结束（无超时）
    pub async fn join(mut self) -> ImportResult<ImportOutcome> {
        match self.join.take() {
            Some(join) => join
                .await
                .map_err(|e| ImportError::Other(anyhow::anyhow!("导入线程异常: {}", e))),
            None => self
                .control
                .outcome()
                .ok_or_else(|| ImportError::Other(anyhow::anyhow!("导入尚未结束"))),
        }
    }
}
