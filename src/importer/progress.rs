// ==========================================
// 地质数据导入 - 进度与取消通道
// ==========================================
// 职责: 进度通知（0-100，单调不减）+ 唯一终态通知 + 协作式取消
// 实现: 原子取消标志 + 短临界区保护取消消息与状态
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// 取消消息为空时使用的默认消息
pub const DEFAULT_CANCEL_MESSAGE: &str = "导入已取消";

// ==========================================
// ImportOutcome - 导入终态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum ImportOutcome {
    Succeeded,
    SucceededWithWarnings(String),
    Failed(String),
    Canceled(String),
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            ImportOutcome::Succeeded | ImportOutcome::SucceededWithWarnings(_)
        )
    }

    pub fn state(&self) -> JobState {
        match self {
            ImportOutcome::Succeeded => JobState::Succeeded,
            ImportOutcome::SucceededWithWarnings(_) => JobState::SucceededWithWarnings,
            ImportOutcome::Failed(_) => JobState::Failed,
            ImportOutcome::Canceled(_) => JobState::Canceled,
        }
    }
}

impl fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportOutcome::Succeeded => write!(f, "导入成功"),
            ImportOutcome::SucceededWithWarnings(msg) => write!(f, "导入完成（有警告）: {}", msg),
            ImportOutcome::Failed(msg) => write!(f, "导入失败: {}", msg),
            ImportOutcome::Canceled(msg) => write!(f, "{}", msg),
        }
    }
}

// ==========================================
// JobState - 导入运行状态机
// ==========================================
// Idle → Running → {Succeeded, SucceededWithWarnings, Failed, Canceled}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Succeeded,
    SucceededWithWarnings,
    Failed,
    Canceled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Idle | JobState::Running)
    }
}

// ==========================================
// ImportEvent / ImportObserver - 通知
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEvent {
    Progress(u8),
    Finished(ImportOutcome),
}

/// 导入通知回调（在工作线程上调用）
pub trait ImportObserver: Send + Sync {
    fn on_progress(&self, percent: u8);

    fn on_finished(&self, outcome: &ImportOutcome);
}

/// 通过 channel 转发给调用方
impl ImportObserver for UnboundedSender<ImportEvent> {
    fn on_progress(&self, percent: u8) {
        // 接收端已关闭时忽略
        let _ = self.send(ImportEvent::Progress(percent));
    }

    fn on_finished(&self, outcome: &ImportOutcome) {
        if self.send(ImportEvent::Finished(outcome.clone())).is_err() {
            warn!(outcome = %outcome, "终态通知接收端已关闭");
        }
    }
}

/// 空实现，用于不关心通知的调用方
pub struct NoOpObserver;

impl ImportObserver for NoOpObserver {
    fn on_progress(&self, _percent: u8) {}

    fn on_finished(&self, _outcome: &ImportOutcome) {}
}

// ==========================================
// JobControl - 运行控制块（工作线程与调用方共享）
// ==========================================
#[derive(Debug)]
struct ControlInner {
    state: JobState,
    cancel_message: Option<String>,
    outcome: Option<ImportOutcome>,
}

#[derive(Debug)]
pub struct JobControl {
    cancel_requested: AtomicBool,
    progress: AtomicU8,
    inner: Mutex<ControlInner>,
}

impl Default for JobControl {
    fn default() -> Self {
        Self::new()
    }
}

impl JobControl {
    pub fn new() -> Self {
        Self {
            cancel_requested: AtomicBool::new(false),
            progress: AtomicU8::new(0),
            inner: Mutex::new(ControlInner {
                state: JobState::Idle,
                cancel_message: None,
                outcome: None,
            }),
        }
    }

    /// 请求取消
    ///
    /// - 仅保留第一次调用的消息，空消息使用默认消息
    /// - 终态之后调用无效果，返回 false
    pub fn cancel(&self, message: &str) -> bool {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.state.is_terminal() {
            return false;
        }
        if inner.cancel_message.is_none() {
            let message = if message.trim().is_empty() {
                DEFAULT_CANCEL_MESSAGE.to_string()
            } else {
                message.to_string()
            };
            inner.cancel_message = Some(message);
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn cancel_message(&self) -> String {
        self.with_inner(|inner| inner.cancel_message.clone())
            .unwrap_or_else(|| DEFAULT_CANCEL_MESSAGE.to_string())
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> JobState {
        self.with_inner(|inner| inner.state)
    }

    pub fn outcome(&self) -> Option<ImportOutcome> {
        self.with_inner(|inner| inner.outcome.clone())
    }

    /// Idle → Running；其他状态返回 false
    pub(crate) fn begin(&self) -> bool {
        self.with_inner_mut(|inner| {
            if inner.state == JobState::Idle {
                inner.state = JobState::Running;
                true
            } else {
                false
            }
        })
    }

    /// 更新进度（截断到 0-100，只增不减）
    ///
    /// # 返回
    /// - Some(percent): 进度前进，需要通知
    /// - None: 未变化
    pub(crate) fn advance_progress(&self, percent: u8) -> Option<u8> {
        let percent = percent.min(100);
        let previous = self.progress.fetch_max(percent, Ordering::SeqCst);
        (percent > previous).then_some(percent)
    }

    /// 写入终态（只生效一次）
    pub(crate) fn finish(&self, outcome: ImportOutcome) -> bool {
        self.with_inner_mut(|inner| {
            if inner.state.is_terminal() {
                return false;
            }
            inner.state = outcome.state();
            inner.outcome = Some(outcome);
            true
        })
    }

    fn with_inner<T>(&self, f: impl FnOnce(&ControlInner) -> T) -> T {
        match self.inner.lock() {
            Ok(guard) => f(&guard),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn with_inner_mut<T>(&self, f: impl FnOnce(&mut ControlInner) -> T) -> T {
        match self.inner.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

// ==========================================
// ProgressReporter - 单次运行内的进度计算
// ==========================================
// progress = 100 * processed / expected；expected 可随发现的新分组增长
pub struct ProgressReporter<'a> {
    control: &'a JobControl,
    observer: &'a dyn ImportObserver,
    processed: usize,
    expected: usize,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(control: &'a JobControl, observer: &'a dyn ImportObserver, expected: usize) -> Self {
        Self {
            control,
            observer,
            processed: 0,
            expected,
        }
    }

    pub fn grow_expected(&mut self, additional: usize) {
        self.expected += additional;
    }

    pub fn advance(&mut self, count: usize) {
        self.processed += count;
        if self.expected == 0 {
            return;
        }
        let percent = (self.processed.min(self.expected) * 100 / self.expected) as u8;
        self.emit(percent);
    }

    pub fn complete(&mut self) {
        self.emit(100);
    }

    fn emit(&self, percent: u8) {
        if let Some(p) = self.control.advance_progress(percent) {
            self.observer.on_progress(p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recorder {
        progress: StdMutex<Vec<u8>>,
    }

    impl ImportObserver for Recorder {
        fn on_progress(&self, percent: u8) {
            self.progress.lock().unwrap().push(percent);
        }

        fn on_finished(&self, _outcome: &ImportOutcome) {}
    }

    #[test]
    fn test_first_cancel_message_is_kept() {
        let control = JobControl::new();
        assert!(control.begin());
        assert!(control.cancel("user stop"));
        assert!(control.cancel("second"));
        assert!(control.is_cancel_requested());
        assert_eq!(control.cancel_message(), "user stop");
    }

    #[test]
    fn test_empty_cancel_message_uses_default() {
        let control = JobControl::new();
        control.cancel("  ");
        assert_eq!(control.cancel_message(), DEFAULT_CANCEL_MESSAGE);
    }

    #[test]
    fn test_cancel_after_termination_is_noop() {
        let control = JobControl::new();
        control.begin();
        assert!(control.finish(ImportOutcome::Succeeded));
        assert!(!control.cancel("late"));
        assert!(!control.is_cancel_requested());
        assert!(!control.finish(ImportOutcome::Failed("again".into())));
        assert_eq!(control.state(), JobState::Succeeded);
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let control = JobControl::new();
        let recorder = Recorder::default();
        let mut reporter = ProgressReporter::new(&control, &recorder, 4);

        reporter.advance(1);
        reporter.advance(1);
        // 分组增多导致比例下降时不回退
        reporter.grow_expected(4);
        reporter.advance(1);
        reporter.advance(10);
        reporter.complete();

        let seen = recorder.progress.lock().unwrap().clone();
        assert_eq!(seen, vec![25, 50, 100]);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(control.progress(), 100);
    }
}
