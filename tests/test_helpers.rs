// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 临时数据库、临时导入文件、导入准备与通知收集
// ==========================================

#![allow(dead_code)]

use geological_data_import::importer::{
    ImportEvent, ImportObserver, ImportOrchestrator, ImportOutcome, NoOpObserver, PreparedImport,
    PropertyColumnSpec,
};
use geological_data_import::{GeoSession, GeoStore, ImportKind, ImportService, SqliteGeoStore};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> (NamedTempFile, String) {
    let temp_file = NamedTempFile::new().expect("创建临时数据库失败");
    let db_path = temp_file.path().to_str().unwrap().to_string();
    // 建库
    SqliteGeoStore::new(&db_path).expect("初始化 schema 失败");
    (temp_file, db_path)
}

/// 打开数据库对应的 store
pub fn create_test_store(db_path: &str) -> Arc<dyn GeoStore> {
    Arc::new(SqliteGeoStore::new(db_path).expect("打开 store 失败"))
}

/// 打开一个独立会话，用于预置数据或断言落库结果
pub fn open_session(db_path: &str) -> Box<dyn GeoSession> {
    create_test_store(db_path)
        .open_session()
        .expect("打开会话失败")
}

/// 在临时目录中写入导入文件（多行按 \n 连接）
pub fn write_import_file(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, lines.join("\n")).expect("写入导入文件失败");
    path
}

/// 准备导入并按给定绑定覆盖默认角色
pub fn prepare_with(
    service: &ImportService,
    kind: ImportKind,
    path: &PathBuf,
    bindings: &[(&str, &str)],
) -> PreparedImport {
    let mut prepared = service.prepare(kind, path, None).expect("准备导入失败");
    for (role, column) in bindings {
        prepared.selection.set(role, column).expect("绑定角色失败");
    }
    prepared
}

/// 同步执行一次导入（在当前线程运行）
pub fn run_import(
    service: &ImportService,
    prepared: PreparedImport,
    properties: Vec<PropertyColumnSpec>,
) -> ImportOutcome {
    run_import_with_reference(service, prepared, properties, "EPSG:31467")
}

/// 同步执行一次导入，并指定参考系
pub fn run_import_with_reference(
    service: &ImportService,
    prepared: PreparedImport,
    properties: Vec<PropertyColumnSpec>,
    reference: &str,
) -> ImportOutcome {
    let job = service
        .create_job(prepared, properties, Some(reference.to_string()), Arc::new(NoOpObserver))
        .expect("创建导入失败");
    job.run()
}

// ==========================================
// RecordingObserver - 收集通知
// ==========================================
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ImportEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ImportEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<ImportOutcome> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ImportEvent::Finished(outcome) => Some(outcome),
                ImportEvent::Progress(_) => None,
            })
            .collect()
    }

    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ImportEvent::Progress(p) => Some(p),
                ImportEvent::Finished(_) => None,
            })
            .collect()
    }
}

impl ImportObserver for RecordingObserver {
    fn on_progress(&self, percent: u8) {
        self.events.lock().unwrap().push(ImportEvent::Progress(percent));
    }

    fn on_finished(&self, outcome: &ImportOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(ImportEvent::Finished(outcome.clone()));
    }
}
