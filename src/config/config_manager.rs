// ==========================================
// 地质数据导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{ImportConfigReader, DEFAULT_WAIT_TIMEOUT_MS};
use crate::db::{init_schema, open_sqlite_connection};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::separator::Separator;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "GEO_IMPORT_DB_PATH";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ImportResult<Self> {
        let conn = open_sqlite_connection(db_path).map_err(|e| config_error("db", e))?;
        init_schema(&conn).map_err(|e| config_error("db", e))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ImportResult<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| config_error(key, e))
    }

    /// 写入 global 配置（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ImportResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )
        .map_err(|e| config_error(key, e))?;
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ImportResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照（JSON 格式）
    pub fn get_config_snapshot(&self) -> ImportResult<String> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")
            .map_err(|e| config_error("snapshot", e))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| config_error("snapshot", e))?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row.map_err(|e| config_error("snapshot", e))?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map)).map_err(|e| config_error("snapshot", e))
    }

    /// 从配置快照恢复配置（覆盖同名 global 配置）
    ///
    /// # 返回
    /// - Ok(usize): 恢复的配置项数量
    pub fn restore_config_from_snapshot(&self, snapshot_json: &str) -> ImportResult<usize> {
        let config_map: BTreeMap<String, String> =
            serde_json::from_str(snapshot_json).map_err(|e| config_error("snapshot", e))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(|e| config_error("snapshot", e))?;

        let mut count = 0;
        for (key, value) in config_map.iter() {
            count += tx
                .execute(
                    "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
                     ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2",
                    params![key, value],
                )
                .map_err(|e| config_error(key, e))?;
        }

        tx.commit().map_err(|e| config_error("snapshot", e))?;
        Ok(count)
    }

    fn lock(&self) -> ImportResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ImportError::Lock(e.to_string()))
    }
}

fn config_error(key: &str, err: impl std::fmt::Display) -> ImportError {
    ImportError::Config {
        key: key.to_string(),
        message: err.to_string(),
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
impl ImportConfigReader for ConfigManager {
    fn get_separator(&self) -> ImportResult<Option<Separator>> {
        match self.get_global_config_value(config_keys::SEPARATOR)? {
            None => Ok(None),
            Some(value) if value.is_empty() => Ok(None),
            Some(value) => match value.parse::<Separator>() {
                Ok(sep) => Ok(Some(sep)),
                Err(_) => {
                    warn!(config_key = config_keys::SEPARATOR, raw_value = %value, "分隔符配置无效，改为自动推断");
                    Ok(None)
                }
            },
        }
    }

    fn get_wait_timeout_ms(&self) -> ImportResult<u64> {
        let default = DEFAULT_WAIT_TIMEOUT_MS.to_string();
        let value = self.get_config_or_default(config_keys::WAIT_TIMEOUT_MS, &default)?;
        Ok(value.trim().parse::<u64>().unwrap_or(DEFAULT_WAIT_TIMEOUT_MS))
    }

    fn get_reference_system(&self) -> ImportResult<String> {
        self.get_config_or_default(config_keys::REFERENCE_SYSTEM, "")
    }

    fn get_working_path(&self) -> ImportResult<Option<PathBuf>> {
        Ok(self
            .get_global_config_value(config_keys::WORKING_PATH)?
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from))
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 GEO_IMPORT_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./geological_data.db");

    if let Some(data_dir) = dirs::data_dir() {
        let app_dir = data_dir.join("geological-data-import");
        if std::fs::create_dir_all(&app_dir).is_ok() {
            path = app_dir.join("geological_data.db");
        }
    }

    path.to_string_lossy().to_string()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 导入
    pub const SEPARATOR: &str = "import.separator";
    pub const WAIT_TIMEOUT_MS: &str = "import.wait_timeout_ms";
    pub const REFERENCE_SYSTEM: &str = "import.reference_system";

    // 通用
    pub const WORKING_PATH: &str = "general.working_path";
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn setup() -> (NamedTempFile, ConfigManager) {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, manager)
    }

    #[test]
    fn test_defaults_when_unset() {
        let (_tmp, manager) = setup();
        assert_eq!(manager.get_separator().unwrap(), None);
        assert_eq!(manager.get_wait_timeout_ms().unwrap(), DEFAULT_WAIT_TIMEOUT_MS);
        assert_eq!(manager.get_reference_system().unwrap(), "");
        assert_eq!(manager.get_working_path().unwrap(), None);
    }

    #[test]
    fn test_set_and_read_back() {
        let (_tmp, manager) = setup();
        manager.set_global_config_value(config_keys::SEPARATOR, "<tabulator>").unwrap();
        manager.set_global_config_value(config_keys::WAIT_TIMEOUT_MS, "500").unwrap();
        manager.set_global_config_value(config_keys::WAIT_TIMEOUT_MS, "750").unwrap();

        assert_eq!(manager.get_separator().unwrap(), Some(Separator::TAB));
        assert_eq!(manager.get_wait_timeout_ms().unwrap(), 750);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let (_tmp, manager) = setup();
        manager.set_global_config_value(config_keys::SEPARATOR, "|").unwrap();
        manager.set_global_config_value(config_keys::WAIT_TIMEOUT_MS, "soon").unwrap();
        assert_eq!(manager.get_separator().unwrap(), None);
        assert_eq!(manager.get_wait_timeout_ms().unwrap(), DEFAULT_WAIT_TIMEOUT_MS);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let (_tmp, manager) = setup();
        manager.set_global_config_value(config_keys::REFERENCE_SYSTEM, "EPSG:4326").unwrap();
        let snapshot = manager.get_config_snapshot().unwrap();

        let (_tmp2, other) = setup();
        assert_eq!(other.restore_config_from_snapshot(&snapshot).unwrap(), 1);
        assert_eq!(other.get_reference_system().unwrap(), "EPSG:4326");
    }

    #[test]
    fn test_poisoned_connection_reports_lock_error_once() {
        let (_tmp, manager) = setup();
        let conn = Arc::clone(&manager.conn);
        let _ = std::thread::spawn(move || {
            let _guard = conn.lock().unwrap();
            panic!("持锁线程崩溃");
        })
        .join();

        let err = manager.get_global_config_value("any").unwrap_err();
        assert!(matches!(err, ImportError::Lock(_)));
        assert_eq!(err.to_string().matches("锁获取失败").count(), 1, "{}", err);
    }
}
