// ==========================================
// 地质数据导入 - SQLite 连接初始化与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少多个导入会话并发写入时的偶发 busy 错误
// - 提供地质对象表结构的幂等建库
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化地质对象 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS stratigraphy (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            age REAL NOT NULL DEFAULT -1
        );

        CREATE TABLE IF NOT EXISTS line (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            closed INTEGER NOT NULL DEFAULT 0,
            horizon_id INTEGER REFERENCES stratigraphy(id),
            name TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS geo_point (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            easting REAL NOT NULL,
            northing REAL NOT NULL,
            altitude REAL NOT NULL DEFAULT 0,
            has_z INTEGER NOT NULL DEFAULT 0,
            reference_system TEXT NOT NULL DEFAULT '',
            horizon_id INTEGER REFERENCES stratigraphy(id),
            name TEXT NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            line_id INTEGER REFERENCES line(id) ON DELETE CASCADE,
            line_pos INTEGER,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_geo_point_line
          ON geo_point(line_id, line_pos);

        CREATE TABLE IF NOT EXISTS point_property (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            point_id INTEGER NOT NULL REFERENCES geo_point(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT '',
            property_type TEXT NOT NULL,
            value TEXT NOT NULL DEFAULT '',
            UNIQUE(point_id, name)
        );

        CREATE TABLE IF NOT EXISTS well (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            short_name TEXT NOT NULL DEFAULT '',
            depth REAL NOT NULL DEFAULT -1,
            easting REAL NOT NULL,
            northing REAL NOT NULL,
            altitude REAL NOT NULL DEFAULT 0,
            has_z INTEGER NOT NULL DEFAULT 0,
            reference_system TEXT NOT NULL DEFAULT '',
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS well_marker (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            well_id INTEGER NOT NULL REFERENCES well(id) ON DELETE CASCADE,
            marker_pos INTEGER NOT NULL,
            depth REAL NOT NULL,
            horizon_id INTEGER REFERENCES stratigraphy(id),
            comment TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS well_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            well_id INTEGER NOT NULL REFERENCES well(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            unit TEXT NOT NULL DEFAULT '',
            UNIQUE(well_id, name)
        );

        CREATE TABLE IF NOT EXISTS well_log_value (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            log_id INTEGER NOT NULL REFERENCES well_log(id) ON DELETE CASCADE,
            depth REAL NOT NULL,
            value REAL NOT NULL,
            UNIQUE(log_id, depth)
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
