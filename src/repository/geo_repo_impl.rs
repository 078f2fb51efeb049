// ==========================================
// 地质数据导入 - 地质对象 Repository 实现
// ==========================================
// 职责: 实现 GeoStore / GeoSession（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 说明: 子集合整体替换（折线点、钻井标记）在单个事务内完成
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::{
    GeoPoint, Line, Property, PropertyType, Stratigraphy, Well, WellLog, WellLogValue, WellMarker,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::geo_repo::{GeoSession, GeoStore};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

const POINT_COLUMNS: &str = "id, easting, northing, altitude, has_z, reference_system, \
                             horizon_id, name, comment, line_id";

// ==========================================
// SqliteGeoStore
// ==========================================
pub struct SqliteGeoStore {
    db_path: String,
}

impl SqliteGeoStore {
    /// 创建新的 Store 实例并确保 schema 存在
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn)?;

        Ok(Self {
            db_path: db_path.to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }
}

impl GeoStore for SqliteGeoStore {
    fn open_session(&self) -> RepositoryResult<Box<dyn GeoSession>> {
        let conn = open_sqlite_connection(&self.db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        debug!(db_path = %self.db_path, "打开数据库会话");
        Ok(Box::new(SqliteGeoSession { conn: Some(conn) }))
    }
}

// ==========================================
// SqliteGeoSession
// ==========================================
pub struct SqliteGeoSession {
    conn: Option<Connection>,
}

impl SqliteGeoSession {
    fn conn(&mut self) -> RepositoryResult<&mut Connection> {
        self.conn.as_mut().ok_or(RepositoryError::SessionClosed)
    }
}

impl GeoSession for SqliteGeoSession {
    fn init_stratigraphy(&mut self, name: &str, age: f64) -> RepositoryResult<Option<Stratigraphy>> {
        if name.is_empty() {
            return Ok(None);
        }

        let conn = self.conn()?;
        let existing: Option<(i64, f64)> = conn
            .query_row(
                "SELECT id, age FROM stratigraphy WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let strat = match existing {
            Some((id, old_age)) => {
                // 仅在给出有效年代时覆盖
                let age = if age >= 0.0 && age != old_age {
                    conn.execute(
                        "UPDATE stratigraphy SET age = ?1 WHERE id = ?2",
                        params![age, id],
                    )?;
                    age
                } else {
                    old_age
                };
                Stratigraphy {
                    id,
                    name: name.to_string(),
                    age,
                }
            }
            None => {
                conn.execute(
                    "INSERT INTO stratigraphy (name, age) VALUES (?1, ?2)",
                    params![name, age],
                )?;
                Stratigraphy {
                    id: conn.last_insert_rowid(),
                    name: name.to_string(),
                    age,
                }
            }
        };

        Ok(Some(strat))
    }

    fn load_point(&mut self, id: i64) -> RepositoryResult<Option<GeoPoint>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM geo_point WHERE id = ?1", POINT_COLUMNS);
        let mut points = query_points(conn, &sql, id)?;
        Ok(points.pop())
    }

    fn save_point(&mut self, point: &mut GeoPoint) -> RepositoryResult<i64> {
        let conn = self.conn()?;
        let tx = conn.transaction()?;
        let id = write_point_tx(&tx, point, None)?;
        tx.commit()?;
        Ok(id)
    }

    fn load_line(&mut self, id: i64) -> RepositoryResult<Option<Line>> {
        let conn = self.conn()?;
        let row: Option<(i64, bool, Option<i64>, String, String)> = conn
            .query_row(
                "SELECT id, closed, horizon_id, name, comment FROM line WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        let Some((id, closed, horizon_id, name, comment)) = row else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM geo_point WHERE line_id = ?1 ORDER BY line_pos",
            POINT_COLUMNS
        );
        let points = query_points(conn, &sql, id)?;

        Ok(Some(Line {
            id: Some(id),
            closed,
            horizon: load_stratigraphy(conn, horizon_id)?,
            points,
            name,
            comment,
        }))
    }

    fn save_line(&mut self, line: &mut Line) -> RepositoryResult<i64> {
        let conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let horizon_id = line.horizon.as_ref().map(|h| h.id);

        let line_id = match line.id {
            Some(id) => {
                let affected = tx.execute(
                    "UPDATE line SET closed = ?1, horizon_id = ?2, name = ?3, comment = ?4, updated_at = ?5
                     WHERE id = ?6",
                    params![line.closed, horizon_id, line.name, line.comment, now, id],
                )?;
                if affected == 0 {
                    return Err(RepositoryError::NotFound {
                        entity: "Line".to_string(),
                        id: id.to_string(),
                    });
                }
                // 旧点整体删除（属性随外键级联删除）
                tx.execute("DELETE FROM geo_point WHERE line_id = ?1", params![id])?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO line (closed, horizon_id, name, comment, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![line.closed, horizon_id, line.name, line.comment, now],
                )?;
                tx.last_insert_rowid()
            }
        };

        for (pos, point) in line.points.iter_mut().enumerate() {
            // 新点序列总是插入新行
            point.id = None;
            write_point_tx(&tx, point, Some((line_id, pos)))?;
        }

        tx.commit()?;
        line.id = Some(line_id);
        Ok(line_id)
    }

    fn load_well_by_name(&mut self, name: &str) -> RepositoryResult<Option<Well>> {
        let conn = self.conn()?;
        let well = conn
            .query_row(
                "SELECT id, name, short_name, depth, easting, northing, altitude, has_z, reference_system
                 FROM well WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Well {
                        id: Some(row.get(0)?),
                        name: row.get(1)?,
                        short_name: row.get(2)?,
                        depth: row.get(3)?,
                        easting: row.get(4)?,
                        northing: row.get(5)?,
                        altitude: row.get(6)?,
                        has_z: row.get(7)?,
                        reference_system: row.get(8)?,
                        markers: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut well) = well else {
            return Ok(None);
        };

        let rows: Vec<(i64, f64, Option<i64>, String)> = {
            let mut stmt = conn.prepare(
                "SELECT id, depth, horizon_id, comment FROM well_marker
                 WHERE well_id = ?1 ORDER BY marker_pos",
            )?;
            let mapped = stmt.query_map(params![well.id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?;
            mapped.collect::<Result<_, _>>()?
        };

        for (id, depth, horizon_id, comment) in rows {
            well.markers.push(WellMarker {
                id: Some(id),
                depth,
                horizon: load_stratigraphy(conn, horizon_id)?,
                comment,
            });
        }

        Ok(Some(well))
    }

    fn save_well(&mut self, well: &mut Well) -> RepositoryResult<i64> {
        let conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        let well_id = match well.id {
            Some(id) => {
                tx.execute(
                    "UPDATE well SET name = ?1, short_name = ?2, depth = ?3, easting = ?4, northing = ?5,
                     altitude = ?6, has_z = ?7, reference_system = ?8, updated_at = ?9 WHERE id = ?10",
                    params![
                        well.name,
                        well.short_name,
                        well.depth,
                        well.easting,
                        well.northing,
                        well.altitude,
                        well.has_z,
                        well.reference_system,
                        now,
                        id
                    ],
                )?;
                // 整体替换：旧标记全部删除
                tx.execute("DELETE FROM well_marker WHERE well_id = ?1", params![id])?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO well (name, short_name, depth, easting, northing, altitude, has_z,
                     reference_system, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        well.name,
                        well.short_name,
                        well.depth,
                        well.easting,
                        well.northing,
                        well.altitude,
                        well.has_z,
                        well.reference_system,
                        now
                    ],
                )?;
                tx.last_insert_rowid()
            }
        };

        {
            let mut stmt = tx.prepare(
                "INSERT INTO well_marker (well_id, marker_pos, depth, horizon_id, comment)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (pos, marker) in well.markers.iter_mut().enumerate() {
                stmt.execute(params![
                    well_id,
                    pos as i64,
                    marker.depth,
                    marker.horizon.as_ref().map(|h| h.id),
                    marker.comment
                ])?;
                marker.id = Some(tx.last_insert_rowid());
            }
        }

        tx.commit()?;
        well.id = Some(well_id);
        Ok(well_id)
    }

    fn load_well_logs(&mut self, well_id: i64) -> RepositoryResult<Vec<WellLog>> {
        let conn = self.conn()?;
        let mut logs: Vec<WellLog> = {
            let mut stmt =
                conn.prepare("SELECT id, name, unit FROM well_log WHERE well_id = ?1 ORDER BY id")?;
            let mapped = stmt.query_map(params![well_id], |row| {
                Ok(WellLog {
                    id: Some(row.get(0)?),
                    well_id,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                    values: Vec::new(),
                })
            })?;
            mapped.collect::<Result<_, _>>()?
        };

        let mut stmt =
            conn.prepare("SELECT depth, value FROM well_log_value WHERE log_id = ?1 ORDER BY id")?;
        for log in &mut logs {
            let mapped = stmt.query_map(params![log.id], |row| {
                Ok(WellLogValue {
                    depth: row.get(0)?,
                    value: row.get(1)?,
                })
            })?;
            log.values = mapped.collect::<Result<_, _>>()?;
        }

        Ok(logs)
    }

    fn save_well_log(&mut self, log: &mut WellLog) -> RepositoryResult<i64> {
        let conn = self.conn()?;
        let tx = conn.transaction()?;

        let log_id = match log.id {
            Some(id) => {
                tx.execute(
                    "UPDATE well_log SET name = ?1, unit = ?2 WHERE id = ?3",
                    params![log.name, log.unit, id],
                )?;
                id
            }
            None => {
                tx.execute(
                    "INSERT INTO well_log (well_id, name, unit) VALUES (?1, ?2, ?3)",
                    params![log.well_id, log.name, log.unit],
                )?;
                tx.last_insert_rowid()
            }
        };

        {
            let mut stmt = tx.prepare(
                "INSERT INTO well_log_value (log_id, depth, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(log_id, depth) DO UPDATE SET value = excluded.value",
            )?;
            for v in &log.values {
                stmt.execute(params![log_id, v.depth, v.value])?;
            }
        }

        tx.commit()?;
        log.id = Some(log_id);
        Ok(log_id)
    }

    fn close(&mut self) -> RepositoryResult<()> {
        match self.conn.take() {
            Some(conn) => {
                debug!("关闭数据库会话");
                conn.close()
                    .map_err(|(_, e)| RepositoryError::DatabaseConnectionError(e.to_string()))
            }
            None => Ok(()),
        }
    }
}

// ==========================================
// 事务内辅助函数
// ==========================================

/// 在事务中写入点及其属性
///
/// - point.id 为 Some 时更新，目标不存在返回 NotFound
/// - line 为 Some((line_id, pos)) 时作为折线点写入
fn write_point_tx(
    tx: &Transaction,
    point: &mut GeoPoint,
    line: Option<(i64, usize)>,
) -> RepositoryResult<i64> {
    let now = Utc::now().to_rfc3339();
    let horizon_id = point.horizon.as_ref().map(|h| h.id);
    let (line_id, line_pos) = match line {
        Some((id, pos)) => (Some(id), Some(pos as i64)),
        None => (point.line_id, None),
    };

    let id = match point.id {
        Some(id) => {
            let affected = tx.execute(
                "UPDATE geo_point SET easting = ?1, northing = ?2, altitude = ?3, has_z = ?4,
                 reference_system = ?5, horizon_id = ?6, name = ?7, comment = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    point.easting,
                    point.northing,
                    point.altitude,
                    point.has_z,
                    point.reference_system,
                    horizon_id,
                    point.name,
                    point.comment,
                    now,
                    id
                ],
            )?;
            if affected == 0 {
                return Err(RepositoryError::NotFound {
                    entity: "GeoPoint".to_string(),
                    id: id.to_string(),
                });
            }
            id
        }
        None => {
            tx.execute(
                "INSERT INTO geo_point (easting, northing, altitude, has_z, reference_system,
                 horizon_id, name, comment, line_id, line_pos, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    point.easting,
                    point.northing,
                    point.altitude,
                    point.has_z,
                    point.reference_system,
                    horizon_id,
                    point.name,
                    point.comment,
                    line_id,
                    line_pos,
                    now
                ],
            )?;
            tx.last_insert_rowid()
        }
    };

    point.id = Some(id);
    point.line_id = line_id;

    let mut stmt = tx.prepare(
        "INSERT INTO point_property (point_id, name, unit, property_type, value)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(point_id, name) DO UPDATE SET
            unit = excluded.unit, property_type = excluded.property_type, value = excluded.value
         RETURNING id",
    )?;
    for prop in &mut point.properties {
        let prop_id: i64 = stmt.query_row(
            params![id, prop.name, prop.unit, prop.property_type.as_str(), prop.value],
            |row| row.get(0),
        )?;
        prop.id = Some(prop_id);
    }

    Ok(id)
}

/// 按 SQL 查询点列表（SQL 需选择 POINT_COLUMNS，且只有一个 i64 参数）
fn query_points(conn: &Connection, sql: &str, param: i64) -> RepositoryResult<Vec<GeoPoint>> {
    let rows: Vec<(GeoPoint, Option<i64>)> = {
        let mut stmt = conn.prepare(sql)?;
        let mapped = stmt.query_map(params![param], |row| {
            Ok((
                GeoPoint {
                    id: Some(row.get(0)?),
                    easting: row.get(1)?,
                    northing: row.get(2)?,
                    altitude: row.get(3)?,
                    has_z: row.get(4)?,
                    reference_system: row.get(5)?,
                    horizon: None,
                    name: row.get(7)?,
                    comment: row.get(8)?,
                    line_id: row.get(9)?,
                    properties: Vec::new(),
                },
                row.get::<_, Option<i64>>(6)?,
            ))
        })?;
        mapped.collect::<Result<_, _>>()?
    };

    let mut prop_stmt = conn.prepare(
        "SELECT id, name, unit, property_type, value FROM point_property
         WHERE point_id = ?1 ORDER BY id",
    )?;

    let mut points = Vec::with_capacity(rows.len());
    for (mut point, horizon_id) in rows {
        point.horizon = load_stratigraphy(conn, horizon_id)?;
        let mapped = prop_stmt.query_map(params![point.id], |row| {
            Ok(Property {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                unit: row.get(2)?,
                property_type: PropertyType::from_db_str(&row.get::<_, String>(3)?),
                value: row.get(4)?,
            })
        })?;
        point.properties = mapped.collect::<Result<_, _>>()?;
        points.push(point);
    }

    Ok(points)
}

fn load_stratigraphy(conn: &Connection, id: Option<i64>) -> RepositoryResult<Option<Stratigraphy>> {
    let Some(id) = id else {
        return Ok(None);
    };
    let strat = conn
        .query_row(
            "SELECT id, name, age FROM stratigraphy WHERE id = ?1",
            params![id],
            |row| {
                Ok(Stratigraphy {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    age: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(strat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn setup_store() -> (NamedTempFile, SqliteGeoStore) {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteGeoStore::new(temp_file.path().to_str().unwrap()).unwrap();
        (temp_file, store)
    }

    #[test]
    fn test_point_roundtrip_with_properties() {
        let (_tmp, store) = setup_store();
        let mut session = store.open_session().unwrap();

        let mut point = GeoPoint::new(10.0, 20.0, Some(5.0), "EPSG:31468");
        point.horizon = session.init_stratigraphy("mu", 243.0).unwrap();
        point.upsert_property("porosity", "%", PropertyType::Float, "12.5");
        let id = session.save_point(&mut point).unwrap();

        let loaded = session.load_point(id).unwrap().unwrap();
        assert_eq!(loaded.easting, 10.0);
        assert!(loaded.has_z);
        assert_eq!(loaded.horizon.as_ref().map(|h| h.name.as_str()), Some("mu"));
        assert_eq!(loaded.property("porosity").map(|p| p.value.as_str()), Some("12.5"));

        session.close().unwrap();
    }

    #[test]
    fn test_stratigraphy_age_not_overwritten_by_unknown() {
        let (_tmp, store) = setup_store();
        let mut session = store.open_session().unwrap();

        let first = session.init_stratigraphy("so", 250.0).unwrap().unwrap();
        let again = session.init_stratigraphy("so", -1.0).unwrap().unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.age, 250.0);
        assert!(session.init_stratigraphy("", 1.0).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_point_is_not_found() {
        let (_tmp, store) = setup_store();
        let mut session = store.open_session().unwrap();

        let mut point = GeoPoint::new(1.0, 1.0, None, "");
        point.id = Some(99);
        let result = session.save_point(&mut point);
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let (_tmp, store) = setup_store();
        let mut session = store.open_session().unwrap();
        session.close().unwrap();
        session.close().unwrap();
        assert!(matches!(session.load_point(1), Err(RepositoryError::SessionClosed)));
    }
}
