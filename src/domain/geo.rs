// ==========================================
// 地质数据导入 - 地质对象实体
// ==========================================
// 职责: 定义导入写入的地质对象（点/线/井/分层/测井/属性）
// 说明: 实体只承载数据，持久化由 repository 层负责
// ==========================================

use crate::domain::types::PropertyType;
use serde::{Deserialize, Serialize};

/// 年代缺省哨兵值
pub const UNKNOWN_AGE: f64 = -1.0;

/// 深度缺省哨兵值
pub const UNKNOWN_DEPTH: f64 = -1.0;

// ==========================================
// Stratigraphy - 地层（层位）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stratigraphy {
    pub id: i64,
    pub name: String,
    /// 地层年代，未知为 -1
    pub age: f64,
}

// ==========================================
// Property - 附加属性
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Option<i64>,
    pub name: String,
    pub unit: String,
    pub property_type: PropertyType,
    /// 原始文本值（已按 property_type 校验）
    pub value: String,
}

// ==========================================
// GeoPoint - 地质点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: Option<i64>,
    pub easting: f64,
    pub northing: f64,
    /// 高程；has_z = false 时固定为 0
    pub altitude: f64,
    /// 是否显式给出高程（区分“海平面”与“未指定”）
    pub has_z: bool,
    /// 参考系（WKT），原样透传
    pub reference_system: String,
    pub horizon: Option<Stratigraphy>,
    pub name: String,
    pub comment: String,
    pub line_id: Option<i64>,
    pub properties: Vec<Property>,
}

impl GeoPoint {
    /// 创建新点（尚未落库）
    ///
    /// altitude 为 None 时高程存 0 且 has_z = false
    pub fn new(easting: f64, northing: f64, altitude: Option<f64>, reference_system: &str) -> Self {
        Self {
            id: None,
            easting,
            northing,
            altitude: altitude.unwrap_or(0.0),
            has_z: altitude.is_some(),
            reference_system: reference_system.to_string(),
            horizon: None,
            name: String::new(),
            comment: String::new(),
            line_id: None,
            properties: Vec::new(),
        }
    }

    /// 设置高程（None 表示未指定）
    pub fn set_altitude(&mut self, altitude: Option<f64>) {
        self.altitude = altitude.unwrap_or(0.0);
        self.has_z = altitude.is_some();
    }

    /// 坐标是否相同（用于判断折线闭合）
    pub fn same_location(&self, other: &GeoPoint) -> bool {
        self.easting == other.easting
            && self.northing == other.northing
            && self.has_z == other.has_z
            && self.altitude == other.altitude
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// 新增或就地更新同名属性
    pub fn upsert_property(&mut self, name: &str, unit: &str, property_type: PropertyType, value: &str) {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                existing.unit = unit.to_string();
                existing.property_type = property_type;
                existing.value = value.to_string();
            }
            None => self.properties.push(Property {
                id: None,
                name: name.to_string(),
                unit: unit.to_string(),
                property_type,
                value: value.to_string(),
            }),
        }
    }
}

// ==========================================
// Line - 折线
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: Option<i64>,
    pub closed: bool,
    pub horizon: Option<Stratigraphy>,
    /// 点序列（保持文件顺序）
    pub points: Vec<GeoPoint>,
    pub name: String,
    pub comment: String,
}

impl Line {
    /// 由点序列创建折线；首尾点相同时标记闭合并去掉重复的尾点
    pub fn from_points(mut points: Vec<GeoPoint>) -> Self {
        let closed = close_ring(&mut points);
        Self {
            id: None,
            closed,
            horizon: None,
            points,
            name: String::new(),
            comment: String::new(),
        }
    }
}

/// 首尾点相同（按值）且点数 > 1 时去掉尾点并返回 true
pub fn close_ring(points: &mut Vec<GeoPoint>) -> bool {
    let closed = points.len() > 1
        && match (points.first(), points.last()) {
            (Some(first), Some(last)) => first.same_location(last),
            _ => false,
        };
    if closed {
        points.pop();
    }
    closed
}

// ==========================================
// Well / WellMarker - 钻井与分层标记
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellMarker {
    pub id: Option<i64>,
    /// 标记深度，未知为 -1
    pub depth: f64,
    pub horizon: Option<Stratigraphy>,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Well {
    pub id: Option<i64>,
    pub name: String,
    pub short_name: String,
    /// 总深度，未知为 -1
    pub depth: f64,
    pub easting: f64,
    pub northing: f64,
    pub altitude: f64,
    pub has_z: bool,
    pub reference_system: String,
    /// 分层标记（保持文件顺序）
    pub markers: Vec<WellMarker>,
}

impl Well {
    /// 第一个深于总深度的标记（总深度未知时不校验）
    pub fn marker_below_total_depth(&self) -> Option<&WellMarker> {
        if self.depth < 0.0 {
            return None;
        }
        self.markers.iter().find(|m| m.depth > self.depth)
    }
}

// ==========================================
// WellLog - 测井曲线
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WellLogValue {
    pub depth: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellLog {
    pub id: Option<i64>,
    pub well_id: i64,
    pub name: String,
    pub unit: String,
    pub values: Vec<WellLogValue>,
}

impl WellLog {
    pub fn new(well_id: i64, name: &str, unit: &str) -> Self {
        Self {
            id: None,
            well_id,
            name: name.to_string(),
            unit: unit.to_string(),
            values: Vec::new(),
        }
    }

    /// 同一深度已有值则就地更新，否则追加
    pub fn upsert_value(&mut self, depth: f64, value: f64) {
        match self.values.iter_mut().find(|v| v.depth == depth) {
            Some(existing) => existing.value = value,
            None => self.values.push(WellLogValue { depth, value }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(e: f64, n: f64) -> GeoPoint {
        GeoPoint::new(e, n, None, "")
    }

    #[test]
    fn test_line_closure_drops_duplicate_tail() {
        let line = Line::from_points(vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0), pt(0.0, 0.0)]);
        assert!(line.closed);
        assert_eq!(line.points.len(), 3);
    }

    #[test]
    fn test_single_point_line_is_open() {
        let line = Line::from_points(vec![pt(0.0, 0.0)]);
        assert!(!line.closed);
        assert_eq!(line.points.len(), 1);
    }

    #[test]
    fn test_altitude_flag() {
        let sea_level = GeoPoint::new(1.0, 2.0, Some(0.0), "");
        let unspecified = GeoPoint::new(1.0, 2.0, None, "");
        assert_eq!(sea_level.altitude, unspecified.altitude);
        assert!(sea_level.has_z);
        assert!(!unspecified.has_z);
        assert!(!sea_level.same_location(&unspecified));
    }

    #[test]
    fn test_log_value_upsert() {
        let mut log = WellLog::new(1, "GR", "API");
        log.upsert_value(10.0, 1.0);
        log.upsert_value(10.0, 2.0);
        log.upsert_value(11.0, 3.0);
        assert_eq!(log.values.len(), 2);
        assert_eq!(log.values[0].value, 2.0);
    }
}
