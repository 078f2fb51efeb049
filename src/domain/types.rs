// ==========================================
// 地质数据导入 - 领域枚举类型
// ==========================================
// 职责: 导入类型 / 属性类型 的统一定义与字符串转换
// 红线: 字符串形式即数据库存储形式，不得随意修改
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// ImportKind - 导入类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportKind {
    /// 离散点
    Point,
    /// 折线（点序列）
    Line,
    /// 钻井（含分层标记）
    Well,
    /// 点属性
    Property,
    /// 测井曲线
    WellLog,
}

impl ImportKind {
    /// 全部导入类型（固定顺序）
    pub const ALL: [ImportKind; 5] = [
        ImportKind::Point,
        ImportKind::Line,
        ImportKind::Well,
        ImportKind::Property,
        ImportKind::WellLog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportKind::Point => "point",
            ImportKind::Line => "line",
            ImportKind::Well => "well",
            ImportKind::Property => "property",
            ImportKind::WellLog => "well_log",
        }
    }
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "point" | "points" => Ok(ImportKind::Point),
            "line" | "lines" => Ok(ImportKind::Line),
            "well" | "wells" => Ok(ImportKind::Well),
            "property" | "properties" => Ok(ImportKind::Property),
            "well_log" | "welllog" | "log" | "logs" => Ok(ImportKind::WellLog),
            other => Err(format!("未知的导入类型: {}", other)),
        }
    }
}

// ==========================================
// PropertyType - 属性值类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Integer,
    Float,
    String,
}

impl PropertyType {
    /// 数据库存储形式（全大写）
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Integer => "INTEGER",
            PropertyType::Float => "FLOAT",
            PropertyType::String => "STRING",
        }
    }

    /// 从数据库存储形式解析，未知值回退为 STRING
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "INTEGER" => PropertyType::Integer,
            "FLOAT" => PropertyType::Float,
            _ => PropertyType::String,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PropertyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "integer" | "int" => Ok(PropertyType::Integer),
            "float" | "double" | "real" => Ok(PropertyType::Float),
            "string" | "str" | "text" => Ok(PropertyType::String),
            other => Err(format!("未知的属性类型: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_kind_parse() {
        assert_eq!("Points".parse::<ImportKind>(), Ok(ImportKind::Point));
        assert_eq!("well_log".parse::<ImportKind>(), Ok(ImportKind::WellLog));
        assert!("raster".parse::<ImportKind>().is_err());
    }

    #[test]
    fn test_property_type_db_roundtrip() {
        for t in [PropertyType::Integer, PropertyType::Float, PropertyType::String] {
            assert_eq!(PropertyType::from_db_str(t.as_str()), t);
        }
        assert_eq!(PropertyType::from_db_str("???"), PropertyType::String);
    }
}
