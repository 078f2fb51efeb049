// ==========================================
// 地质数据导入 - 列分类器
// ==========================================
// 职责: 将表头列划分为 可选列 / 数值列
// 规则: 仅按第 0 行数据判断是否为数值（不做整列校验）
// ==========================================

use crate::domain::ImportRecord;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};

/// 数值列下限（东坐标/北坐标/高程）
pub const MIN_NUMERIC_COLUMNS: usize = 3;

/// 列名与单位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub unit: String,
}

/// 列分类结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    /// 全部列（表头顺序）
    pub selectable: Vec<ColumnInfo>,
    /// 第 0 行可解析为浮点数的列（表头顺序）
    pub numeric: Vec<ColumnInfo>,
}

impl ColumnSet {
    /// 分类但不校验数值列数量
    pub fn from_record(record: &ImportRecord) -> Self {
        let mut set = ColumnSet::default();
        for column in record.columns() {
            let info = ColumnInfo {
                name: column.name.clone(),
                unit: column.unit.clone(),
            };
            let numeric = column
                .values
                .first()
                .is_some_and(|v| parse_float_literal(v).is_some());
            if numeric {
                set.numeric.push(info.clone());
            }
            set.selectable.push(info);
        }
        set
    }

    pub fn is_selectable(&self, name: &str) -> bool {
        self.selectable.iter().any(|c| c.name == name)
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|c| c.name == name)
    }

    pub fn selectable_names(&self) -> Vec<&str> {
        self.selectable.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn numeric_names(&self) -> Vec<&str> {
        self.numeric.iter().map(|c| c.name.as_str()).collect()
    }
}

/// 列分类
///
/// # 错误
/// - InsufficientColumns: 数值列少于 3 个
pub fn classify(record: &ImportRecord) -> ImportResult<ColumnSet> {
    let set = ColumnSet::from_record(record);
    if set.numeric.len() < MIN_NUMERIC_COLUMNS {
        return Err(ImportError::InsufficientColumns {
            required: MIN_NUMERIC_COLUMNS,
            found: set.numeric.len(),
        });
    }
    Ok(set)
}

/// 按浮点字面量语法解析
///
/// 接受: 首尾空白、正负号、小数点、指数、inf/infinity/nan（不区分大小写），
/// 以及数字之间的单个下划线（如 `1_000.5`）
pub fn parse_float_literal(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed.contains('_') {
        return trimmed.parse::<f64>().ok();
    }

    // 下划线必须两侧都是数字
    let bytes = trimmed.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'_' {
            let prev_digit = i > 0 && bytes[i - 1].is_ascii_digit();
            let next_digit = bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit());
            if !prev_digit || !next_digit {
                return None;
            }
        }
    }

    trimmed.replace('_', "").parse::<f64>().ok()
}
