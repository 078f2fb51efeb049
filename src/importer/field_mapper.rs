// ==========================================
// 地质数据导入 - 字段映射器实现
// ==========================================
// 职责: 按角色绑定从某一数据行取值 + 类型转换
// 缺省: 未绑定或空值 → None / -1 / ""（由调用方决定）
// ==========================================

use crate::domain::{ImportRecord, PropertyType};
use crate::importer::column_classifier::parse_float_literal;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::selection::{Role, SelectionMapping};

/// 表头 + 单位共两行，错误信息中的行号按文件行号（从 1 开始）给出
const HEADER_LINES: usize = 2;

/// 数据行下标 → 文件行号
pub fn file_line(row: usize) -> usize {
    row + HEADER_LINES + 1
}

pub struct FieldMapper<'a> {
    record: &'a ImportRecord,
    mapping: &'a SelectionMapping,
    row: usize,
}

impl<'a> FieldMapper<'a> {
    pub fn new(record: &'a ImportRecord, mapping: &'a SelectionMapping, row: usize) -> Self {
        Self {
            record,
            mapping,
            row,
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// 角色对应的原始值；未绑定返回 None
    pub fn raw(&self, role: Role) -> Option<&'a str> {
        let column = self.mapping.column(role)?;
        Some(self.record.value(column, self.row).unwrap_or(""))
    }

    /// 文本字段（未绑定为空串）
    pub fn text(&self, role: Role) -> String {
        self.raw(role).map(|v| v.trim().to_string()).unwrap_or_default()
    }

    /// 角色已绑定且值为空
    pub fn is_blank(&self, role: Role) -> bool {
        self.raw(role).is_some_and(|v| v.trim().is_empty())
    }

    /// 必填浮点数：未绑定、空值或格式错误均返回 ValueParse
    pub fn required_f64(&self, role: Role) -> ImportResult<f64> {
        let value = self.raw(role).unwrap_or("");
        parse_float_literal(value).ok_or_else(|| self.parse_error(role, value))
    }

    /// 可选浮点数：未绑定或空值为 None，非空但格式错误返回 ValueParse
    pub fn optional_f64(&self, role: Role) -> ImportResult<Option<f64>> {
        match self.raw(role) {
            None => Ok(None),
            Some(v) if v.trim().is_empty() => Ok(None),
            Some(v) => parse_float_literal(v)
                .map(Some)
                .ok_or_else(|| self.parse_error(role, v)),
        }
    }

    /// 浮点数，缺省为给定哨兵值（年代/深度未知为 -1）
    pub fn f64_or(&self, role: Role, default: f64) -> ImportResult<f64> {
        Ok(self.optional_f64(role)?.unwrap_or(default))
    }

    /// 记录 id：非负整数才有效，其余（含未绑定）为 None
    pub fn optional_id(&self, role: Role) -> Option<i64> {
        self.raw(role)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id >= 0)
    }

    /// 按列名读取（附加属性列）
    pub fn column_value(&self, column: &str) -> &'a str {
        self.record.value(column, self.row).unwrap_or("")
    }

    fn parse_error(&self, role: Role, value: &str) -> ImportError {
        ImportError::ValueParse {
            row: file_line(self.row),
            column: self.mapping.column(role).unwrap_or(role.as_str()).to_string(),
            value: value.to_string(),
        }
    }
}

/// 按属性类型规整属性值
///
/// # 返回
/// - Some(规整后的文本): 转换成功
/// - None: 值不符合声明的类型
pub fn convert_property_value(value: &str, property_type: PropertyType) -> Option<String> {
    let value = value.trim();
    match property_type {
        PropertyType::Integer => value.parse::<i64>().ok().map(|v| v.to_string()),
        PropertyType::Float => parse_float_literal(value).map(|v| v.to_string()),
        PropertyType::String => Some(value.to_string()),
    }
}
