// ==========================================
// 地质数据导入 - 导入文件的列式表示
// ==========================================
// 结构: 列名 → { 单位, 值序列 }
// 不变量: 所有列的值序列长度相同（= 数据行数）
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 单列数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportColumn {
    pub name: String,
    pub unit: String,
    pub values: Vec<String>,
}

/// 导入文件解析结果（列顺序 = 表头顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRecord {
    columns: Vec<ImportColumn>,
    // 列名 → columns 下标
    index: HashMap<String, usize>,
    // 表头位置 → columns 下标（重名列会映射到同一下标）
    header_positions: Vec<usize>,
}

impl ImportRecord {
    /// 由表头与单位行构造空记录
    ///
    /// - 单位行比表头短时，缺失单位记为空串
    /// - 重名列沿用第一次出现的位置，单位被后出现的列覆盖
    pub fn with_header<S: AsRef<str>>(names: &[S], units: &[S]) -> Self {
        let mut record = Self::default();

        for (pos, name) in names.iter().enumerate() {
            let name = name.as_ref().to_string();
            let unit = units
                .get(pos)
                .map(|u| u.as_ref().to_string())
                .unwrap_or_default();

            let target = match record.index.get(&name) {
                Some(&existing) => {
                    record.columns[existing].unit = unit;
                    existing
                }
                None => {
                    let target = record.columns.len();
                    record.index.insert(name.clone(), target);
                    record.columns.push(ImportColumn {
                        name,
                        unit,
                        values: Vec::new(),
                    });
                    target
                }
            };
            record.header_positions.push(target);
        }

        record
    }

    /// 追加一行数据（按列位置对应，缺失字段补空串，多余字段忽略）
    ///
    /// # 返回
    /// - 被截断的多余字段数
    pub fn push_row<'a, I>(&mut self, fields: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields = fields.into_iter();
        let mut row: Vec<Option<&str>> = vec![None; self.columns.len()];

        for (pos, field) in fields.by_ref().take(self.header_positions.len()).enumerate() {
            // 重名列：后出现的字段覆盖
            row[self.header_positions[pos]] = Some(field);
        }

        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value.unwrap_or_default().to_string());
        }

        fields.count()
    }

    pub fn columns(&self) -> &[ImportColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ImportColumn> {
        self.index.get(name).map(|&pos| &self.columns[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 表头原始列数（含重名列）
    pub fn header_len(&self) -> usize {
        self.header_positions.len()
    }

    /// 数据行数（取任意一列的长度，所有列长度相同）
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    /// 读取指定列指定行的值；列不存在或越界返回 None
    pub fn value(&self, column: &str, row: usize) -> Option<&str> {
        self.column(column)
            .and_then(|c| c.values.get(row))
            .map(String::as_str)
    }

    /// 指定列的单位
    pub fn unit(&self, column: &str) -> Option<&str> {
        self.column(column).map(|c| c.unit.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_rows_are_padded() {
        let mut record = ImportRecord::with_header(&["a", "b", "c"], &["m"]);
        assert_eq!(record.push_row(["1", "2", "3"]), 0);
        assert_eq!(record.push_row(["4"]), 0);

        assert_eq!(record.unit("a"), Some("m"));
        assert_eq!(record.unit("c"), Some(""));
        assert_eq!(record.row_count(), 2);
        assert_eq!(record.value("b", 1), Some(""));
        assert!(record.columns().iter().all(|c| c.values.len() == 2));
    }

    #[test]
    fn test_extra_fields_are_truncated() {
        let mut record = ImportRecord::with_header(&["a", "b"], &["", ""]);
        assert_eq!(record.push_row(["1", "2", "3", "4"]), 2);
        assert_eq!(record.value("b", 0), Some("2"));
    }

    #[test]
    fn test_duplicate_header_keeps_one_column() {
        let mut record = ImportRecord::with_header(&["x", "y", "x"], &["m", "m", "ft"]);
        record.push_row(["1", "2", "3"]);

        assert_eq!(record.columns().len(), 2);
        assert_eq!(record.header_len(), 3);
        assert_eq!(record.unit("x"), Some("ft"));
        assert_eq!(record.value("x", 0), Some("3"));
        assert_eq!(record.row_count(), 1);
    }
}
