// ==========================================
// 地质数据导入 - 文件解析器实现
// ==========================================
// 格式: 第 1 行列名 / 第 2 行单位 / 其余为数据行
// 策略: 短行补空串，多余字段截断（记 debug 日志），空行保留为全空数据行
// ==========================================

use crate::domain::ImportRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::importer_trait::FileParser;
use crate::importer::separator::{resolve_separator, Separator};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::Path;
use tracing::debug;

const UTF8_BOM: char = '\u{feff}';

// ==========================================
// DelimitedTextParser 实现
// ==========================================
pub struct DelimitedTextParser;

impl FileParser for DelimitedTextParser {
    fn parse(&self, file_path: &Path, separator: Separator) -> ImportResult<ImportRecord> {
        read(file_path, separator)
    }
}

/// 按指定分隔符读取导入文件
///
/// # 错误
/// - FileNotFound / Io: 文件无法打开或读取
/// - Format: 文件不足 2 行，或表头少于 2 列
pub fn read(path: &Path, separator: Separator) -> ImportResult<ImportRecord> {
    let mut lines = open_lines(path)?;
    let sep = separator.as_char();

    let header = match lines.next() {
        Some(line) => normalize_line(&line?, sep),
        None => return Err(ImportError::Format(format!("文件为空: {}", path.display()))),
    };
    let units = match lines.next() {
        Some(line) => normalize_line(&line?, sep),
        None => {
            return Err(ImportError::Format(format!(
                "文件缺少单位行: {}",
                path.display()
            )))
        }
    };

    let names: Vec<&str> = header.split(sep).collect();
    let units: Vec<&str> = units.split(sep).collect();

    let mut record = ImportRecord::with_header(&names, &units);
    // 重名列合并后再检查，`x;x` 只算一列
    if record.columns().len() < 2 {
        return Err(ImportError::Format(format!(
            "表头有效列数不足（{} 列），请检查分隔符 {}",
            record.columns().len(),
            separator
        )));
    }
    let mut truncated_rows = 0usize;

    for (idx, line) in lines.enumerate() {
        let line = normalize_line(&line?, sep);
        let extra = record.push_row(line.split(sep));
        if extra > 0 {
            truncated_rows += 1;
            // 数据行号从 0 开始（不含两行表头）
            debug!(row = idx, extra_fields = extra, "数据行字段多于表头，已截断");
        }
    }

    debug!(
        path = %path.display(),
        separator = %separator,
        columns = record.columns().len(),
        rows = record.row_count(),
        truncated_rows = truncated_rows,
        "导入文件解析完成"
    );

    Ok(record)
}

/// 读取文件第一行（用于分隔符推断）
pub fn read_header_line(path: &Path) -> ImportResult<String> {
    match open_lines(path)?.next() {
        Some(line) => Ok(line?.trim_start_matches(UTF8_BOM).to_string()),
        None => Err(ImportError::Format(format!("文件为空: {}", path.display()))),
    }
}

/// 确定分隔符并读取文件
///
/// 调用方给定的分隔符对表头有效时保留，否则由表头行推断
pub fn read_with_inferred_separator(
    path: &Path,
    selected: Option<Separator>,
) -> ImportResult<(Separator, ImportRecord)> {
    let header = read_header_line(path)?;
    let separator = resolve_separator(&header, selected);
    let record = read(path, separator)?;
    Ok((separator, record))
}

fn open_lines(path: &Path) -> ImportResult<std::io::Lines<BufReader<File>>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ImportError::FileNotFound(path.display().to_string()),
        _ => ImportError::Io(format!("{}: {}", path.display(), e)),
    })?;
    Ok(BufReader::new(file).lines())
}

/// 去除 BOM 与首尾空白（与分隔符相同的空白字符保留，例如 TAB）
fn normalize_line(line: &str, sep: char) -> String {
    line.trim_start_matches(UTF8_BOM)
        .trim_matches(|c: char| c.is_whitespace() && c != sep)
        .to_string()
}
