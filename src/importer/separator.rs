// ==========================================
// 地质数据导入 - 分隔符推断
// ==========================================
// 职责: 根据表头行推断字段分隔符
// 规则: 按固定优先级尝试，首个切分出 >= 3 个字段的分隔符胜出
// ==========================================

use crate::importer::error::ImportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 候选分隔符（优先级顺序不可调整）
pub const SEPARATOR_CANDIDATES: [char; 8] = [';', ',', '\t', '.', '-', '_', '/', '\\'];

/// 推断成立所需的最少字段数
pub const MIN_HEADER_FIELDS: usize = 3;

const TAB_DISPLAY_NAME: &str = "<tabulator>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Separator(char);

impl Separator {
    pub const SEMICOLON: Separator = Separator(';');
    pub const TAB: Separator = Separator('\t');

    /// 仅接受候选集合内的字符
    pub fn new(c: char) -> Option<Self> {
        SEPARATOR_CANDIDATES.contains(&c).then_some(Separator(c))
    }

    pub fn as_char(&self) -> char {
        self.0
    }

    /// 界面显示名（TAB 显示为 `<tabulator>`）
    pub fn display_name(&self) -> String {
        if self.0 == '\t' {
            TAB_DISPLAY_NAME.to_string()
        } else {
            self.0.to_string()
        }
    }

    pub fn field_count(&self, line: &str) -> usize {
        line.split(self.0).count()
    }
}

impl Default for Separator {
    fn default() -> Self {
        Separator::SEMICOLON
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl FromStr for Separator {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            TAB_DISPLAY_NAME | "\\t" | "tab" | "TAB" => return Ok(Separator::TAB),
            _ => {}
        }

        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Separator::new(c)
                .ok_or_else(|| ImportError::Format(format!("不支持的分隔符: {:?}", s))),
            _ => Err(ImportError::Format(format!("不支持的分隔符: {:?}", s))),
        }
    }
}

/// 推断表头行的分隔符
///
/// 按 `; , TAB . - _ / \` 顺序尝试，返回第一个切分出至少 3 个字段的分隔符；
/// 都不满足时回退为 `;`
pub fn find_separator(line: &str) -> Separator {
    let line = line.trim_end_matches(['\r', '\n']);
    SEPARATOR_CANDIDATES
        .iter()
        .map(|&c| Separator(c))
        .find(|sep| sep.field_count(line) >= MIN_HEADER_FIELDS)
        .unwrap_or_default()
}

/// 选择实际使用的分隔符
///
/// 调用方给定的分隔符能切分出至少 3 个表头字段时保留，否则重新推断
pub fn resolve_separator(header_line: &str, selected: Option<Separator>) -> Separator {
    let line = header_line.trim_end_matches(['\r', '\n']);
    match selected {
        Some(sep) if sep.field_count(line) >= MIN_HEADER_FIELDS => sep,
        _ => find_separator(line),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        // 分号优先于逗号
        assert_eq!(find_separator("a;b;c,d,e,f").as_char(), ';');
        // 逗号切分不足 3 段时继续尝试
        assert_eq!(find_separator("a,b\tc\td").as_char(), '\t');
        // 小数点可能同时出现，必须按顺序选逗号
        assert_eq!(find_separator("x.1,y.2,z.3").as_char(), ',');
    }

    #[test]
    fn test_each_candidate_detected() {
        for c in SEPARATOR_CANDIDATES {
            let line = format!("a{c}b{c}c");
            assert_eq!(find_separator(&line).as_char(), c);
        }
    }

    #[test]
    fn test_fallback_to_semicolon() {
        assert_eq!(find_separator("east north"), Separator::SEMICOLON);
        assert_eq!(find_separator(""), Separator::SEMICOLON);
    }

    #[test]
    fn test_trailing_newline_ignored() {
        assert_eq!(find_separator("a\tb\tc\r\n"), Separator::TAB);
    }

    #[test]
    fn test_tab_display_and_parse() {
        assert_eq!(Separator::TAB.to_string(), "<tabulator>");
        assert_eq!("<tabulator>".parse::<Separator>().unwrap(), Separator::TAB);
        assert_eq!(",".parse::<Separator>().unwrap().as_char(), ',');
        assert!("|".parse::<Separator>().is_err());
        assert!(";;".parse::<Separator>().is_err());
    }

    #[test]
    fn test_resolve_keeps_working_selection() {
        let sel = Separator::new(',');
        assert_eq!(resolve_separator("a,b,c", sel).as_char(), ',');
        // 选中的分隔符不再适用时重新推断
        assert_eq!(resolve_separator("a;b;c", sel).as_char(), ';');
    }
}
