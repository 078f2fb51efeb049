// ==========================================
// 地质数据导入 - 命令行参数定义
// ==========================================

use clap::{Parser, Subcommand, ValueEnum};
use geological_data_import::config::DB_PATH_ENV;
use geological_data_import::{ImportKind, Separator};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "geo-import",
    version,
    about = "导入点/线/井/属性/测井分隔文本文件到地质数据库"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 日志级别过滤器（覆盖 RUST_LOG），例如 debug 或 geological_data_import=trace
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// 日志输出格式
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,
}

#[derive(Subcommand)]
pub enum Command {
    /// 查看文件的分隔符与列结构
    Inspect(InspectArgs),

    /// 执行一次导入
    Import(ImportArgs),
}

#[derive(Parser)]
pub struct InspectArgs {
    /// 导入文件路径
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// 分隔符（; , . - _ / \ 或 <tabulator>），缺省时自动推断
    #[arg(short, long)]
    pub separator: Option<Separator>,

    /// 以 JSON 输出
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ImportArgs {
    /// 导入类型: point, line, well, property, well_log
    #[arg(value_name = "KIND")]
    pub kind: ImportKind,

    /// 导入文件路径
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// 数据库文件路径
    #[arg(long, env = DB_PATH_ENV)]
    pub db: Option<PathBuf>,

    /// 分隔符，缺省时取配置或自动推断
    #[arg(short, long)]
    pub separator: Option<Separator>,

    /// 角色绑定 ROLE=COLUMN（可重复；COLUMN 为空表示取消选择）
    #[arg(short, long = "map", value_name = "ROLE=COLUMN")]
    pub map: Vec<String>,

    /// 附加属性列 NAME[:TYPE]（可重复；TYPE 为 integer/float/string）
    #[arg(short, long = "property", value_name = "NAME[:TYPE]")]
    pub property: Vec<String>,

    /// 导入全部候选属性列
    #[arg(long = "all-properties", conflicts_with = "property")]
    pub all_properties: bool,

    /// 参考系（WKT），缺省时取配置
    #[arg(long)]
    pub reference: Option<String>,

    /// 以 JSON 输出终态
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}
