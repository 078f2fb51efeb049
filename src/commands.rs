// ==========================================
// 地质数据导入 - 子命令实现
// ==========================================

use crate::cli::{ImportArgs, InspectArgs};
use anyhow::{anyhow, bail, Context, Result};
use geological_data_import::config::{get_default_db_path, ConfigManager, ImportConfigReader};
use geological_data_import::importer::{
    preview_file, FilePreview, ImportEvent, ImportSelection, PropertyColumnSpec,
    DEFAULT_CANCEL_MESSAGE,
};
use geological_data_import::{ImportOutcome, ImportService, PropertyType, SqliteGeoStore};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

// ==========================================
// inspect
// ==========================================
pub fn run_inspect(args: &InspectArgs) -> Result<()> {
    let preview = preview_file(&args.file, args.separator)
        .with_context(|| format!("无法读取文件 {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print_preview(&preview);
    }
    Ok(())
}

fn print_preview(preview: &FilePreview) {
    println!("文件:   {}", preview.path.display());
    println!("分隔符: {}", preview.separator);
    println!("数据行: {}", preview.row_count);
    println!("列:");
    for column in &preview.columns.selectable {
        let marker = if preview.columns.is_numeric(&column.name) {
            "数值"
        } else {
            "文本"
        };
        if column.unit.is_empty() {
            println!("  {:<24} {}", column.name, marker);
        } else {
            println!("  {:<24} {} [{}]", column.name, marker, column.unit);
        }
    }
    println!("数值列: {}", preview.columns.numeric.len());
}

// ==========================================
// import
// ==========================================
pub async fn run_import(args: ImportArgs) -> Result<ImportOutcome> {
    let db_path = args
        .db
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(get_default_db_path);
    info!(db_path = %db_path, "打开数据库");

    let config = ConfigManager::new(&db_path)?;
    let file = resolve_input_path(&args.file, config.get_working_path()?);
    let store = Arc::new(SqliteGeoStore::new(&db_path)?);
    let service = ImportService::with_config(store, &config)?;

    let mut prepared = service.prepare(args.kind, &file, args.separator)?;
    apply_mappings(&mut prepared.selection, &args.map)?;
    let properties = select_properties(&mut prepared.selection, &args.property, args.all_properties)?;
    prepared.selection.validate()?;

    for role in prepared.selection.role_names() {
        info!(role, column = prepared.selection.get(role)?, "角色绑定");
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut handle = service.start(prepared, properties, args.reference.clone(), Arc::new(tx))?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_sent = false;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(ImportEvent::Progress(percent)) => print_progress(percent),
                Some(ImportEvent::Finished(_)) | None => break,
            },
            signal = &mut ctrl_c, if !cancel_sent => {
                if let Err(e) = signal {
                    warn!(error = %e, "无法监听中断信号");
                }
                cancel_sent = true;
                eprintln!();
                handle.cancel(DEFAULT_CANCEL_MESSAGE);
            }
        }
    }
    eprintln!();

    // 终态已通知，工作线程随后退出；等待超时也不丢失结果
    let outcome = match handle.wait(None).await? {
        Some(outcome) => outcome,
        None => handle
            .outcome()
            .ok_or_else(|| anyhow!("导入 {} 未在等待时间内结束", handle.job_id()))?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome);
    }
    Ok(outcome)
}

fn resolve_input_path(file: &Path, working_path: Option<PathBuf>) -> PathBuf {
    match working_path {
        Some(dir) if file.is_relative() && !file.exists() => dir.join(file),
        _ => file.to_path_buf(),
    }
}

fn apply_mappings(selection: &mut ImportSelection, mappings: &[String]) -> Result<()> {
    for mapping in mappings {
        let (role, column) = mapping
            .split_once('=')
            .ok_or_else(|| anyhow!("角色绑定格式应为 ROLE=COLUMN: {}", mapping))?;
        selection.set(role.trim(), column.trim())?;
    }
    Ok(())
}

fn select_properties(
    selection: &mut ImportSelection,
    specs: &[String],
    all: bool,
) -> Result<Vec<PropertyColumnSpec>> {
    if all {
        return Ok(selection.property_candidates().to_vec());
    }

    let mut names = Vec::with_capacity(specs.len());
    for spec in specs {
        let (name, property_type) = match spec.rsplit_once(':') {
            Some((name, ty)) => {
                let ty: PropertyType = ty.parse().map_err(|e: String| anyhow!(e))?;
                (name.trim(), Some(ty))
            }
            None => (spec.trim(), None),
        };
        if name.is_empty() {
            bail!("属性列名为空: {}", spec);
        }
        if let Some(ty) = property_type {
            selection.set_property_type(name, ty)?;
        }
        names.push(name);
    }

    Ok(selection.pick_properties(&names)?)
}

fn print_progress(percent: u8) {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "\r导入进度: {:>3}%", percent);
    let _ = stderr.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use geological_data_import::importer::{ColumnInfo, ColumnSet};
    use geological_data_import::ImportKind;

    fn point_selection() -> ImportSelection {
        let column = |name: &str| ColumnInfo {
            name: name.to_string(),
            unit: String::new(),
        };
        let columns = ColumnSet {
            selectable: vec![column("e"), column("n"), column("z"), column("rock")],
            numeric: vec![column("e"), column("n"), column("z")],
        };
        ImportSelection::new(ImportKind::Point, columns)
    }

    #[test]
    fn test_apply_mappings() {
        let mut selection = point_selection();
        apply_mappings(&mut selection, &["easting=e".into(), "northing = n".into()]).unwrap();
        assert_eq!(selection.get("easting").unwrap(), "e");
        assert_eq!(selection.get("northing").unwrap(), "n");
        assert!(apply_mappings(&mut selection, &["easting".into()]).is_err());
    }

    #[test]
    fn test_select_properties_with_type() {
        let mut selection = point_selection();
        apply_mappings(&mut selection, &["easting=e".into(), "northing=n".into()]).unwrap();

        let picked = select_properties(&mut selection, &["z:integer".into(), "rock".into()], false).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].name, "z");
        assert_eq!(picked[0].property_type, PropertyType::Integer);
        assert_eq!(picked[1].property_type, PropertyType::String);

        // 已绑定为角色的列不再是候选
        assert!(select_properties(&mut selection, &["e".into()], false).is_err());
    }
}
