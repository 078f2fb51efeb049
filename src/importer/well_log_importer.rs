// ==========================================
// 地质数据导入 - 测井曲线导入器
// ==========================================
// 流程: 逐行按井名查找钻井 → 每个属性列对应一条曲线（按列名匹配）→ 同深度值就地更新
// 说明: 钻井不存在只计警告；每行单独提交
// ==========================================

use crate::domain::{ImportKind, WellLog, WellLogValue};
use crate::importer::column_classifier::parse_float_literal;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::{file_line, FieldMapper};
use crate::importer::importer_trait::{GeoImporter, ImportContext, RunFlow};
use crate::importer::selection::Role;
use std::collections::HashMap;
use tracing::{debug, info};

pub struct WellLogImporter;

/// 已加载的钻井及其曲线（None 表示数据库中不存在该井）
type WellCache = HashMap<String, Option<(i64, Vec<WellLog>)>>;

impl GeoImporter for WellLogImporter {
    fn kind(&self) -> ImportKind {
        ImportKind::WellLog
    }

    fn execute(&self, ctx: &mut ImportContext<'_>) -> ImportResult<RunFlow> {
        let rows = ctx.record.row_count();
        ctx.progress.grow_expected(rows);

        let specs = ctx.properties;
        let mut wells: WellCache = HashMap::new();
        let mut written = 0usize;

        for row in 0..rows {
            let fields = FieldMapper::new(ctx.record, ctx.mapping, row);
            let well_name = fields.text(Role::WellName);

            if well_name.is_empty() {
                if !fields.is_blank(Role::Depth) {
                    ctx.warn_row(file_line(row), "井名为空，跳过该行");
                }
                if ctx.checkpoint(1) {
                    return Ok(RunFlow::Canceled);
                }
                continue;
            }

            let depth = fields.required_f64(Role::Depth)?;

            if !wells.contains_key(&well_name) {
                let loaded = match ctx.session.load_well_by_name(&well_name)? {
                    Some(well) => match well.id {
                        Some(id) => Some((id, ctx.session.load_well_logs(id)?)),
                        None => None,
                    },
                    None => None,
                };
                wells.insert(well_name.clone(), loaded);
            }

            let Some(Some((well_id, logs))) = wells.get_mut(&well_name) else {
                ctx.warn_missing(file_line(row), format!("钻井 {}", well_name));
                if ctx.checkpoint(1) {
                    return Ok(RunFlow::Canceled);
                }
                continue;
            };

            for spec in specs {
                let raw = fields.column_value(&spec.name);
                if raw.trim().is_empty() {
                    continue;
                }
                let Some(value) = parse_float_literal(raw) else {
                    ctx.warn_row(
                        file_line(row),
                        &format!("曲线 {} 的值 {:?} 不是数值，已跳过", spec.name, raw),
                    );
                    continue;
                };

                let idx = match logs.iter().position(|l| l.name == spec.name) {
                    Some(idx) => idx,
                    None => {
                        logs.push(WellLog::new(*well_id, &spec.name, &spec.unit));
                        logs.len() - 1
                    }
                };
                let log = &mut logs[idx];
                log.upsert_value(depth, value);

                // 只提交本行的值，避免每行重写整条曲线
                let mut delta = WellLog {
                    id: log.id,
                    well_id: log.well_id,
                    name: log.name.clone(),
                    unit: log.unit.clone(),
                    values: vec![WellLogValue { depth, value }],
                };
                log.id = Some(ctx.session.save_well_log(&mut delta)?);
                written += 1;
            }
            debug!(row = file_line(row), well = %well_name, depth = depth, "测井值已保存");

            if ctx.checkpoint(1) {
                return Ok(RunFlow::Canceled);
            }
        }

        info!(values = written, wells = wells.len(), "测井曲线导入完成");
        Ok(RunFlow::Completed)
    }
}
