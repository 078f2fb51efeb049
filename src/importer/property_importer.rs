// ==========================================
// 地质数据导入 - 属性导入器
// ==========================================
// 流程: 逐行按 id 查找点 → 同名属性就地更新 / 不存在则新建 → 落库
// 说明: 目标点不存在只计警告，不中断导入
// ==========================================

use crate::domain::ImportKind;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::{file_line, FieldMapper};
use crate::importer::importer_trait::{GeoImporter, ImportContext, RunFlow};
use crate::importer::point_importer::attach_properties;
use crate::importer::selection::Role;
use tracing::{debug, info};

pub struct PropertyImporter;

impl GeoImporter for PropertyImporter {
    fn kind(&self) -> ImportKind {
        ImportKind::Property
    }

    fn execute(&self, ctx: &mut ImportContext<'_>) -> ImportResult<RunFlow> {
        let rows = ctx.record.row_count();
        ctx.progress.grow_expected(rows);

        let mut updated = 0usize;

        for row in 0..rows {
            let fields = FieldMapper::new(ctx.record, ctx.mapping, row);

            match fields.optional_id(Role::Id) {
                None if fields.is_blank(Role::Id) => {}
                None => {
                    let raw = fields.text(Role::Id);
                    ctx.warn_row(file_line(row), &format!("无效的点 id {:?}，跳过该行", raw));
                }
                Some(id) => match ctx.session.load_point(id)? {
                    None => {
                        ctx.warn_missing(file_line(row), format!("点 id={}", id));
                    }
                    Some(mut point) => {
                        attach_properties(ctx, &fields, &mut point);
                        ctx.session.save_point(&mut point)?;
                        debug!(row = file_line(row), point_id = id, "点属性已更新");
                        updated += 1;
                    }
                },
            }

            if ctx.checkpoint(1) {
                return Ok(RunFlow::Canceled);
            }
        }

        info!(updated = updated, properties = ctx.properties.len(), "属性导入完成");
        Ok(RunFlow::Completed)
    }
}
