// ==========================================
// 地质数据导入 - 折线导入器
// ==========================================
// 分组: id 列可解析为非负整数时按 id 分组，否则按空行分段（空行使隐式计数 +1）
// 闭合: 首尾点相同则标记 closed 并去掉尾点
// 更新: 按 id 找到已有折线时，旧点全部删除后写入新点序列
// ==========================================

use crate::domain::{GeoPoint, ImportKind, Line, Stratigraphy};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::importer_trait::{GeoImporter, ImportContext, RunFlow};
use crate::importer::point_importer::{attach_properties, has_no_geometry, PointValues};
use crate::importer::selection::Role;
use std::collections::HashMap;
use tracing::{debug, info};

pub struct LineImporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum GroupKey {
    /// 文件中显式给出的折线 id
    Id(i64),
    /// 空行分段的隐式编号
    Counter(usize),
}

struct LineGroup {
    key: GroupKey,
    horizon: Option<Stratigraphy>,
    comment: String,
    points: Vec<GeoPoint>,
}

impl GeoImporter for LineImporter {
    fn kind(&self) -> ImportKind {
        ImportKind::Line
    }

    fn execute(&self, ctx: &mut ImportContext<'_>) -> ImportResult<RunFlow> {
        let rows = ctx.record.row_count();
        ctx.progress.grow_expected(rows);

        // ===== 阶段 1: 读取并分组（保持文件顺序） =====
        let mut groups: Vec<LineGroup> = Vec::new();
        let mut group_index: HashMap<GroupKey, usize> = HashMap::new();
        let mut counter = 0usize;

        for row in 0..rows {
            let fields = FieldMapper::new(ctx.record, ctx.mapping, row);
            if has_no_geometry(&fields) {
                counter += 1;
                if ctx.checkpoint(1) {
                    return Ok(RunFlow::Canceled);
                }
                continue;
            }

            let key = match fields.optional_id(Role::Id) {
                Some(id) => GroupKey::Id(id),
                None => GroupKey::Counter(counter),
            };

            let values = PointValues::read(&fields)?;
            let mut point = values.new_point(ctx.reference_system, None);
            attach_properties(ctx, &fields, &mut point);

            let idx = match group_index.get(&key) {
                Some(&idx) => idx,
                None => {
                    // 地层与注释取该折线第一行
                    let horizon = ctx
                        .session
                        .init_stratigraphy(&values.stratigraphy, values.age)?;
                    groups.push(LineGroup {
                        key,
                        horizon,
                        comment: values.comment.clone(),
                        points: Vec::new(),
                    });
                    group_index.insert(key, groups.len() - 1);
                    ctx.progress.grow_expected(1);
                    groups.len() - 1
                }
            };
            groups[idx].points.push(point);

            if ctx.checkpoint(1) {
                return Ok(RunFlow::Canceled);
            }
        }

        debug!(groups = groups.len(), "折线分组完成");

        // ===== 阶段 2: 逐条折线落库 =====
        let line_count = groups.len();
        let mut closed_count = 0usize;
        for group in groups {
            let name = group
                .points
                .first()
                .map(|p| p.name.clone())
                .unwrap_or_default();

            let mut line = Line::from_points(group.points);
            line.horizon = group.horizon;
            line.name = name;
            line.comment = group.comment;

            if let GroupKey::Id(id) = group.key {
                if ctx.session.load_line(id)?.is_some() {
                    debug!(line_id = id, "更新已有折线，替换全部点");
                    line.id = Some(id);
                }
            }

            if line.closed {
                closed_count += 1;
            }
            let line_id = ctx.session.save_line(&mut line)?;
            debug!(line_id = line_id, points = line.points.len(), closed = line.closed, "折线已保存");

            if ctx.checkpoint(1) {
                return Ok(RunFlow::Canceled);
            }
        }

        info!(lines = line_count, closed = closed_count, "折线导入完成");
        Ok(RunFlow::Completed)
    }
}
