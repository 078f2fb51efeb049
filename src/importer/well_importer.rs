// ==========================================
// 地质数据导入 - 钻井导入器
// ==========================================
// 分组: 按井名分组，每行一个分层标记（文件顺序）
// 新井: 取该井第一行的坐标/高程/总深度创建
// 已有井: 旧标记整体删除，替换为本次解析的标记集合（不合并）
// ==========================================

use crate::domain::{ImportKind, Well, WellMarker, UNKNOWN_AGE, UNKNOWN_DEPTH};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{file_line, FieldMapper};
use crate::importer::importer_trait::{GeoImporter, ImportContext, RunFlow};
use crate::importer::point_importer::has_no_geometry;
use crate::importer::selection::Role;
use std::collections::HashMap;
use tracing::{debug, info};

pub struct WellImporter;

struct WellGroup {
    name: String,
    short_name: String,
    easting: f64,
    northing: f64,
    altitude: Option<f64>,
    total_depth: f64,
    markers: Vec<WellMarker>,
}

impl GeoImporter for WellImporter {
    fn kind(&self) -> ImportKind {
        ImportKind::Well
    }

    fn execute(&self, ctx: &mut ImportContext<'_>) -> ImportResult<RunFlow> {
        let rows = ctx.record.row_count();
        ctx.progress.grow_expected(rows);

        // ===== 阶段 1: 读取并按井名分组 =====
        let mut groups: Vec<WellGroup> = Vec::new();
        let mut group_index: HashMap<String, usize> = HashMap::new();

        for row in 0..rows {
            let fields = FieldMapper::new(ctx.record, ctx.mapping, row);
            if has_no_geometry(&fields) {
                if ctx.checkpoint(1) {
                    return Ok(RunFlow::Canceled);
                }
                continue;
            }

            let name = fields.text(Role::Name);
            if name.is_empty() {
                ctx.warn_row(file_line(row), "井名为空，跳过该行");
                if ctx.checkpoint(1) {
                    return Ok(RunFlow::Canceled);
                }
                continue;
            }

            let easting = fields.required_f64(Role::Easting)?;
            let northing = fields.required_f64(Role::Northing)?;
            let altitude = fields.optional_f64(Role::Altitude)?;
            let total_depth = fields.f64_or(Role::TotalDepth, UNKNOWN_DEPTH)?;
            let depth_to = fields.f64_or(Role::DepthTo, UNKNOWN_DEPTH)?;
            let strat_name = fields.text(Role::Stratigraphy);
            let comment = fields.text(Role::Comment);

            let idx = match group_index.get(&name) {
                Some(&idx) => idx,
                None => {
                    groups.push(WellGroup {
                        name: name.clone(),
                        short_name: fields.text(Role::ShortName),
                        easting,
                        northing,
                        altitude,
                        total_depth,
                        markers: Vec::new(),
                    });
                    group_index.insert(name, groups.len() - 1);
                    ctx.progress.grow_expected(1);
                    groups.len() - 1
                }
            };

            // 既无地层也无深度的行只提供井头信息
            if !strat_name.is_empty() || depth_to != UNKNOWN_DEPTH {
                let horizon = ctx.session.init_stratigraphy(&strat_name, UNKNOWN_AGE)?;
                groups[idx].markers.push(WellMarker {
                    id: None,
                    depth: depth_to,
                    horizon,
                    comment,
                });
            }

            if ctx.checkpoint(1) {
                return Ok(RunFlow::Canceled);
            }
        }

        debug!(wells = groups.len(), "钻井分组完成");

        // ===== 阶段 2: 逐井落库 =====
        let mut created = 0usize;
        let mut replaced = 0usize;
        for group in groups {
            let mut well = match ctx.session.load_well_by_name(&group.name)? {
                Some(mut existing) => {
                    debug!(well = %group.name, old_markers = existing.markers.len(), "更新已有钻井，替换全部标记");
                    existing.short_name = group.short_name;
                    existing.easting = group.easting;
                    existing.northing = group.northing;
                    existing.depth = group.total_depth;
                    if let Some(altitude) = group.altitude {
                        existing.altitude = altitude;
                        existing.has_z = true;
                    }
                    existing.markers = group.markers;
                    replaced += 1;
                    existing
                }
                None => {
                    created += 1;
                    Well {
                        id: None,
                        name: group.name,
                        short_name: group.short_name,
                        depth: group.total_depth,
                        easting: group.easting,
                        northing: group.northing,
                        altitude: group.altitude.unwrap_or(0.0),
                        has_z: group.altitude.is_some(),
                        reference_system: ctx.reference_system.to_string(),
                        markers: group.markers,
                    }
                }
            };

            if let Some(marker) = well.marker_below_total_depth() {
                return Err(ImportError::MarkerDepth {
                    well: well.name.clone(),
                    marker_depth: marker.depth,
                    total_depth: well.depth,
                });
            }

            let well_id = ctx.session.save_well(&mut well)?;
            debug!(well_id = well_id, markers = well.markers.len(), "钻井已保存");

            if ctx.checkpoint(1) {
                return Ok(RunFlow::Canceled);
            }
        }

        info!(created = created, replaced = replaced, "钻井导入完成");
        Ok(RunFlow::Completed)
    }
}
