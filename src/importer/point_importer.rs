// ==========================================
// 地质数据导入 - 点导入器
// ==========================================
// 流程: 逐行 → 取值 → (按 id 更新 | 新建) → 附加属性 → 落库 → 进度/取消检查
// 说明: 东/北坐标均为空的行视为无几何，直接跳过
// ==========================================

use crate::domain::{GeoPoint, ImportKind, Stratigraphy, UNKNOWN_AGE};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::{convert_property_value, file_line, FieldMapper};
use crate::importer::importer_trait::{GeoImporter, ImportContext, RunFlow};
use crate::importer::selection::Role;
use tracing::{debug, info};

pub struct PointImporter;

impl GeoImporter for PointImporter {
    fn kind(&self) -> ImportKind {
        ImportKind::Point
    }

    fn execute(&self, ctx: &mut ImportContext<'_>) -> ImportResult<RunFlow> {
        let rows = ctx.record.row_count();
        ctx.progress.grow_expected(rows);

        let mut inserted = 0usize;
        let mut updated = 0usize;

        for row in 0..rows {
            let fields = FieldMapper::new(ctx.record, ctx.mapping, row);
            if has_no_geometry(&fields) {
                if ctx.checkpoint(1) {
                    return Ok(RunFlow::Canceled);
                }
                continue;
            }

            let values = PointValues::read(&fields)?;
            let horizon = ctx
                .session
                .init_stratigraphy(&values.stratigraphy, values.age)?;

            let mut point = match fields.optional_id(Role::Id) {
                Some(id) => match ctx.session.load_point(id)? {
                    Some(mut existing) => {
                        values.apply_to(&mut existing, &fields, ctx.reference_system, horizon);
                        updated += 1;
                        existing
                    }
                    None => {
                        ctx.warn_missing(file_line(row), format!("点 id={}", id));
                        if ctx.checkpoint(1) {
                            return Ok(RunFlow::Canceled);
                        }
                        continue;
                    }
                },
                None => {
                    inserted += 1;
                    values.new_point(ctx.reference_system, horizon)
                }
            };

            attach_properties(ctx, &fields, &mut point);
            let id = ctx.session.save_point(&mut point)?;
            debug!(row = file_line(row), point_id = id, "点已保存");

            if ctx.checkpoint(1) {
                return Ok(RunFlow::Canceled);
            }
        }

        info!(inserted = inserted, updated = updated, "点导入完成");
        Ok(RunFlow::Completed)
    }
}

/// 东/北坐标都已绑定且都为空
pub(crate) fn has_no_geometry(fields: &FieldMapper<'_>) -> bool {
    fields.is_blank(Role::Easting) && fields.is_blank(Role::Northing)
}

// ==========================================
// PointValues - 单行点数据（点/线导入共用）
// ==========================================
pub(crate) struct PointValues {
    pub easting: f64,
    pub northing: f64,
    pub altitude: Option<f64>,
    pub stratigraphy: String,
    pub age: f64,
    pub name: String,
    pub comment: String,
}

impl PointValues {
    /// 东/北坐标必填（格式错误使整次运行失败），其余字段按缺省值处理
    pub fn read(fields: &FieldMapper<'_>) -> ImportResult<Self> {
        Ok(Self {
            easting: fields.required_f64(Role::Easting)?,
            northing: fields.required_f64(Role::Northing)?,
            altitude: fields.optional_f64(Role::Altitude)?,
            stratigraphy: fields.text(Role::Stratigraphy),
            age: fields.f64_or(Role::StratigraphicAge, UNKNOWN_AGE)?,
            name: fields.text(Role::SetName),
            comment: fields.text(Role::Comment),
        })
    }

    pub fn new_point(&self, reference_system: &str, horizon: Option<Stratigraphy>) -> GeoPoint {
        let mut point = GeoPoint::new(self.easting, self.northing, self.altitude, reference_system);
        point.horizon = horizon;
        point.name = self.name.clone();
        point.comment = self.comment.clone();
        point
    }

    /// 更新已有点：坐标、高程与参考系总是覆盖，文本/地层仅在对应角色已绑定时覆盖
    pub fn apply_to(
        &self,
        point: &mut GeoPoint,
        fields: &FieldMapper<'_>,
        reference_system: &str,
        horizon: Option<Stratigraphy>,
    ) {
        point.easting = self.easting;
        point.northing = self.northing;
        point.set_altitude(self.altitude);
        point.reference_system = reference_system.to_string();
        if fields.raw(Role::Stratigraphy).is_some() {
            point.horizon = horizon;
        }
        if fields.raw(Role::SetName).is_some() {
            point.name = self.name.clone();
        }
        if fields.raw(Role::Comment).is_some() {
            point.comment = self.comment.clone();
        }
    }
}

/// 将选中的附加属性列写入点（类型不符的值跳过并计入警告，空值忽略）
pub(crate) fn attach_properties(ctx: &mut ImportContext<'_>, fields: &FieldMapper<'_>, point: &mut GeoPoint) {
    let specs = ctx.properties;
    for spec in specs {
        let raw = fields.column_value(&spec.name);
        if raw.trim().is_empty() {
            continue;
        }
        match convert_property_value(raw, spec.property_type) {
            Some(value) => point.upsert_property(&spec.name, &spec.unit, spec.property_type, &value),
            None => ctx.warn_row(
                file_line(fields.row()),
                &format!(
                    "属性 {} 的值 {:?} 不是 {}，已跳过",
                    spec.name, raw, spec.property_type
                ),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImportRecord;
    use crate::importer::selection::SelectionMapping;

    #[test]
    fn test_point_values_defaults() {
        let mut record = ImportRecord::with_header(&["e", "n", "z"], &[]);
        record.push_row(["1", "2", ""]);
        let mut mapping = SelectionMapping::new(ImportKind::Point);
        mapping.set("easting", "e").unwrap();
        mapping.set("northing", "n").unwrap();
        mapping.set("altitude", "z").unwrap();

        let fields = FieldMapper::new(&record, &mapping, 0);
        let values = PointValues::read(&fields).unwrap();
        let point = values.new_point("WKT", None);

        assert_eq!(point.altitude, 0.0);
        assert!(!point.has_z);
        assert_eq!(values.age, UNKNOWN_AGE);
        assert_eq!(point.name, "");
        assert_eq!(point.reference_system, "WKT");
    }
}
