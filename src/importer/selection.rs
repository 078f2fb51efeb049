// ==========================================
// 地质数据导入 - 角色选择模型
// ==========================================
// 职责: 维护 语义角色 → 文件列 的绑定（按导入类型区分角色集合）
// 联动: 任一角色变更后同步重算“附加属性列”候选集合
// ==========================================

use crate::domain::{ImportKind, PropertyType};
use crate::importer::column_classifier::ColumnSet;
use crate::importer::error::{ImportError, ImportResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ==========================================
// Role - 语义角色
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Easting,
    Northing,
    Altitude,
    Stratigraphy,
    StratigraphicAge,
    SetName,
    Comment,
    Id,
    Name,
    ShortName,
    TotalDepth,
    DepthTo,
    WellName,
    Depth,
}

const POINT_ROLES: [Role; 8] = [
    Role::Easting,
    Role::Northing,
    Role::Altitude,
    Role::Stratigraphy,
    Role::StratigraphicAge,
    Role::SetName,
    Role::Comment,
    Role::Id,
];

const WELL_ROLES: [Role; 9] = [
    Role::Name,
    Role::ShortName,
    Role::Easting,
    Role::Northing,
    Role::Altitude,
    Role::TotalDepth,
    Role::Stratigraphy,
    Role::DepthTo,
    Role::Comment,
];

const PROPERTY_ROLES: [Role; 1] = [Role::Id];

const WELL_LOG_ROLES: [Role; 2] = [Role::WellName, Role::Depth];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Easting => "easting",
            Role::Northing => "northing",
            Role::Altitude => "altitude",
            Role::Stratigraphy => "stratigraphy",
            Role::StratigraphicAge => "stratigraphic_age",
            Role::SetName => "set_name",
            Role::Comment => "comment",
            Role::Id => "id",
            Role::Name => "name",
            Role::ShortName => "short_name",
            Role::TotalDepth => "total_depth",
            Role::DepthTo => "depth_to",
            Role::WellName => "well_name",
            Role::Depth => "depth",
        }
    }

    /// 指定导入类型的角色集合（固定顺序）
    pub fn roles_for(kind: ImportKind) -> &'static [Role] {
        match kind {
            ImportKind::Point | ImportKind::Line => &POINT_ROLES,
            ImportKind::Well => &WELL_ROLES,
            ImportKind::Property => &PROPERTY_ROLES,
            ImportKind::WellLog => &WELL_LOG_ROLES,
        }
    }

    /// 启动导入前必须绑定的角色
    pub fn required_for(kind: ImportKind) -> &'static [Role] {
        match kind {
            ImportKind::Point | ImportKind::Line => &[Role::Easting, Role::Northing],
            ImportKind::Well => &[Role::Name, Role::Easting, Role::Northing],
            ImportKind::Property => &[Role::Id],
            ImportKind::WellLog => &[Role::WellName, Role::Depth],
        }
    }

    fn parse_for(kind: ImportKind, name: &str) -> ImportResult<Role> {
        Role::roles_for(kind)
            .iter()
            .copied()
            .find(|r| r.as_str() == name)
            .ok_or_else(|| ImportError::UnknownRole(format!("{} ({})", name, kind)))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// SelectionMapping - 角色 → 列名（空串表示未选择）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionMapping {
    kind: ImportKind,
    bindings: Vec<(Role, String)>,
}

impl SelectionMapping {
    pub fn new(kind: ImportKind) -> Self {
        Self {
            kind,
            bindings: Role::roles_for(kind)
                .iter()
                .map(|&r| (r, String::new()))
                .collect(),
        }
    }

    pub fn kind(&self) -> ImportKind {
        self.kind
    }

    pub fn role_names(&self) -> Vec<&'static str> {
        self.bindings.iter().map(|(r, _)| r.as_str()).collect()
    }

    pub fn get(&self, role: &str) -> ImportResult<&str> {
        let role = Role::parse_for(self.kind, role)?;
        Ok(self.column(role).unwrap_or(""))
    }

    pub fn set(&mut self, role: &str, column: &str) -> ImportResult<()> {
        let role = Role::parse_for(self.kind, role)?;
        self.bind(role, column);
        Ok(())
    }

    /// 已绑定的列；未选择或该类型不含此角色时返回 None
    pub fn column(&self, role: Role) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, c)| c.as_str())
            .filter(|c| !c.is_empty())
    }

    /// 当前被任一角色占用的列
    pub fn bound_columns(&self) -> impl Iterator<Item = &str> {
        self.bindings
            .iter()
            .map(|(_, c)| c.as_str())
            .filter(|c| !c.is_empty())
    }

    /// 校验必选角色
    pub fn validate(&self) -> ImportResult<()> {
        match Role::required_for(self.kind)
            .iter()
            .find(|&&r| self.column(r).is_none())
        {
            Some(missing) => Err(ImportError::MissingRequiredRole(missing.to_string())),
            None => Ok(()),
        }
    }

    fn bind(&mut self, role: Role, column: &str) {
        if let Some((_, c)) = self.bindings.iter_mut().find(|(r, _)| *r == role) {
            *c = column.to_string();
        }
    }
}

// ==========================================
// PropertyColumnSpec - 附加属性列
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyColumnSpec {
    pub name: String,
    pub unit: String,
    pub property_type: PropertyType,
}

// ==========================================
// ImportSelection - 绑定到具体文件列的选择模型
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportSelection {
    mapping: SelectionMapping,
    columns: ColumnSet,
    // 用户修改过的属性类型（列名 → 类型）
    type_overrides: HashMap<String, PropertyType>,
    candidates: Vec<PropertyColumnSpec>,
}

impl ImportSelection {
    /// 所有角色均未选择
    pub fn new(kind: ImportKind, columns: ColumnSet) -> Self {
        let mut selection = Self {
            mapping: SelectionMapping::new(kind),
            columns,
            type_overrides: HashMap::new(),
            candidates: Vec::new(),
        };
        selection.recompute_candidates();
        selection
    }

    /// 按各导入类型的默认列预填角色
    pub fn with_defaults(kind: ImportKind, columns: ColumnSet) -> Self {
        let mut selection = Self::new(kind, columns);
        let defaults = default_bindings(kind, &selection.columns);
        for (role, column) in defaults {
            selection.mapping.bind(role, &column);
        }
        selection.recompute_candidates();
        selection
    }

    pub fn kind(&self) -> ImportKind {
        self.mapping.kind()
    }

    pub fn mapping(&self) -> &SelectionMapping {
        &self.mapping
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn role_names(&self) -> Vec<&'static str> {
        self.mapping.role_names()
    }

    pub fn get(&self, role: &str) -> ImportResult<&str> {
        self.mapping.get(role)
    }

    /// 绑定角色到列（空串表示取消选择），并同步重算属性候选
    pub fn set(&mut self, role: &str, column: &str) -> ImportResult<()> {
        if !column.is_empty() && !self.columns.is_selectable(column) {
            return Err(ImportError::UnknownColumn(column.to_string()));
        }
        self.mapping.set(role, column)?;
        self.recompute_candidates();
        Ok(())
    }

    /// 附加属性候选 = 可选列（测井仅数值列）− 已绑定列
    pub fn property_candidates(&self) -> &[PropertyColumnSpec] {
        &self.candidates
    }

    /// 修改属性列的类型
    pub fn set_property_type(&mut self, column: &str, property_type: PropertyType) -> ImportResult<()> {
        if !self.columns.is_selectable(column) {
            return Err(ImportError::UnknownColumn(column.to_string()));
        }
        self.type_overrides.insert(column.to_string(), property_type);
        self.recompute_candidates();
        Ok(())
    }

    /// 从候选中挑选要导入的属性列（保持候选顺序）
    ///
    /// 名称不在当前候选集合中时返回 UnknownColumn
    pub fn pick_properties(&self, names: &[&str]) -> ImportResult<Vec<PropertyColumnSpec>> {
        if let Some(missing) = names
            .iter()
            .find(|n| !self.candidates.iter().any(|c| c.name == **n))
        {
            return Err(ImportError::UnknownColumn(missing.to_string()));
        }
        Ok(self
            .candidates
            .iter()
            .filter(|c| names.contains(&c.name.as_str()))
            .cloned()
            .collect())
    }

    pub fn validate(&self) -> ImportResult<()> {
        self.mapping.validate()
    }

    fn recompute_candidates(&mut self) {
        let bound: Vec<&str> = self.mapping.bound_columns().collect();
        let numeric_only = self.mapping.kind() == ImportKind::WellLog;
        let source = if numeric_only {
            &self.columns.numeric
        } else {
            &self.columns.selectable
        };

        self.candidates = source
            .iter()
            .filter(|c| !bound.contains(&c.name.as_str()))
            .map(|c| {
                let default_type = if self.columns.is_numeric(&c.name) {
                    PropertyType::Float
                } else {
                    PropertyType::String
                };
                PropertyColumnSpec {
                    name: c.name.clone(),
                    unit: c.unit.clone(),
                    property_type: self
                        .type_overrides
                        .get(&c.name)
                        .copied()
                        .unwrap_or(default_type),
                }
            })
            .collect();
    }
}

/// 各导入类型的默认绑定
fn default_bindings(kind: ImportKind, columns: &ColumnSet) -> Vec<(Role, String)> {
    let numeric = |i: usize| columns.numeric.get(i).map(|c| c.name.clone());
    let selectable = |i: usize| columns.selectable.get(i).map(|c| c.name.clone());
    let find_numeric = |needle: &str| {
        columns
            .numeric
            .iter()
            .find(|c| c.name.to_lowercase().contains(needle))
            .map(|c| c.name.clone())
    };
    let find_selectable = |needle: &str| {
        columns
            .selectable
            .iter()
            .find(|c| c.name.to_lowercase().contains(needle))
            .map(|c| c.name.clone())
    };

    let candidates: Vec<(Role, Option<String>)> = match kind {
        ImportKind::Point | ImportKind::Line => {
            let id_column = if kind == ImportKind::Point { "gpt_id" } else { "gln_id" };
            vec![
                (Role::Easting, numeric(0)),
                (Role::Northing, numeric(1)),
                (Role::Altitude, numeric(2)),
                (
                    Role::Id,
                    columns.is_selectable(id_column).then(|| id_column.to_string()),
                ),
            ]
        }
        ImportKind::Well => vec![
            (Role::Name, selectable(1)),
            (Role::Easting, numeric(0)),
            (Role::Northing, numeric(1)),
            (Role::Altitude, numeric(2)),
            (Role::TotalDepth, numeric(3)),
        ],
        ImportKind::Property => vec![(Role::Id, find_numeric("id").or_else(|| numeric(0)))],
        ImportKind::WellLog => vec![
            (Role::WellName, find_selectable("name").or_else(|| selectable(0))),
            (Role::Depth, find_numeric("depth").or_else(|| numeric(0))),
        ],
    };

    candidates
        .into_iter()
        .filter_map(|(role, column)| column.map(|c| (role, c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::column_classifier::ColumnInfo;

    fn info(name: &str) -> ColumnInfo {
        ColumnInfo {
            name: name.to_string(),
            unit: String::new(),
        }
    }

    fn columns(selectable: &[&str], numeric: &[&str]) -> ColumnSet {
        ColumnSet {
            selectable: selectable.iter().map(|n| info(n)).collect(),
            numeric: numeric.iter().map(|n| info(n)).collect(),
        }
    }

    #[test]
    fn test_role_names_per_kind() {
        let well = SelectionMapping::new(ImportKind::Well);
        assert_eq!(
            well.role_names(),
            vec![
                "name",
                "short_name",
                "easting",
                "northing",
                "altitude",
                "total_depth",
                "stratigraphy",
                "depth_to",
                "comment"
            ]
        );
        assert_eq!(SelectionMapping::new(ImportKind::Property).role_names(), vec!["id"]);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let mut mapping = SelectionMapping::new(ImportKind::WellLog);
        assert!(matches!(mapping.set("easting", "x"), Err(ImportError::UnknownRole(_))));
        assert!(matches!(mapping.get("nope"), Err(ImportError::UnknownRole(_))));
        assert_eq!(mapping.get("depth").unwrap(), "");
    }

    #[test]
    fn test_candidates_recomputed_on_every_set() {
        let cols = columns(&["e", "n", "z", "kind", "por"], &["e", "n", "z", "por"]);
        let mut sel = ImportSelection::new(ImportKind::Point, cols);
        assert_eq!(sel.property_candidates().len(), 5);

        sel.set("easting", "e").unwrap();
        sel.set("northing", "n").unwrap();
        let names: Vec<&str> = sel.property_candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["z", "kind", "por"]);

        // 重新绑定后旧列回到候选集合
        sel.set("easting", "z").unwrap();
        let names: Vec<&str> = sel.property_candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["e", "kind", "por"]);

        let kind = sel.property_candidates().iter().find(|c| c.name == "kind").unwrap();
        assert_eq!(kind.property_type, PropertyType::String);
    }

    #[test]
    fn test_property_type_override_survives_recompute() {
        let cols = columns(&["id", "a", "b", "c"], &["id", "a", "b", "c"]);
        let mut sel = ImportSelection::new(ImportKind::Property, cols);
        sel.set_property_type("a", PropertyType::Integer).unwrap();
        sel.set("id", "id").unwrap();
        let a = sel.property_candidates().iter().find(|c| c.name == "a").unwrap();
        assert_eq!(a.property_type, PropertyType::Integer);
    }

    #[test]
    fn test_well_log_candidates_are_numeric_only() {
        let cols = columns(&["well", "depth", "gr", "lith"], &["depth", "gr", "x"]);
        let sel = ImportSelection::with_defaults(ImportKind::WellLog, cols);
        assert_eq!(sel.get("depth").unwrap(), "depth");
        let names: Vec<&str> = sel.property_candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["gr", "x"]);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let cols = columns(&["e", "n", "z"], &["e", "n", "z"]);
        let mut sel = ImportSelection::new(ImportKind::Point, cols);
        assert!(matches!(sel.set("easting", "q"), Err(ImportError::UnknownColumn(_))));
        sel.set("easting", "").unwrap();
    }

    #[test]
    fn test_validate_required_roles() {
        let cols = columns(&["name", "e", "n", "z"], &["e", "n", "z"]);
        let mut sel = ImportSelection::new(ImportKind::Well, cols);
        assert!(matches!(sel.validate(), Err(ImportError::MissingRequiredRole(_))));
        sel.set("name", "name").unwrap();
        sel.set("easting", "e").unwrap();
        sel.set("northing", "n").unwrap();
        sel.validate().unwrap();
    }

    #[test]
    fn test_point_defaults() {
        let cols = columns(&["gpt_id", "east", "north", "alt"], &["east", "north", "alt"]);
        let sel = ImportSelection::with_defaults(ImportKind::Point, cols);
        assert_eq!(sel.get("easting").unwrap(), "east");
        assert_eq!(sel.get("northing").unwrap(), "north");
        assert_eq!(sel.get("altitude").unwrap(), "alt");
        assert_eq!(sel.get("id").unwrap(), "gpt_id");
        assert!(sel.property_candidates().is_empty());
    }
}
