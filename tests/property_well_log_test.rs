// ==========================================
// 属性 / 测井曲线导入集成测试
// ==========================================
// 测试目标: 按 id 附加点属性、按井名写入测井值、目标不存在时计警告
// ==========================================

mod test_helpers;

use geological_data_import::importer::ImportOutcome;
use geological_data_import::{GeoPoint, ImportKind, ImportService, Well};
use tempfile::TempDir;
use test_helpers::{
    create_test_db, create_test_store, open_session, prepare_with, run_import, write_import_file,
};

#[test]
fn test_property_import_updates_existing_points() {
    let (_db, db_path) = create_test_db();
    {
        let mut session = open_session(&db_path);
        let mut point = GeoPoint::new(1.0, 2.0, Some(3.0), "");
        point.upsert_property(
            "porosity",
            "%",
            geological_data_import::PropertyType::Float,
            "0.1",
        );
        assert_eq!(session.save_point(&mut point).unwrap(), 1);
        session.close().unwrap();
    }

    let dir = TempDir::new().unwrap();
    let file = write_import_file(
        &dir,
        "props.txt",
        &[
            "id;porosity;perm;rock",
            ";%;mD;",
            "1;0.25;100;sand",
            "99;0.3;120;clay",
            ";;;",
        ],
    );

    let service = ImportService::new(create_test_store(&db_path));
    let prepared = prepare_with(&service, ImportKind::Property, &file, &[]);
    assert_eq!(prepared.selection.get("id").unwrap(), "id");
    let properties = prepared.selection.pick_properties(&["porosity", "rock"]).unwrap();

    // 点 99 不存在: 跳过该行并以警告结束
    let outcome = run_import(&service, prepared, properties);
    assert!(matches!(outcome, ImportOutcome::SucceededWithWarnings(_)), "{:?}", outcome);

    let point = open_session(&db_path).load_point(1).unwrap().unwrap();
    assert_eq!(point.properties.len(), 2);
    let porosity = point.property("porosity").unwrap();
    assert_eq!(porosity.value.parse::<f64>().unwrap(), 0.25);
    assert_eq!(point.property("rock").unwrap().value, "sand");
    assert!(point.property("perm").is_none());
    assert!(point.has_z);
}

fn seed_well(db_path: &str, name: &str) -> i64 {
    let mut session = open_session(db_path);
    let mut well = Well {
        id: None,
        name: name.to_string(),
        short_name: String::new(),
        depth: 100.0,
        easting: 0.0,
        northing: 0.0,
        altitude: 0.0,
        has_z: false,
        reference_system: String::new(),
        markers: Vec::new(),
    };
    let id = session.save_well(&mut well).unwrap();
    session.close().unwrap();
    id
}

#[test]
fn test_well_log_values_upserted_by_depth() {
    let (_db, db_path) = create_test_db();
    let well_id = seed_well(&db_path, "W1");

    let dir = TempDir::new().unwrap();
    let file = write_import_file(
        &dir,
        "logs.txt",
        &[
            "well;depth;gr;res",
            ";m;API;ohm",
            "W1;10;55;2.0",
            "W1;20;60;2.5",
            "W1;10;57;",
            "W9;10;1;1",
        ],
    );

    let service = ImportService::new(create_test_store(&db_path));
    let prepared = prepare_with(&service, ImportKind::WellLog, &file, &[]);
    assert_eq!(prepared.selection.get("well_name").unwrap(), "well");
    assert_eq!(prepared.selection.get("depth").unwrap(), "depth");
    let properties = prepared.selection.property_candidates().to_vec();
    assert_eq!(
        properties.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["gr", "res"]
    );

    // W9 不存在: 计警告
    let outcome = run_import(&service, prepared, properties);
    assert!(matches!(outcome, ImportOutcome::SucceededWithWarnings(_)), "{:?}", outcome);

    let logs = open_session(&db_path).load_well_logs(well_id).unwrap();
    assert_eq!(logs.len(), 2);

    let gr = logs.iter().find(|l| l.name == "gr").unwrap();
    assert_eq!(gr.unit, "API");
    assert_eq!(gr.values.len(), 2);
    let at_10 = gr.values.iter().find(|v| v.depth == 10.0).unwrap();
    assert_eq!(at_10.value, 57.0);

    let res = logs.iter().find(|l| l.name == "res").unwrap();
    assert_eq!(res.values.len(), 2);
    let at_10 = res.values.iter().find(|v| v.depth == 10.0).unwrap();
    assert_eq!(at_10.value, 2.0);
}

#[test]
fn test_well_log_bad_depth_fails() {
    let (_db, db_path) = create_test_db();
    seed_well(&db_path, "W1");

    let dir = TempDir::new().unwrap();
    let file = write_import_file(
        &dir,
        "logs.txt",
        &["well;depth;gr;res", ";m;API;ohm", "W1;10;55;2.0", "W1;deep;60;2.5"],
    );

    let service = ImportService::new(create_test_store(&db_path));
    let prepared = prepare_with(&service, ImportKind::WellLog, &file, &[]);
    let properties = prepared.selection.property_candidates().to_vec();

    assert!(matches!(
        run_import(&service, prepared, properties),
        ImportOutcome::Failed(_)
    ));
}
