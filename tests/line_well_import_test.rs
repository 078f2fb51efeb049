// ==========================================
// 折线 / 钻井导入集成测试
// ==========================================
// 测试目标: 折线分组与闭合、按 id 替换折线点、钻井标记整体替换
// ==========================================

mod test_helpers;

use geological_data_import::importer::ImportOutcome;
use geological_data_import::{ImportKind, ImportService};
use tempfile::TempDir;
use test_helpers::{
    create_test_db, create_test_store, open_session, prepare_with, run_import, write_import_file,
};

#[test]
fn test_closed_line_drops_duplicate_end_point() {
    let (_db, db_path) = create_test_db();
    let dir = TempDir::new().unwrap();
    let file = write_import_file(
        &dir,
        "ring.txt",
        &["e;n;z", "m;m;m", "0;0;1", "1;0;1", "1;1;1", "0;0;1"],
    );

    let service = ImportService::new(create_test_store(&db_path));
    let prepared = service.prepare(ImportKind::Line, &file, None).unwrap();
    assert_eq!(run_import(&service, prepared, Vec::new()), ImportOutcome::Succeeded);

    let line = open_session(&db_path).load_line(1).unwrap().expect("折线应存在");
    assert!(line.closed);
    assert_eq!(line.points.len(), 3);
    assert_eq!(line.points[1].easting, 1.0);
    assert_eq!(line.points[2].northing, 1.0);
}

#[test]
fn test_blank_rows_split_lines() {
    let (_db, db_path) = create_test_db();
    let dir = TempDir::new().unwrap();
    let file = write_import_file(
        &dir,
        "lines.txt",
        &["e;n;z", "m;m;m", "0;0;0", "1;1;0", ";;", "5;5;0", "6;6;0", "7;7;0"],
    );

    let service = ImportService::new(create_test_store(&db_path));
    let prepared = service.prepare(ImportKind::Line, &file, None).unwrap();
    assert_eq!(run_import(&service, prepared, Vec::new()), ImportOutcome::Succeeded);

    let mut session = open_session(&db_path);
    let first = session.load_line(1).unwrap().unwrap();
    let second = session.load_line(2).unwrap().unwrap();
    assert_eq!(first.points.len(), 2);
    assert_eq!(second.points.len(), 3);
    assert!(!first.closed);
    assert_eq!(second.points[0].easting, 5.0);

    // 未绑定 set_name 时折线名为空，不用分组编号代替
    assert_eq!(first.name, "");
    assert_eq!(second.name, "");
}

const LINE_BINDINGS: [(&str, &str); 3] = [("easting", "e"), ("northing", "n"), ("altitude", "z")];

#[test]
fn test_existing_line_points_replaced() {
    let (_db, db_path) = create_test_db();
    let dir = TempDir::new().unwrap();
    let service = ImportService::new(create_test_store(&db_path));

    let first = write_import_file(
        &dir,
        "v1.txt",
        &["gln_id;e;n;z", ";m;m;m", "1;0;0;0", "1;1;0;0", "1;2;0;0"],
    );
    // gln_id 本身是数值列，坐标需显式绑定
    let prepared = prepare_with(&service, ImportKind::Line, &first, &LINE_BINDINGS);
    assert_eq!(prepared.selection.get("id").unwrap(), "gln_id");
    assert_eq!(run_import(&service, prepared, Vec::new()), ImportOutcome::Succeeded);

    let second = write_import_file(
        &dir,
        "v2.txt",
        &["gln_id;e;n;z", ";m;m;m", "1;9;9;9", "1;8;8;8"],
    );
    let prepared = prepare_with(&service, ImportKind::Line, &second, &LINE_BINDINGS);
    assert_eq!(run_import(&service, prepared, Vec::new()), ImportOutcome::Succeeded);

    let mut session = open_session(&db_path);
    let line = session.load_line(1).unwrap().unwrap();
    assert_eq!(line.points.len(), 2);
    assert_eq!(line.points[0].easting, 9.0);
    assert!(line.points.iter().all(|p| p.has_z));
    assert!(session.load_line(2).unwrap().is_none());
}

const WELL_HEADER: [&str; 2] = ["well;east;north;alt;td;strat;depth_to", ";m;m;m;m;;m"];

fn well_file(dir: &TempDir, name: &str, rows: &[&str]) -> std::path::PathBuf {
    let lines: Vec<&str> = WELL_HEADER.iter().chain(rows.iter()).copied().collect();
    test_helpers::write_import_file(dir, name, &lines)
}

const WELL_BINDINGS: [(&str, &str); 7] = [
    ("name", "well"),
    ("easting", "east"),
    ("northing", "north"),
    ("altitude", "alt"),
    ("total_depth", "td"),
    ("stratigraphy", "strat"),
    ("depth_to", "depth_to"),
];

#[test]
fn test_well_markers_replaced_on_reimport() {
    let (_db, db_path) = create_test_db();
    let dir = TempDir::new().unwrap();
    let service = ImportService::new(create_test_store(&db_path));

    let first = well_file(
        &dir,
        "wells_v1.txt",
        &["W1;100;200;50;300;A;10", "W1;100;200;50;300;B;20"],
    );
    let prepared = prepare_with(&service, ImportKind::Well, &first, &WELL_BINDINGS);
    assert_eq!(prepared.selection.get("total_depth").unwrap(), "td");
    assert_eq!(run_import(&service, prepared, Vec::new()), ImportOutcome::Succeeded);

    let well = open_session(&db_path).load_well_by_name("W1").unwrap().unwrap();
    assert_eq!(well.markers.len(), 2);
    assert_eq!(well.markers[0].horizon.as_ref().unwrap().name, "A");
    assert_eq!(well.markers[1].depth, 20.0);

    // 第二次导入不带高程：标记整体替换，高程保留
    let second = well_file(&dir, "wells_v2.txt", &["W1;101;201;;300;C;30"]);
    let prepared = prepare_with(&service, ImportKind::Well, &second, &WELL_BINDINGS);
    assert_eq!(run_import(&service, prepared, Vec::new()), ImportOutcome::Succeeded);

    let well = open_session(&db_path).load_well_by_name("W1").unwrap().unwrap();
    assert_eq!(well.markers.len(), 1);
    assert_eq!(well.markers[0].horizon.as_ref().unwrap().name, "C");
    assert_eq!(well.markers[0].depth, 30.0);
    assert_eq!(well.easting, 101.0);
    assert_eq!(well.altitude, 50.0);
    assert!(well.has_z);
}

#[test]
fn test_marker_below_total_depth_fails() {
    let (_db, db_path) = create_test_db();
    let dir = TempDir::new().unwrap();
    let service = ImportService::new(create_test_store(&db_path));

    let file = well_file(&dir, "deep.txt", &["W2;1;2;3;15;A;10", "W2;1;2;3;15;B;20"]);
    let prepared = prepare_with(&service, ImportKind::Well, &file, &WELL_BINDINGS);

    match run_import(&service, prepared, Vec::new()) {
        ImportOutcome::Failed(message) => assert!(message.contains("W2"), "{}", message),
        other => panic!("应失败: {:?}", other),
    }
    assert!(open_session(&db_path).load_well_by_name("W2").unwrap().is_none());
}
