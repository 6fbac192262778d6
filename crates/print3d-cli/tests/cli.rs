//! End-to-end runs of the `print3d` binary.

use std::path::Path;
use std::process::Command;

use print3d_toolbox::{Mesh, Report, load_mesh, save_mesh};
use tempfile::TempDir;

fn cube(size: f64) -> Mesh {
    let s = size;
    Mesh::from_parts(
        &[
            [0.0, 0.0, 0.0],
            [s, 0.0, 0.0],
            [s, s, 0.0],
            [0.0, s, 0.0],
            [0.0, 0.0, s],
            [s, 0.0, s],
            [s, s, s],
            [0.0, s, s],
        ],
        vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![1, 2, 6, 5],
            vec![2, 3, 7, 6],
            vec![3, 0, 4, 7],
        ],
    )
}

fn print3d(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_print3d"))
        .args(args)
        .output()
        .expect("failed to run print3d")
}

fn write_cube(dir: &Path, name: &str, size: f64) -> String {
    let path = dir.join(name);
    save_mesh(&cube(size), &path).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_info_json() {
    let dir = TempDir::new().unwrap();
    let input = write_cube(dir.path(), "cube.stl", 2.0);

    let out = print3d(&["info", &input, "--format", "json"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["name"], "cube");
    assert_eq!(json["faces"], 12);
    assert!(json["volume"].as_str().unwrap().starts_with("Volume: 8"));
}

#[test]
fn test_check_then_select() {
    let dir = TempDir::new().unwrap();
    let input = write_cube(dir.path(), "cube.stl", 1.0);
    let report_path = dir.path().join("report.json");
    let report_arg = report_path.to_string_lossy().into_owned();

    let out = print3d(&["check", &input, "--only", "overhang", "--report", &report_arg, "-q"]);
    assert!(out.status.success());

    let report = Report::load(&report_path).unwrap();
    assert_eq!(report.object.as_deref(), Some("cube"));
    assert_eq!(report.entries.len(), 1);
    assert!(report.entries[0].message.starts_with("Overhang Face"));

    let out = print3d(&["select", &input, "--report", &report_arg, "--entry", "0", "--format", "json"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["selection"], "elements");
    assert_eq!(json["kind"], "face");
}

#[test]
fn test_unknown_check_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_cube(dir.path(), "cube.stl", 1.0);

    let out = print3d(&["check", &input, "--only", "wobbly"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("wobbly"));
}

#[test]
fn test_scale_to_bounds_writes_outputs() {
    let dir = TempDir::new().unwrap();
    let input = write_cube(dir.path(), "cube.stl", 2.0);
    let out_dir = dir.path().join("scaled");

    let out = print3d(&["scale", &input, "-o", out_dir.to_str().unwrap(), "--bounds", "5", "-q"]);
    assert!(out.status.success());

    let scaled = load_mesh(&out_dir.join("cube.stl")).unwrap();
    let size = scaled.bounding_box().unwrap().extents();
    assert!((size.x - 5.0).abs() < 1e-4);
}

#[test]
fn test_export_relative_to_base_dir() {
    let dir = TempDir::new().unwrap();
    let input = write_cube(dir.path(), "part.stl", 1.0);

    let out = print3d(&["export", &input, "--base-dir", dir.path().to_str().unwrap(), "--format", "json"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let path = json["path"].as_str().unwrap();
    assert!(Path::new(path).exists());
    assert!(path.ends_with("part.stl"));
}
