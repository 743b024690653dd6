pub mod test_utils;
use crate::test_utils::{synthetic_track, write_heatmap_config, SAMPLE_GPX, SAMPLE_TCX};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempdir::TempDir;
use track_viz::export_data;

fn track_viz(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_track-viz"))
        .args(args)
        .output()
        .unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn no_command_prints_help() {
    let output = track_viz(&[]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("gpx-to-csv"));

    let output = track_viz(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));

    assert!(!track_viz(&["bogus"]).status.success());
}

#[test]
fn convert_to_csv() {
    let dir = TempDir::new("track-viz").unwrap();
    let gpx_csv = dir.path().join("gpx.csv");
    let tcx_csv = dir.path().join("tcx.csv");

    let output = track_viz(&["gpx-to-csv", "--gpx", SAMPLE_GPX, "--to", path_str(&gpx_csv)]);
    assert!(output.status.success(), "{output:?}");
    let output = track_viz(&["tcx-to-csv", "--tcx", SAMPLE_TCX, "--to", path_str(&tcx_csv)]);
    assert!(output.status.success(), "{output:?}");

    assert_eq!(export_data::load_track_csv(&gpx_csv).unwrap().len(), 5);
    let tcx = fs::read_to_string(&tcx_csv).unwrap();
    assert!(tcx.starts_with("time,lat,lon,alt,bpm"));
}

#[test]
fn missing_input_file() {
    let dir = TempDir::new("track-viz").unwrap();
    let to = dir.path().join("out.csv");
    let output = track_viz(&["gpx-to-csv", "--gpx", "./tests/data/nothing.gpx", "--to", path_str(&to)]);
    assert!(!output.status.success());
    assert!(!to.exists());
}

#[test]
fn charts_and_tables() {
    let dir = TempDir::new("track-viz").unwrap();
    let csv = dir.path().join("track.csv");
    export_data::save_track_csv(&synthetic_track(40, Some((20, 5))), &csv).unwrap();
    let track = path_str(&csv);

    for (command, out) in [
        ("speed", "speed.svg"),
        ("speed-moving", "speed_moving.png"),
        ("acceleration", "acceleration.svg"),
    ] {
        let img = dir.path().join(out);
        let output = track_viz(&[command, "--track", track, "--img", path_str(&img)]);
        assert!(output.status.success(), "{command}: {output:?}");
        assert!(img.exists(), "{command}");
    }

    let movements = dir.path().join("movements.csv");
    let output = track_viz(&["movements", "--track", track, "--to", path_str(&movements)]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(fs::read_to_string(&movements).unwrap().lines().count(), 39);

    let pace = dir.path().join("pace.json");
    let output = track_viz(&["-v", "pace", "--track", track, "--to", path_str(&pace)]);
    assert!(output.status.success(), "{output:?}");
    let spec: serde_json::Value = serde_json::from_str(&fs::read_to_string(&pace).unwrap()).unwrap();
    assert!(spec["layer"].is_array());
}

#[test]
fn heatmap_image() {
    let dir = TempDir::new("track-viz").unwrap();
    let config = write_heatmap_config(dir.path(), 200, 100, "");
    let csv = dir.path().join("track.csv");
    export_data::save_track_csv(&synthetic_track(60, None), &csv).unwrap();
    let img = dir.path().join("heatmap.png");
    let logs = dir.path().join("logs");

    let output = track_viz(&[
        "--log-dir",
        path_str(&logs),
        "heatmap",
        "--track",
        path_str(&csv),
        "--config",
        path_str(&config),
        "--img",
        path_str(&img),
    ]);
    assert!(output.status.success(), "{output:?}");
    let saved = image::open(&img).unwrap();
    assert_eq!((saved.width(), saved.height()), (200, 100));
    assert!(logs.join("track-viz.log").exists());
}
