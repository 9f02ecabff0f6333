use assert_cmd::Command;
use objtrack::core::PixelRect;
use objtrack::interop::save_frame;
use objtrack::run::RunReport;
use objtrack::{Frame, PixelFormat, TrackingMode};
use predicates::prelude::*;
use std::fs;

fn objtrack() -> Command {
    Command::cargo_bin("objtrack").expect("binary")
}

#[test]
fn init_config_writes_loadable_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out = dir.path().join("run.json");

    objtrack()
        .args(["init-config", "--out"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));

    let raw = fs::read_to_string(&out).expect("config");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["tracker"]["mode"], "marker");
    assert_eq!(value["tracker"]["template"]["accept_threshold"], 0.6);
}

#[test]
fn run_tracks_square_with_contour_fallback() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut frame = Frame::filled(200, 150, PixelFormat::Rgb, 255);
    frame.fill_rect(PixelRect::new(60, 40, 45, 45), 0);
    save_frame(&frame, dir.path().join("f0.png")).expect("save");

    fs::write(
        dir.path().join("run.json"),
        r#"{
            "frames": ["f0.png"],
            "output_dir": "tracked",
            "tracker": {"marker": {"code": {"enabled": false}}}
        }"#,
    )
    .expect("config");

    objtrack()
        .args(["run", "--config"])
        .arg(dir.path().join("run.json"))
        .arg("--report")
        .arg(dir.path().join("report.json"))
        .assert()
        .success()
        .stderr(predicate::str::contains("1/1 frames tracked"));

    let raw = fs::read_to_string(dir.path().join("report.json")).expect("report");
    let report: RunReport = serde_json::from_str(&raw).expect("report json");
    assert_eq!(report.mode, TrackingMode::Marker);
    assert_eq!(report.stages, vec!["contour".to_string()]);
    assert!(report.frames[0].result.is_found());
    assert!(dir.path().join("tracked").join("f0_tracked.png").exists());
}

#[test]
fn mode_flag_overrides_config_and_prints_report() {
    let dir = tempfile::tempdir().expect("tempdir");
    save_frame(
        &Frame::filled(100, 100, PixelFormat::Gray, 90),
        dir.path().join("f0.png"),
    )
    .expect("save");
    fs::write(dir.path().join("run.json"), r#"{"frames": ["f0.png"]}"#).expect("config");

    objtrack()
        .args(["run", "--mode", "sam2", "--config"])
        .arg(dir.path().join("run.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"mode\": \"segmentation\""));
}

#[test]
fn unknown_mode_is_rejected() {
    objtrack()
        .args(["run", "--config", "whatever.json", "--mode", "orb"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown tracking mode"));
}

#[test]
fn missing_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    objtrack()
        .args(["run", "--config"])
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure();
}
