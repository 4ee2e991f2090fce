//! Integration tests for sms-cli.
//!
//! Tests cover argument validation and the analyze, info and synth commands
//! run end to end on generated sounds.

use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use sms_io::{WavSpec, read_sound, write_wav};

/// Helper to get the path to the `sms` binary built by cargo.
fn sms_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sms"))
}

fn run(args: &[&str]) -> Output {
    sms_bin().args(args).output().expect("failed to run sms")
}

fn path_str(p: &Path) -> &str {
    p.to_str().expect("temp paths are UTF-8")
}

const PROFILE: &str = r#"
[analysis]
frame_rate = 100
window_periods = 5.0
format = "inharmonic"
tracks = 8
guides = 12
highest_frequency = 3500.0
analysis_delay = 4
min_track_length = 3
stochastic_coefficients = 16
"#;

/// Writes a one second 440 Hz tone at 8 kHz and a profile next to it.
fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let sound = dir.join("tone.wav");
    let samples: Vec<f32> = (0..8000)
        .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / 8000.0).sin())
        .collect();
    write_wav(
        &sound,
        &samples,
        WavSpec {
            sample_rate: 8000,
            ..Default::default()
        },
    )
    .unwrap();
    let profile = dir.join("profile.toml");
    std::fs::write(&profile, PROFILE).unwrap();
    (sound, profile)
}

fn analyze(dir: &Path) -> (PathBuf, PathBuf) {
    let (sound, profile) = fixture(dir);
    let model = dir.join("tone.sms");
    let out = run(&[
        "analyze",
        "--config",
        path_str(&profile),
        path_str(&sound),
        path_str(&model),
    ]);
    assert!(
        out.status.success(),
        "analyze failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    (model, profile)
}

fn header_json(model: &Path) -> serde_json::Value {
    let out = run(&["info", "--json", path_str(model)]);
    assert!(out.status.success(), "info failed");
    serde_json::from_slice(&out.stdout).expect("info --json prints JSON")
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

#[test]
fn synth_rejects_hop_out_of_range() {
    for hop in ["64", "9000", "abc"] {
        let out = run(&["synth", "-h", hop, "in.sms", "out.wav"]);
        assert!(!out.status.success(), "hop {hop} accepted");
        assert_eq!(out.status.code(), Some(2), "hop {hop}");
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("<HOP>"), "hop {hop}: {stderr}");
    }
}

#[test]
fn synth_rejects_unknown_mode_and_method() {
    assert!(!run(&["synth", "-s", "3", "in.sms", "out.wav"]).status.success());
    assert!(!run(&["synth", "-d", "0", "in.sms", "out.wav"]).status.success());
    assert!(!run(&["synth", "-f", "2", "in.sms", "out.wav"]).status.success());
    assert!(!run(&["synth", "-t", "0", "in.sms", "out.wav"]).status.success());
}

#[test]
fn synth_long_help_is_available() {
    let out = run(&["synth", "--help"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("-h <HOP>"), "got: {stdout}");
}

#[test]
fn synth_missing_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&[
        "synth",
        path_str(&dir.path().join("absent.sms")),
        path_str(&dir.path().join("out.wav")),
    ]);
    assert!(!out.status.success());
    assert!(!dir.path().join("out.wav").exists());
}

// ============================================================================
// Analyze and info
// ============================================================================

#[test]
fn analyze_writes_model_with_profile_settings() {
    let dir = tempfile::tempdir().unwrap();
    let (model, _) = analyze(dir.path());
    let header = header_json(&model);
    assert_eq!(header["sample_rate"], 8000);
    assert_eq!(header["frame_rate"], 100);
    assert_eq!(header["hop_size"], 80);
    assert_eq!(header["tracks"], 8);
    assert_eq!(header["format"], "inharmonic");
    assert_eq!(header["stochastic"], "approx");
    assert!(header["frame_count"].as_u64().unwrap() > 50);
}

#[test]
fn analyze_flags_override_profile() {
    let dir = tempfile::tempdir().unwrap();
    let (sound, profile) = fixture(dir.path());
    let model = dir.path().join("noiseless.sms");
    let out = run(&[
        "analyze",
        "--config",
        path_str(&profile),
        "--tracks",
        "4",
        "--stochastic",
        "none",
        path_str(&sound),
        path_str(&model),
    ]);
    assert!(out.status.success());
    let header = header_json(&model);
    assert_eq!(header["tracks"], 4);
    assert_eq!(header["stochastic"], "none");
    assert_eq!(header["stochastic_coefficients"], 0);
}

#[test]
fn analyze_rejects_unknown_window() {
    let dir = tempfile::tempdir().unwrap();
    let (sound, _) = fixture(dir.path());
    let out = run(&[
        "analyze",
        "--window",
        "kaiser",
        path_str(&sound),
        path_str(&dir.path().join("x.sms")),
    ]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("window"));
}

#[test]
fn info_prints_text_summary() {
    let dir = tempfile::tempdir().unwrap();
    let (model, _) = analyze(dir.path());
    let out = run(&["info", path_str(&model)]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Sample Rate: 8000 Hz"), "got: {stdout}");
    assert!(stdout.contains("Tracks:      8"), "got: {stdout}");
}

// ============================================================================
// Synth
// ============================================================================

#[test]
fn synth_output_has_scheduled_length() {
    let dir = tempfile::tempdir().unwrap();
    let (model, _) = analyze(dir.path());
    let frames = header_json(&model)["frame_count"].as_u64().unwrap() as usize;

    let wav = dir.path().join("out.wav");
    let out = run(&["synth", path_str(&model), path_str(&wav)]);
    assert!(
        out.status.success(),
        "synth failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let (samples, rate) = read_sound(&wav).unwrap();
    assert_eq!(rate, 8000);
    assert_eq!(samples.len(), frames * 80);
    assert!(samples.iter().any(|s| s.abs() > 0.1));
}

#[test]
fn synth_time_stretch_and_aiff_output() {
    let dir = tempfile::tempdir().unwrap();
    let (model, _) = analyze(dir.path());
    let frames = header_json(&model)["frame_count"].as_u64().unwrap() as usize;

    let aiff = dir.path().join("slow.snd");
    let out = run(&[
        "synth",
        "-v",
        "-t",
        "2",
        "-h",
        "256",
        "-d",
        "2",
        "-f",
        "1",
        path_str(&model),
        path_str(&aiff),
    ]);
    assert!(
        out.status.success(),
        "synth failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("Tracks:"));
    let bytes = std::fs::read(&aiff).unwrap();
    assert_eq!(&bytes[..4], b"FORM");
    let (samples, _) = read_sound(&aiff).unwrap();
    assert_eq!(samples.len(), frames * 160);
}

#[test]
fn synth_output_rate_and_transpose() {
    let dir = tempfile::tempdir().unwrap();
    let (model, _) = analyze(dir.path());
    let frames = header_json(&model)["frame_count"].as_u64().unwrap() as usize;

    let wav = dir.path().join("up.wav");
    let out = run(&[
        "synth",
        "-r",
        "16000",
        "-x",
        "-12",
        "-s",
        "1",
        "-i",
        "0",
        path_str(&model),
        path_str(&wav),
    ]);
    assert!(
        out.status.success(),
        "synth failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    let (samples, rate) = read_sound(&wav).unwrap();
    assert_eq!(rate, 16000);
    assert_eq!(samples.len(), frames * 160);
}
