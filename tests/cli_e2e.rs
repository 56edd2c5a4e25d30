//! End-to-end runs of the compiled binary.

mod common;

use common::{small_config, write_checkpoints, write_config_yaml, write_sine_wav};
use revoice::audio::io::AudioIo;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn cli_converts_a_directory_of_files() {
    let dir = tempdir().expect("tempdir");
    let inputs = dir.path().join("inputs");
    let outputs = dir.path().join("outputs");
    std::fs::create_dir_all(&inputs).expect("mkdir");
    write_sine_wav(&inputs.join("voice.wav"), 300, 48000);

    let config = small_config();
    let config_path = write_config_yaml(dir.path(), &config);
    let (generator_path, f0_path) = write_checkpoints(dir.path(), &config);

    let output = Command::new(env!("CARGO_BIN_EXE_revoice"))
        .args([
            "--inputs",
            inputs.to_str().unwrap(),
            "--outputs",
            outputs.to_str().unwrap(),
            "--config",
            config_path.to_str().unwrap(),
            "--generator-path",
            generator_path.to_str().unwrap(),
            "--f0-estimator-path",
            f0_path.to_str().unwrap(),
            "--chunk",
            "64",
            "--verbose",
        ])
        .output()
        .expect("run binary");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stdout: {stdout}\nstderr: {stderr}");
    assert!(stdout.contains("Complete!"));
    assert!(stdout.contains("Total Valid. Mel loss:"), "stdout: {stdout}");
    // --verbose prints the performance summary on stderr.
    assert!(stderr.contains("Performance summary"), "stderr: {stderr}");

    let converted = outputs.join("0_voice.wav");
    let (decoded, rate) = AudioIo::read_audio(&converted).expect("read output");
    assert_eq!(rate, 48000);
    assert_eq!(decoded[0].len(), 300);
}

#[test]
fn cli_fails_cleanly_when_checkpoints_are_missing() {
    let dir = tempdir().expect("tempdir");
    let inputs = dir.path().join("inputs");
    std::fs::create_dir_all(&inputs).expect("mkdir");
    write_sine_wav(&inputs.join("voice.wav"), 300, 48000);

    let output = Command::new(env!("CARGO_BIN_EXE_revoice"))
        .args([
            "--inputs",
            inputs.to_str().unwrap(),
            "--outputs",
            dir.path().join("outputs").to_str().unwrap(),
            "--generator-path",
            dir.path().join("missing.safetensors").to_str().unwrap(),
        ])
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("generator weights"), "stderr: {stderr}");
}
