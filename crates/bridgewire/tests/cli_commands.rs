#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "bridgewire-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn bridgewire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bridgewire"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("bridgewire should run")
}

fn bridgewire_with_stdin(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_bridgewire"))
        .args(["--log-level", "error"])
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("bridgewire should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin should accept input");
    child.wait_with_output().expect("bridgewire should exit")
}

#[test]
fn version_prints_package_version() {
    let output = bridgewire(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("bridgewire "));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn encode_writes_raw_frame_to_stdout() {
    let output = bridgewire(&["encode", "--type", "request", "--id", "42", "--data", "hello world"]);
    assert!(output.status.success());
    assert_eq!(output.stdout.len(), 25);
    assert_eq!(&output.stdout[..4], b"BRDG");
    assert_eq!(output.stdout[4], 1);
    assert_eq!(output.stdout[5], 0);
    assert_eq!(&output.stdout[6..10], &42u32.to_le_bytes());
    assert_eq!(&output.stdout[14..], b"hello world");
}

#[test]
fn encoded_frame_decodes_from_stdin() {
    let frame = bridgewire(&["encode", "--type", "error", "--id", "7", "--json", "{\"code\":1}"]);
    assert!(frame.status.success());

    let output = bridgewire_with_stdin(&["--format", "json", "decode"], &frame.stdout);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"kind\":\"ERROR\""), "{stdout}");
    assert!(stdout.contains("\"id\":7"), "{stdout}");
    assert!(stdout.contains("\"wire_size\":24"), "{stdout}");
}

#[test]
fn encode_to_file_then_decode_file() {
    let dir = unique_temp_dir("roundtrip");
    let path = dir.join("frame.bin");
    let path_arg = path.to_str().expect("temp path should be UTF-8");

    let encoded = bridgewire(&[
        "--format", "json", "encode", "--type", "binary", "--id", "9", "--data", "blob", "--out", path_arg,
    ]);
    assert!(encoded.status.success());
    let summary = String::from_utf8_lossy(&encoded.stdout);
    assert!(summary.contains("\"wire_size\":18"), "{summary}");

    let decoded = bridgewire(&["--format", "pretty", "decode", path_arg]);
    assert!(decoded.status.success());
    let stdout = String::from_utf8_lossy(&decoded.stdout);
    assert!(stdout.contains("type=BINARY id=9 size=4 payload=blob"), "{stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_rejects_garbage_with_data_invalid() {
    let output = bridgewire_with_stdin(&["decode"], b"definitely not a frame");
    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn decode_rejects_empty_input() {
    let output = bridgewire_with_stdin(&["decode"], b"");
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn loopback_reports_latency() {
    let output = bridgewire(&["--format", "json", "loopback", "--count", "5", "--size", "16"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"count\":5"), "{stdout}");
    assert!(stdout.contains("\"p50_us\""), "{stdout}");
}

#[test]
fn loopback_rejects_bad_timeout_with_usage() {
    let output = bridgewire(&["loopback", "--timeout", "soon"]);
    assert_eq!(output.status.code(), Some(64));
}
