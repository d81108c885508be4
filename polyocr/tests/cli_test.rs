use std::process::{Command, Output};

use tempfile::TempDir;

fn polyocr(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_polyocr"))
        .args(args)
        .env_remove("RUST_LOG")
        .env("OCR_ENABLED_ENGINES", "surya")
        .env("SURYA_URL", "http://127.0.0.1:1")
        .env("OCR_LOAD_TIMEOUT_SECS", "2")
        .output()
        .expect("Failed to run polyocr binary")
}

#[test]
fn test_missing_input_exits_nonzero_and_reports_once() {
    let output = polyocr(&["--input", "/no/such/polyocr/page.png"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Input not found").count(), 1, "stderr: {stderr}");
}

#[test]
fn test_input_dir_that_is_a_file_is_input_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let file = dir.path().join("page.png");
    std::fs::write(&file, b"").unwrap();

    let output = polyocr(&["--engine", "surya", "--input-dir", file.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("Not a directory").count(), 1, "stderr: {stderr}");
}

#[test]
fn test_no_input_is_input_error() {
    let output = polyocr(&[]);
    assert_eq!(output.status.code(), Some(2));
}
