mod common;

use std::fs;
use std::sync::atomic::Ordering;

use polyocr::error::PolyOcrError;
use polyocr::models::{BatchResult, EngineKind, EngineSelection, ImageResult};
use polyocr::services::{BatchDriver, COMBINED_FILE_NAME};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

use common::{stub_orchestrator, write_png};

#[tokio::test]
async fn test_batch_writes_one_record_per_image_and_combined_file() {
    let input = TempDir::new().expect("Failed to create temp dir");
    let output = TempDir::new().expect("Failed to create temp dir");
    write_png(&input.path().join("c.png"));
    write_png(&input.path().join("a.png"));
    write_png(&input.path().join("sub").join("b.png"));
    fs::write(input.path().join("README.txt"), "not an image").unwrap();

    let harness = stub_orchestrator(vec![]);
    let out_dir = output.path().join("results");
    let driver = BatchDriver::new(&harness.orchestrator, &out_dir).sorted(true);

    let batch = driver
        .run(input.path(), &EngineSelection::from(EngineKind::Tesseract))
        .await
        .expect("batch should succeed");

    let names: Vec<&str> = batch.images().iter().map(|i| i.image.as_str()).collect();
    assert_eq!(names, vec!["a.png", "c.png", "b.png"]);

    for stem in ["a", "b", "c"] {
        assert!(out_dir.join(format!("{stem}_ocr.json")).exists(), "missing record for {stem}");
    }

    let combined: Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join(COMBINED_FILE_NAME)).unwrap())
            .unwrap();
    let entries = combined.as_array().expect("combined file is an array");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["image"], "a.png");

    let tesseract = &entries[0]["engines"]["tesseract"];
    assert_eq!(tesseract["success"], true);
    assert_eq!(tesseract["text"], "tesseract saw a.png\nsecond line");
    assert_eq!(tesseract["lines"], 2);
    assert_eq!(tesseract["confidence"], 0.5);
    assert!(tesseract.get("error").is_none());

    let reloaded: BatchResult =
        serde_json::from_str(&fs::read_to_string(out_dir.join(COMBINED_FILE_NAME)).unwrap())
            .unwrap();
    assert_eq!(reloaded, batch);

    let single: ImageResult =
        serde_json::from_str(&fs::read_to_string(out_dir.join("b_ocr.json")).unwrap()).unwrap();
    assert_eq!(&single, &batch.images()[2]);
}

#[tokio::test]
async fn test_batch_without_images_writes_nothing() {
    let input = TempDir::new().expect("Failed to create temp dir");
    let output = TempDir::new().expect("Failed to create temp dir");
    fs::write(input.path().join("notes.txt"), "nothing to read").unwrap();

    let harness = stub_orchestrator(vec![]);
    let out_dir = output.path().join("results");
    let driver = BatchDriver::new(&harness.orchestrator, &out_dir);

    let err = driver
        .run(input.path(), &EngineSelection::All)
        .await
        .unwrap_err();

    assert!(matches!(err, PolyOcrError::NoImagesFound(_)));
    assert!(err.is_input_resolution());
    assert!(!out_dir.exists());
    assert_eq!(harness.builds.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_batch_missing_directory() {
    let output = TempDir::new().expect("Failed to create temp dir");
    let harness = stub_orchestrator(vec![]);
    let driver = BatchDriver::new(&harness.orchestrator, output.path().join("results"));

    let err = driver
        .run(&output.path().join("does-not-exist"), &EngineSelection::All)
        .await
        .unwrap_err();

    assert!(matches!(err, PolyOcrError::InputNotFound(_)));
}

#[tokio::test]
async fn test_batch_continues_past_unavailable_engine() {
    let input = TempDir::new().expect("Failed to create temp dir");
    let output = TempDir::new().expect("Failed to create temp dir");
    write_png(&input.path().join("one").join("scan.png"));
    write_png(&input.path().join("two").join("scan.png"));

    let harness = stub_orchestrator(vec![EngineKind::Surya]);
    let driver = BatchDriver::new(&harness.orchestrator, output.path()).sorted(true);
    let selection = EngineSelection::Only(vec![EngineKind::Surya, EngineKind::EasyOcr]);

    let batch = driver.run(input.path(), &selection).await.unwrap();

    assert_eq!(batch.len(), 2);
    for image in batch.images() {
        let surya = image.engines.get(EngineKind::Surya).unwrap();
        assert!(!surya.is_success());
        assert_eq!(
            surya.error(),
            Some("engine not installed: surya sidecar unreachable")
        );
        assert!(image.engines.get(EngineKind::EasyOcr).unwrap().is_success());
    }

    // Both engines built once for the whole batch; only EasyOCR ever ran.
    assert_eq!(harness.builds.load(Ordering::SeqCst), 2);
    assert_eq!(harness.calls.load(Ordering::SeqCst), 2);

    assert!(output.path().join("scan_ocr.json").exists());
    assert!(output.path().join("scan_2_ocr.json").exists());
}
