#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use polyocr::error::{PolyOcrError, Result};
use polyocr::models::EngineKind;
use polyocr::ocr::{
    EngineFactory, EngineRegistry, EngineSettings, ImagePreprocessor, OcrEngine, ScoredLine,
    StaticProbe,
};
use polyocr::services::Orchestrator;

/// Write a small solid PNG so engines have a real file to read.
pub fn write_png(path: &Path) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create fixture directory");
    }
    image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]))
        .save(path)
        .unwrap_or_else(|e| panic!("Failed to write fixture '{}': {e}", path.display()));
    path.to_path_buf()
}

/// Engine that echoes the file name it was handed.
struct EchoEngine {
    kind: EngineKind,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl OcrEngine for EchoEngine {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    async fn read_lines(&self, image: &Path) -> Result<Vec<ScoredLine>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(vec![
            ScoredLine::new(format!("{} saw {name}", self.kind), Some(0.75)),
            ScoredLine::new("   ", Some(0.1)),
            ScoredLine::new("second line", Some(0.25)),
        ])
    }
}

/// Factory whose engines never touch a real OCR backend.
pub struct StubFactory {
    pub missing: Vec<EngineKind>,
    pub builds: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl StubFactory {
    pub fn new(missing: Vec<EngineKind>) -> Self {
        Self {
            missing,
            builds: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl EngineFactory for StubFactory {
    async fn build(&self, kind: EngineKind, _settings: EngineSettings) -> Result<Arc<dyn OcrEngine>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if self.missing.contains(&kind) {
            return Err(PolyOcrError::EngineUnavailable(format!("{kind} sidecar unreachable")));
        }
        Ok(Arc::new(EchoEngine {
            kind,
            calls: Arc::clone(&self.calls),
        }))
    }
}

pub struct TestOrchestrator {
    pub orchestrator: Orchestrator,
    pub builds: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

pub fn stub_orchestrator(missing: Vec<EngineKind>) -> TestOrchestrator {
    let factory = StubFactory::new(missing);
    let builds = Arc::clone(&factory.builds);
    let calls = Arc::clone(&factory.calls);
    let registry = EngineRegistry::with_factory(
        Arc::new(factory),
        Arc::new(StaticProbe(false)),
        EngineKind::ALL.to_vec(),
    );
    TestOrchestrator {
        orchestrator: Orchestrator::new(
            Arc::new(registry),
            ImagePreprocessor::new(),
            Duration::from_secs(5),
        ),
        builds,
        calls,
    }
}
