use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::OcrConfig;
use crate::error::{PolyOcrError, Result};
use crate::models::EngineKind;

use super::adapter::ScoredLine;
use super::api::{EasyOcrClient, PaddleOcrClient, SuryaClient};
use super::tesseract::TesseractEngine;

/// Hardware placement chosen for an engine when it is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineSettings {
    /// Prefer the GPU path; otherwise engines enable their CPU optimizations.
    pub accelerated: bool,
}

/// A constructed, reusable OCR engine.
///
/// Implementations translate their native output into [`ScoredLine`]s with
/// confidences already normalized to `[0, 1]`.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn kind(&self) -> EngineKind;

    async fn read_lines(&self, image: &Path) -> Result<Vec<ScoredLine>>;
}

/// Builds engine handles for the registry.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn build(&self, kind: EngineKind, settings: EngineSettings)
        -> Result<Arc<dyn OcrEngine>>;
}

/// Production factory: HTTP sidecars for the Python engines, leptess for Tesseract.
pub struct BackendFactory {
    config: OcrConfig,
}

impl BackendFactory {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl EngineFactory for BackendFactory {
    async fn build(
        &self,
        kind: EngineKind,
        settings: EngineSettings,
    ) -> Result<Arc<dyn OcrEngine>> {
        let engine: Arc<dyn OcrEngine> = match kind {
            EngineKind::PaddleOcr => Arc::new(PaddleOcrClient::connect(&self.config, settings).await?),
            EngineKind::EasyOcr => Arc::new(EasyOcrClient::connect(&self.config, settings).await?),
            EngineKind::Surya => Arc::new(SuryaClient::connect(&self.config, settings).await?),
            EngineKind::Tesseract => {
                let config = self.config.clone();
                let engine =
                    tokio::task::spawn_blocking(move || TesseractEngine::new(&config, settings))
                        .await
                        .map_err(|e| {
                            PolyOcrError::EngineUnavailable(format!(
                                "Tesseract initialization panicked: {e}"
                            ))
                        })??;
                Arc::new(engine)
            }
        };

        info!(engine = %kind, accelerated = settings.accelerated, "OCR engine ready");
        Ok(engine)
    }
}
