use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use leptess::{LepTess, Variable};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::OcrConfig;
use crate::error::{PolyOcrError, Result};
use crate::models::EngineKind;

use super::adapter::{tesseract_lines, ScoredLine, TesseractTable};
use super::provider::{EngineSettings, OcrEngine};

/// Assume a single uniform block of text.
const PAGE_SEG_MODE: &str = "6";

pub struct TesseractEngine {
    tesseract: Arc<Mutex<LepTess>>,
}

impl TesseractEngine {
    /// Loads the traineddata for the configured languages. Blocking.
    pub fn new(config: &OcrConfig, settings: EngineSettings) -> Result<Self> {
        let mut lt = LepTess::new(
            config.tessdata_prefix.as_deref(),
            &config.tesseract_languages,
        )
        .map_err(|e| PolyOcrError::EngineUnavailable(format!("Tesseract not available: {e}")))?;

        lt.set_variable(Variable::TesseditPagesegMode, PAGE_SEG_MODE)
            .map_err(|e| {
                PolyOcrError::EngineUnavailable(format!("Failed to set page segmentation: {e}"))
            })?;

        // Tesseract has no GPU path; the flag only shows up in the log.
        info!(
            languages = %config.tesseract_languages,
            accelerated = settings.accelerated,
            "Tesseract OCR initialized"
        );

        Ok(Self {
            tesseract: Arc::new(Mutex::new(lt)),
        })
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Tesseract
    }

    async fn read_lines(&self, image: &Path) -> Result<Vec<ScoredLine>> {
        let bytes = tokio::fs::read(image).await?;
        let tesseract = Arc::clone(&self.tesseract);

        let tsv = tokio::task::spawn_blocking(move || {
            let mut lt = tesseract.blocking_lock();
            lt.set_image_from_mem(&bytes)
                .map_err(|e| PolyOcrError::Recognition(format!("Failed to set image: {e}")))?;
            lt.get_tsv_text(0)
                .map_err(|e| PolyOcrError::Recognition(format!("Failed to extract text: {e}")))
        })
        .await
        .map_err(|e| PolyOcrError::Recognition(format!("OCR task panicked: {e}")))??;

        let table = TesseractTable::from_tsv(&tsv)?;
        if table.is_empty() {
            debug!(image = %image.display(), "Tesseract returned no rows");
        }
        Ok(tesseract_lines(&table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tesseract_init_degrades_without_panicking() {
        // Depends on the host install; either outcome is acceptable, but an
        // error must be reported as unavailability.
        match TesseractEngine::new(&OcrConfig::default(), EngineSettings::default()) {
            Ok(engine) => assert_eq!(engine.kind(), EngineKind::Tesseract),
            Err(e) => assert!(matches!(e, PolyOcrError::EngineUnavailable(_))),
        }
    }

    #[test]
    fn test_unknown_language_is_unavailable() {
        let config = OcrConfig {
            tesseract_languages: "zz_not_a_language".to_string(),
            ..OcrConfig::default()
        };
        let result = TesseractEngine::new(&config, EngineSettings::default());
        assert!(matches!(result, Err(PolyOcrError::EngineUnavailable(_))));
    }
}
