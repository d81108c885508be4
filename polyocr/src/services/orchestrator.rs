use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::error::PolyOcrError;
use crate::models::{EngineKind, EngineSelection, ImageResult, RecognitionResult};
use crate::ocr::{recognize, EngineRegistry, ImagePreprocessor};

/// Runs the requested engines against one image.
pub struct Orchestrator {
    registry: Arc<EngineRegistry>,
    preprocessor: ImagePreprocessor,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<EngineRegistry>,
        preprocessor: ImagePreprocessor,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            preprocessor,
            timeout,
        }
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }

    /// Expands `All` to the engines that can actually be constructed.
    pub async fn engines_for(&self, selection: &EngineSelection) -> Vec<EngineKind> {
        match selection {
            EngineSelection::All => self.registry.available().await,
            EngineSelection::Only(kinds) => kinds.clone(),
        }
    }

    /// Processes `path` with every selected engine, in request order.
    ///
    /// Never fails: unavailable engines and recognition errors are recorded
    /// as failed results. A converted temporary image is removed before
    /// this returns.
    pub async fn process(&self, path: &Path, selection: &EngineSelection) -> ImageResult {
        let mut result = ImageResult::new(path);
        let kinds = self.engines_for(selection).await;

        let prepared = self.preprocessor.prepare(path).await;

        for kind in kinds {
            let recognition = match self.registry.resolve(kind).await {
                Ok(engine) => recognize(engine.as_ref(), prepared.path(), self.timeout).await,
                Err(e) => {
                    let reason = match e {
                        PolyOcrError::EngineUnavailable(reason) => reason,
                        other => other.to_string(),
                    };
                    RecognitionResult::failure(
                        kind,
                        format!("engine not installed: {reason}"),
                        Duration::ZERO,
                    )
                }
            };

            info!(
                image = %result.image,
                engine = %kind,
                success = recognition.is_success(),
                lines = recognition.lines(),
                seconds = recognition.processing_time(),
                "Engine finished"
            );
            result.push(recognition);
        }

        drop(prepared);
        result
    }
}
