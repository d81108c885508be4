//! OCR engine lifecycle and result normalization.
//!
//! - `EngineRegistry` builds each engine once, on first use, and keeps it
//! - `OcrEngine` is implemented once per `EngineKind`: HTTP sidecars for
//!   PaddleOCR, EasyOCR and Surya (`api`), leptess for Tesseract
//! - `adapter` turns each engine's native output into a `RecognitionResult`
//! - `ImagePreprocessor` converts HEIC/HEIF input to JPEG for the duration
//!   of one call
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = EngineRegistry::new(&config.ocr);
//! let engine = registry.resolve(EngineKind::Tesseract).await?;
//! let result = recognize(engine.as_ref(), path, timeout).await;
//! ```

pub mod adapter;
mod api;
mod capability;
mod preprocessing;
mod provider;
mod registry;
mod tesseract;

pub use adapter::{recognize, ScoredLine};
pub use api::{EasyOcrClient, PaddleOcrClient, SuryaClient};
pub use capability::{CapabilityProbe, StaticProbe, SystemProbe};
pub use preprocessing::{
    is_supported_image, needs_conversion, HeifConvertCommand, HeifDecoder, ImagePreprocessor,
    PreparedImage, CONVERTED_EXTENSIONS, JPEG_QUALITY, NATIVE_EXTENSIONS,
};
#[cfg(feature = "heif")]
pub use preprocessing::LibHeifDecoder;
pub use provider::{BackendFactory, EngineFactory, EngineSettings, OcrEngine};
pub use registry::{EngineRegistry, EngineState};
pub use tesseract::TesseractEngine;
