use std::env;
use std::path::PathBuf;

use crate::models::EngineKind;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt(var: &str) -> Option<String> {
    env::var(var).ok().filter(|val| !val.trim().is_empty())
}

/// Parse `OCR_ENABLED_ENGINES`.
/// Format: comma-separated engine names, e.g. `tesseract,paddleocr`. Unset means every engine.
fn parse_enabled_engines() -> Vec<EngineKind> {
    match env::var("OCR_ENABLED_ENGINES") {
        Ok(val) if !val.trim().is_empty() => {
            let mut kinds = Vec::new();
            for name in val.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                match name.parse::<EngineKind>() {
                    Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
                    Ok(_) => {}
                    Err(_) => tracing::warn!(
                        "Unknown engine '{}' in OCR_ENABLED_ENGINES, skipping",
                        name
                    ),
                }
            }
            kinds
        }
        _ => EngineKind::ALL.to_vec(),
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ocr: OcrConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Engines the registry may construct; others resolve as unavailable.
    pub enabled_engines: Vec<EngineKind>,
    pub paddleocr_url: String,
    pub easyocr_url: String,
    pub surya_url: String,
    pub tesseract_languages: String,
    pub tessdata_prefix: Option<String>,
    /// Upper bound for a single recognition call.
    pub timeout_secs: u64,
    /// Upper bound for loading a sidecar model, which may download weights.
    pub load_timeout_secs: u64,
    pub force_cpu: bool,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled_engines: EngineKind::ALL.to_vec(),
            paddleocr_url: "http://127.0.0.1:8866".to_string(),
            easyocr_url: "http://127.0.0.1:8867".to_string(),
            surya_url: "http://127.0.0.1:8868".to_string(),
            tesseract_languages: "eng".to_string(),
            tessdata_prefix: None,
            timeout_secs: 300,
            load_timeout_secs: 600,
            force_cpu: false,
        }
    }
}

impl OcrConfig {
    /// Base URL of the HTTP sidecar serving `kind`, if it is served over HTTP.
    pub fn sidecar_url(&self, kind: EngineKind) -> Option<&str> {
        match kind {
            EngineKind::PaddleOcr => Some(&self.paddleocr_url),
            EngineKind::EasyOcr => Some(&self.easyocr_url),
            EngineKind::Surya => Some(&self.surya_url),
            EngineKind::Tesseract => None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = OcrConfig::default();
        Self {
            ocr: OcrConfig {
                enabled_engines: parse_enabled_engines(),
                paddleocr_url: env::var("PADDLEOCR_URL").unwrap_or(defaults.paddleocr_url),
                easyocr_url: env::var("EASYOCR_URL").unwrap_or(defaults.easyocr_url),
                surya_url: env::var("SURYA_URL").unwrap_or(defaults.surya_url),
                tesseract_languages: env::var("TESSERACT_LANGUAGES")
                    .unwrap_or(defaults.tesseract_languages),
                tessdata_prefix: parse_env_opt("TESSDATA_PREFIX"),
                timeout_secs: parse_env_or("OCR_TIMEOUT_SECS", defaults.timeout_secs),
                load_timeout_secs: parse_env_or(
                    "OCR_LOAD_TIMEOUT_SECS",
                    defaults.load_timeout_secs,
                ),
                force_cpu: parse_env_or("OCR_FORCE_CPU", defaults.force_cpu),
            },
            output: OutputConfig {
                dir: env::var("OCR_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("ocr_results")),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
