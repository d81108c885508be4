use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::info;

use crate::config::OcrConfig;
use crate::error::{PolyOcrError, Result};
use crate::models::EngineKind;

use super::adapter::{
    easyocr_lines, paddle_lines, surya_lines, EasyOcrOutput, PaddleOutput, ScoredLine, SuryaPage,
};
use super::provider::{EngineSettings, OcrEngine};

/// Fixed recognition language for the Python engines.
const LANGUAGE: &str = "en";

/// Connection to one Python OCR sidecar.
///
/// `POST {base}/load` places the model on the requested device;
/// `POST {base}/ocr` runs recognition and returns the engine's native JSON.
#[derive(Clone, Debug)]
struct SidecarConnection {
    client: Client,
    base_url: String,
    kind: EngineKind,
}

impl SidecarConnection {
    async fn open(
        kind: EngineKind,
        config: &OcrConfig,
        load_options: Value,
    ) -> Result<Self> {
        let base_url = config
            .sidecar_url(kind)
            .ok_or_else(|| PolyOcrError::EngineUnavailable(format!("{kind} has no sidecar")))?
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.load_timeout_secs))
            .build()
            .map_err(|e| {
                PolyOcrError::EngineUnavailable(format!("Failed to create HTTP client: {e}"))
            })?;

        let connection = Self {
            client,
            base_url,
            kind,
        };
        connection.load(load_options).await?;
        Ok(connection)
    }

    async fn load(&self, options: Value) -> Result<()> {
        let resp = self
            .client
            .post(format!("{}/load", self.base_url))
            .json(&options)
            .send()
            .await
            .map_err(|e| {
                PolyOcrError::EngineUnavailable(format!(
                    "{} sidecar unreachable at {}: {e}",
                    self.kind, self.base_url
                ))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PolyOcrError::EngineUnavailable(format!(
                "{} failed to load: {status} - {body}",
                self.kind
            )));
        }

        info!(engine = %self.kind, url = %self.base_url, "Sidecar model loaded");
        Ok(())
    }

    async fn ocr<T: DeserializeOwned>(&self, image: &Path, mut options: Value) -> Result<T> {
        let bytes = tokio::fs::read(image).await?;
        if let Value::Object(map) = &mut options {
            map.insert("image_base64".to_string(), Value::String(STANDARD.encode(&bytes)));
        }

        let resp = self
            .client
            .post(format!("{}/ocr", self.base_url))
            .header("Content-Type", "application/json")
            .json(&options)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(PolyOcrError::Recognition(format!(
                "{} request failed: {status} - {body}",
                self.kind
            )));
        }

        resp.json().await.map_err(|e| {
            PolyOcrError::Recognition(format!("Failed to parse {} response: {e}", self.kind))
        })
    }
}

#[derive(Clone, Debug)]
pub struct PaddleOcrClient {
    connection: SidecarConnection,
}

impl PaddleOcrClient {
    pub async fn connect(config: &OcrConfig, settings: EngineSettings) -> Result<Self> {
        let options = json!({
            "use_gpu": settings.accelerated,
            "enable_mkldnn": !settings.accelerated,
            "use_angle_cls": true,
            "lang": LANGUAGE,
        });
        let connection = SidecarConnection::open(EngineKind::PaddleOcr, config, options).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl OcrEngine for PaddleOcrClient {
    fn kind(&self) -> EngineKind {
        EngineKind::PaddleOcr
    }

    async fn read_lines(&self, image: &Path) -> Result<Vec<ScoredLine>> {
        let output: PaddleOutput = self.connection.ocr(image, json!({ "cls": true })).await?;
        Ok(paddle_lines(output))
    }
}

#[derive(Clone, Debug)]
pub struct EasyOcrClient {
    connection: SidecarConnection,
}

impl EasyOcrClient {
    pub async fn connect(config: &OcrConfig, settings: EngineSettings) -> Result<Self> {
        let options = json!({
            "gpu": settings.accelerated,
            "quantize": !settings.accelerated,
            "languages": [LANGUAGE],
        });
        let connection = SidecarConnection::open(EngineKind::EasyOcr, config, options).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl OcrEngine for EasyOcrClient {
    fn kind(&self) -> EngineKind {
        EngineKind::EasyOcr
    }

    async fn read_lines(&self, image: &Path) -> Result<Vec<ScoredLine>> {
        let output: EasyOcrOutput = self.connection.ocr(image, json!({ "detail": 1 })).await?;
        Ok(easyocr_lines(output))
    }
}

#[derive(Clone, Debug)]
pub struct SuryaClient {
    connection: SidecarConnection,
}

impl SuryaClient {
    pub async fn connect(config: &OcrConfig, settings: EngineSettings) -> Result<Self> {
        let options = json!({
            "device": if settings.accelerated { "cuda" } else { "cpu" },
            "languages": [LANGUAGE],
        });
        let connection = SidecarConnection::open(EngineKind::Surya, config, options).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl OcrEngine for SuryaClient {
    fn kind(&self) -> EngineKind {
        EngineKind::Surya
    }

    async fn read_lines(&self, image: &Path) -> Result<Vec<ScoredLine>> {
        let pages: Vec<SuryaPage> = self
            .connection
            .ocr(image, json!({ "languages": [LANGUAGE] }))
            .await?;
        Ok(surya_lines(pages))
    }
}
