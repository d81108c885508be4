use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::EngineKind;

/// Decimal places kept for confidence values.
pub const CONFIDENCE_PRECISION: i32 = 4;
/// Decimal places kept for processing times, in seconds.
pub const TIMING_PRECISION: i32 = 3;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionStatus {
    Success,
    Failure(String),
}

/// Normalized output of one engine for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "RecognitionRecord", from = "RecognitionRecord")]
pub struct RecognitionResult {
    engine: EngineKind,
    text: String,
    confidence: Option<f64>,
    lines: usize,
    processing_time: f64,
    status: RecognitionStatus,
}

impl RecognitionResult {
    pub fn success(
        engine: EngineKind,
        text: String,
        confidence: Option<f64>,
        lines: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            engine,
            text,
            confidence: confidence.map(|c| round_to(c.clamp(0.0, 1.0), CONFIDENCE_PRECISION)),
            lines,
            processing_time: round_to(elapsed.as_secs_f64(), TIMING_PRECISION),
            status: RecognitionStatus::Success,
        }
    }

    pub fn failure(engine: EngineKind, reason: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            engine,
            text: String::new(),
            confidence: None,
            lines: 0,
            processing_time: round_to(elapsed.as_secs_f64(), TIMING_PRECISION),
            status: RecognitionStatus::Failure(reason.into()),
        }
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn processing_time(&self) -> f64 {
        self.processing_time
    }

    pub fn status(&self) -> &RecognitionStatus {
        &self.status
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, RecognitionStatus::Success)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            RecognitionStatus::Success => None,
            RecognitionStatus::Failure(reason) => Some(reason),
        }
    }
}

/// On-disk shape of a [`RecognitionResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecognitionRecord {
    engine: EngineKind,
    text: String,
    confidence: Option<f64>,
    lines: usize,
    processing_time: f64,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl From<RecognitionResult> for RecognitionRecord {
    fn from(result: RecognitionResult) -> Self {
        let (success, error) = match result.status {
            RecognitionStatus::Success => (true, None),
            RecognitionStatus::Failure(reason) => (false, Some(reason)),
        };
        Self {
            engine: result.engine,
            text: result.text,
            confidence: result.confidence,
            lines: result.lines,
            processing_time: result.processing_time,
            success,
            error,
        }
    }
}

impl From<RecognitionRecord> for RecognitionResult {
    fn from(record: RecognitionRecord) -> Self {
        let status = if record.success {
            RecognitionStatus::Success
        } else {
            RecognitionStatus::Failure(record.error.unwrap_or_default())
        };
        Self {
            engine: record.engine,
            text: record.text,
            confidence: record.confidence,
            lines: record.lines,
            processing_time: record.processing_time,
            status,
        }
    }
}

/// Per-engine results keyed by engine, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineResults(Vec<(EngineKind, RecognitionResult)>);

impl EngineResults {
    pub fn get(&self, kind: EngineKind) -> Option<&RecognitionResult> {
        self.0.iter().find(|(k, _)| *k == kind).map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EngineKind, &RecognitionResult)> {
        self.0.iter().map(|(k, r)| (k, r))
    }

    pub fn keys(&self) -> impl Iterator<Item = EngineKind> + '_ {
        self.0.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replaces an existing entry for the same engine in place.
    fn insert(&mut self, result: RecognitionResult) {
        let kind = result.engine();
        match self.0.iter_mut().find(|(k, _)| *k == kind) {
            Some(slot) => slot.1 = result,
            None => self.0.push((kind, result)),
        }
    }
}

impl Serialize for EngineResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (kind, result) in &self.0 {
            map.serialize_entry(kind, result)?;
        }
        map.end()
    }
}

struct EngineResultsVisitor(PhantomData<EngineResults>);

impl<'de> Visitor<'de> for EngineResultsVisitor {
    type Value = EngineResults;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of engine name to recognition result")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut results = EngineResults::default();
        while let Some((kind, result)) = access.next_entry::<EngineKind, RecognitionResult>()? {
            if kind != result.engine() {
                return Err(serde::de::Error::custom(format!(
                    "result for {} stored under key {}",
                    result.engine(),
                    kind
                )));
            }
            results.insert(result);
        }
        Ok(results)
    }
}

impl<'de> Deserialize<'de> for EngineResults {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EngineResultsVisitor(PhantomData))
    }
}

/// All engine results for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageResult {
    pub image: String,
    pub image_path: PathBuf,
    pub engines: EngineResults,
}

impl ImageResult {
    pub fn new(image_path: &Path) -> Self {
        let image = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| image_path.display().to_string());

        Self {
            image,
            image_path: image_path.to_path_buf(),
            engines: EngineResults::default(),
        }
    }

    pub fn push(&mut self, result: RecognitionResult) {
        self.engines.insert(result);
    }
}

/// Results for every image of a batch, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchResult {
    images: Vec<ImageResult>,
}

impl BatchResult {
    pub fn push(&mut self, image: ImageResult) {
        self.images.push(image);
    }

    pub fn images(&self) -> &[ImageResult] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
