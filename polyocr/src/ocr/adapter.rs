//! Translation of native engine output into [`RecognitionResult`]s.
//!
//! Each engine reports lines and confidences in its own shape. The
//! translators here turn those shapes into [`ScoredLine`]s on a common
//! `[0, 1]` confidence scale; [`recognize`] then applies one line policy
//! (trim, drop blank lines) and averages the confidences.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{PolyOcrError, Result};
use crate::models::RecognitionResult;

use super::provider::OcrEngine;

/// Tesseract reports confidences in `[0, 100]`.
const TESSERACT_SCALE: f64 = 100.0;
/// Tesseract's TSV row level for a single word.
const TESSERACT_WORD_LEVEL: i32 = 5;

/// One recognized line. `confidence` is in `[0, 1]`, or `None` when the
/// engine flagged the entry as carrying no detection.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredLine {
    pub text: String,
    pub confidence: Option<f64>,
}

impl ScoredLine {
    pub fn new(text: impl Into<String>, confidence: Option<f64>) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Maps a raw score on `[0, scale]` to `[0, 1]`. Negative or non-finite
/// scores are the engines' "no detection" sentinels and yield `None`.
pub fn normalize_confidence(raw: f64, scale: f64) -> Option<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return None;
    }
    Some((raw / scale).clamp(0.0, 1.0))
}

/// Four corner points of a detection box.
pub type Quad = Vec<[f64; 2]>;

/// PaddleOCR output: one entry per page, each a list of `[box, [text, score]]`.
/// A page without detections comes back as `null`.
pub type PaddleOutput = Vec<Option<Vec<(Quad, (String, f64))>>>;

/// EasyOCR output: a flat list of `[box, text, score]`.
pub type EasyOcrOutput = Vec<(Quad, String, f64)>;

/// Surya output: one prediction object per page.
#[derive(Debug, Clone, Deserialize)]
pub struct SuryaPage {
    #[serde(default)]
    pub text_lines: Vec<SuryaLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuryaLine {
    pub text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub bbox: Vec<f64>,
}

pub fn paddle_lines(output: PaddleOutput) -> Vec<ScoredLine> {
    output
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_default()
        .into_iter()
        .map(|(_quad, (text, score))| ScoredLine::new(text, normalize_confidence(score, 1.0)))
        .collect()
}

pub fn easyocr_lines(output: EasyOcrOutput) -> Vec<ScoredLine> {
    output
        .into_iter()
        .map(|(_quad, text, score)| ScoredLine::new(text, normalize_confidence(score, 1.0)))
        .collect()
}

pub fn surya_lines(pages: Vec<SuryaPage>) -> Vec<ScoredLine> {
    pages
        .into_iter()
        .flat_map(|page| page.text_lines)
        .map(|line| {
            let confidence = line
                .confidence
                .and_then(|score| normalize_confidence(score, 1.0));
            ScoredLine::new(line.text, confidence)
        })
        .collect()
}

/// Tesseract's word table, one column per TSV field we use.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TesseractTable {
    pub level: Vec<i32>,
    pub page_num: Vec<i32>,
    pub block_num: Vec<i32>,
    pub par_num: Vec<i32>,
    pub line_num: Vec<i32>,
    pub conf: Vec<f64>,
    pub text: Vec<String>,
}

impl TesseractTable {
    /// Parses `level page block par line word left top width height conf text`
    /// rows. A header row, if present, is skipped.
    pub fn from_tsv(tsv: &str) -> Result<Self> {
        let mut table = Self::default();

        for (index, row) in tsv.lines().enumerate() {
            if row.trim().is_empty() || row.starts_with("level") {
                continue;
            }
            let fields: Vec<&str> = row.splitn(12, '\t').collect();
            if fields.len() < 11 {
                return Err(PolyOcrError::Recognition(format!(
                    "Malformed Tesseract TSV row {}: expected 12 fields, got {}",
                    index + 1,
                    fields.len()
                )));
            }

            let int = |i: usize| -> Result<i32> {
                fields[i].trim().parse().map_err(|e| {
                    PolyOcrError::Recognition(format!(
                        "Malformed Tesseract TSV row {}: {e}",
                        index + 1
                    ))
                })
            };
            let conf: f64 = fields[10].trim().parse().map_err(|e| {
                PolyOcrError::Recognition(format!(
                    "Malformed Tesseract confidence on row {}: {e}",
                    index + 1
                ))
            })?;

            table.level.push(int(0)?);
            table.page_num.push(int(1)?);
            table.block_num.push(int(2)?);
            table.par_num.push(int(3)?);
            table.line_num.push(int(4)?);
            table.conf.push(conf);
            table
                .text
                .push(fields.get(11).map(|t| t.to_string()).unwrap_or_default());
        }

        Ok(table)
    }

    /// Number of rows parsed.
    pub fn len(&self) -> usize {
        self.level.len()
    }

    pub fn is_empty(&self) -> bool {
        self.level.is_empty()
    }
}

/// Groups word rows into lines by `(page, block, paragraph, line)` in
/// reading order. A line's confidence is the mean of its words' scores,
/// skipping the `-1` sentinel.
pub fn tesseract_lines(table: &TesseractTable) -> Vec<ScoredLine> {
    let mut lines: Vec<((i32, i32, i32, i32), Vec<&str>, Vec<f64>)> = Vec::new();

    for i in 0..table.len() {
        if table.level[i] != TESSERACT_WORD_LEVEL {
            continue;
        }
        let word = table.text[i].trim();
        if word.is_empty() {
            continue;
        }

        let key = (
            table.page_num[i],
            table.block_num[i],
            table.par_num[i],
            table.line_num[i],
        );
        let entry = match lines.iter().position(|(k, _, _)| *k == key) {
            Some(pos) => &mut lines[pos],
            None => {
                lines.push((key, Vec::new(), Vec::new()));
                let last = lines.len() - 1;
                &mut lines[last]
            }
        };

        entry.1.push(word);
        if let Some(score) = normalize_confidence(table.conf[i], TESSERACT_SCALE) {
            entry.2.push(score);
        }
    }

    lines
        .into_iter()
        .map(|(_, words, scores)| ScoredLine::new(words.join(" "), mean(&scores)))
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Joined text, mean confidence and line count after trimming and dropping
/// blank lines.
pub fn summarize_lines(lines: Vec<ScoredLine>) -> (String, Option<f64>, usize) {
    let kept: Vec<ScoredLine> = lines
        .into_iter()
        .filter_map(|line| {
            let text = line.text.trim();
            (!text.is_empty()).then(|| ScoredLine::new(text, line.confidence))
        })
        .collect();

    let scores: Vec<f64> = kept.iter().filter_map(|line| line.confidence).collect();
    let text = kept
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    (text, mean(&scores), kept.len())
}

/// Runs `engine` on `image` and normalizes the outcome. Engine errors and
/// timeouts become failed results carrying the elapsed time.
///
/// A timeout only stops waiting. Work an engine has already handed to a
/// blocking thread (Tesseract) runs to completion and keeps holding that
/// engine's lock, so later calls to the same engine queue behind it and
/// their elapsed time includes the wait.
pub async fn recognize(engine: &dyn OcrEngine, image: &Path, timeout: Duration) -> RecognitionResult {
    let kind = engine.kind();
    let started = Instant::now();

    match tokio::time::timeout(timeout, engine.read_lines(image)).await {
        Ok(Ok(lines)) => {
            let (text, confidence, count) = summarize_lines(lines);
            debug!(engine = %kind, lines = count, "Recognition finished");
            RecognitionResult::success(kind, text, confidence, count, started.elapsed())
        }
        Ok(Err(e)) => {
            warn!(engine = %kind, image = %image.display(), "Recognition failed: {}", e);
            RecognitionResult::failure(kind, e.to_string(), started.elapsed())
        }
        Err(_) => {
            let reason = format!("timed out after {:.3} seconds", timeout.as_secs_f64());
            warn!(engine = %kind, image = %image.display(), "Recognition {}", reason);
            RecognitionResult::failure(kind, reason, started.elapsed())
        }
    }
}
