use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::models::{EngineKind, ImageResult};

const RULE_WIDTH: usize = 50;

/// Writes `value` as indented JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Hands out per-image record file names, `<stem>_ocr.json`, adding a
/// counter when a name has already been issued. Issued names never repeat,
/// even when a later stem looks like an earlier suffixed one.
#[derive(Debug, Default)]
pub struct RecordNamer {
    next_suffix: HashMap<String, usize>,
    issued: HashSet<String>,
}

impl RecordNamer {
    pub fn name_for(&mut self, image_path: &Path) -> String {
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut name = format!("{stem}_ocr.json");
        if self.issued.contains(&name) {
            let suffix = self.next_suffix.entry(stem.clone()).or_insert(2);
            loop {
                name = format!("{stem}_{suffix}_ocr.json");
                *suffix += 1;
                if !self.issued.contains(&name) {
                    break;
                }
            }
        }

        self.issued.insert(name.clone());
        name
    }
}

/// Console rendering of one image's results.
pub fn summarize(result: &ImageResult) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "RESULTS: {}", result.image);
    let _ = writeln!(out, "{rule}");

    for (kind, recognition) in result.engines.iter() {
        let _ = writeln!(out, "\n[{}]", kind.as_str().to_uppercase());
        match recognition.error() {
            Some(reason) => {
                let _ = writeln!(out, "FAILED: {reason}");
            }
            None => {
                if !recognition.text().is_empty() {
                    let _ = writeln!(out, "{}", recognition.text());
                }
                let confidence = recognition
                    .confidence()
                    .map(|c| format!("{:.1}%", c * 100.0))
                    .unwrap_or_else(|| "n/a".to_string());
                let _ = writeln!(
                    out,
                    "\n({} lines, confidence {}, {:.3}s)",
                    recognition.lines(),
                    confidence,
                    recognition.processing_time()
                );
            }
        }
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
    }

    out
}

/// The engine availability listing printed at startup.
pub fn availability_banner(available: &[EngineKind]) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    for kind in EngineKind::ALL {
        if available.contains(&kind) {
            let _ = writeln!(out, "✓ {kind} available");
        } else {
            let _ = writeln!(out, "✗ {kind} not installed");
        }
    }
    let _ = writeln!(out, "{rule}");
    out
}
