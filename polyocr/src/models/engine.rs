use serde::{Deserialize, Serialize};

use crate::error::PolyOcrError;

/// The supported OCR backends.
///
/// Adding a backend means adding a variant here plus a shape translator in
/// `ocr::adapter` and a constructor in `ocr::provider`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    PaddleOcr,
    EasyOcr,
    Surya,
    Tesseract,
}

impl EngineKind {
    /// Canonical order, used when expanding the `all` selection.
    pub const ALL: [EngineKind; 4] = [
        EngineKind::PaddleOcr,
        EngineKind::EasyOcr,
        EngineKind::Surya,
        EngineKind::Tesseract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaddleOcr => "paddleocr",
            Self::EasyOcr => "easyocr",
            Self::Surya => "surya",
            Self::Tesseract => "tesseract",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EngineKind {
    type Err = PolyOcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "paddleocr" | "paddle" => Ok(Self::PaddleOcr),
            "easyocr" | "easy" => Ok(Self::EasyOcr),
            "surya" => Ok(Self::Surya),
            "tesseract" | "tess" => Ok(Self::Tesseract),
            _ => Err(PolyOcrError::UnknownEngine(s.to_string())),
        }
    }
}

/// Which engines a caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSelection {
    /// Every engine the registry can construct.
    All,
    /// Exactly these engines, in this order.
    Only(Vec<EngineKind>),
}

impl EngineSelection {
    /// Parses engine names as given on the command line. Any `all` token
    /// wins over explicit names; repeated names keep their first position.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, PolyOcrError> {
        let mut kinds = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case("all") {
                return Ok(Self::All);
            }
            let kind: EngineKind = name.parse()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        if kinds.is_empty() {
            return Err(PolyOcrError::UnknownEngine(
                "no engine selected".to_string(),
            ));
        }

        Ok(Self::Only(kinds))
    }
}

impl From<EngineKind> for EngineSelection {
    fn from(kind: EngineKind) -> Self {
        Self::Only(vec![kind])
    }
}
