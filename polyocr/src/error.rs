use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolyOcrError {
    #[error("No input specified: pass --input <FILE> or --input-dir <DIR>")]
    NoInput,

    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("No images found in {}", .0.display())]
    NoImagesFound(PathBuf),

    #[error("Unknown engine: {0}")]
    UnknownEngine(String),

    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Preprocessing error: {0}")]
    Preprocessing(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PolyOcrError {
    /// Errors that stop the whole run rather than a single engine or image.
    pub fn is_input_resolution(&self) -> bool {
        matches!(
            self,
            PolyOcrError::NoInput
                | PolyOcrError::InputNotFound(_)
                | PolyOcrError::NotADirectory(_)
                | PolyOcrError::NoImagesFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PolyOcrError>;
