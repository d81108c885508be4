use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tempfile::TempPath;
use tracing::{debug, warn};

use crate::error::{PolyOcrError, Result};

/// JPEG quality used when re-encoding converted images.
pub const JPEG_QUALITY: u8 = 95;

/// Extensions every engine reads without help.
pub const NATIVE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Extensions that are converted to JPEG before recognition.
pub const CONVERTED_EXTENSIONS: &[&str] = &["heic", "heif"];

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// True for any extension the tool accepts as an image.
pub fn is_supported_image(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| {
        NATIVE_EXTENSIONS.contains(&ext.as_str()) || CONVERTED_EXTENSIONS.contains(&ext.as_str())
    })
}

pub fn needs_conversion(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| CONVERTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Decodes HEIC/HEIF files.
pub trait HeifDecoder: Send + Sync {
    fn decode(&self, source: &Path) -> Result<DynamicImage>;
}

/// An image ready for the engines.
///
/// When the source had to be converted, the converted file lives in a
/// temporary location that is deleted when this value is dropped.
#[derive(Debug)]
pub struct PreparedImage {
    path: PathBuf,
    artifact: Option<TempPath>,
}

impl PreparedImage {
    fn original(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            artifact: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_converted(&self) -> bool {
        self.artifact.is_some()
    }
}

impl Drop for PreparedImage {
    fn drop(&mut self) {
        if let Some(artifact) = self.artifact.take() {
            let path = artifact.to_path_buf();
            match artifact.close() {
                Ok(()) => debug!(path = %path.display(), "Removed converted image"),
                Err(e) => debug!(path = %path.display(), "Could not remove converted image: {}", e),
            }
        }
    }
}

#[derive(Clone)]
pub struct ImagePreprocessor {
    decoder: Arc<dyn HeifDecoder>,
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePreprocessor {
    pub fn new() -> Self {
        Self::with_decoder(Arc::new(default_decoder()))
    }

    pub fn with_decoder(decoder: Arc<dyn HeifDecoder>) -> Self {
        Self { decoder }
    }

    /// Returns a path every engine can read.
    ///
    /// Natively supported files are passed through untouched. HEIC/HEIF
    /// files are converted to JPEG; if that fails, a warning is logged and
    /// the original path is returned so the engines report their own errors.
    pub async fn prepare(&self, path: &Path) -> PreparedImage {
        if !needs_conversion(path) {
            return PreparedImage::original(path);
        }

        let decoder = Arc::clone(&self.decoder);
        let source = path.to_path_buf();
        let converted =
            tokio::task::spawn_blocking(move || convert_to_jpeg(decoder.as_ref(), &source))
                .await
                .map_err(|e| PolyOcrError::Preprocessing(format!("Conversion task panicked: {e}")))
                .and_then(|inner| inner);

        match converted {
            Ok(artifact) => {
                debug!(
                    source = %path.display(),
                    converted = %artifact.display(),
                    "Converted image to JPEG"
                );
                PreparedImage {
                    path: artifact.to_path_buf(),
                    artifact: Some(artifact),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), "Image conversion failed, using original: {}", e);
                PreparedImage::original(path)
            }
        }
    }
}

fn convert_to_jpeg(decoder: &dyn HeifDecoder, source: &Path) -> Result<TempPath> {
    let rgb = decoder.decode(source)?.to_rgb8();

    let mut file = tempfile::Builder::new()
        .prefix("polyocr-")
        .suffix(".jpg")
        .tempfile()?;

    {
        let mut writer = BufWriter::new(file.as_file_mut());
        JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
            .encode_image(&rgb)
            .map_err(|e| PolyOcrError::Preprocessing(format!("Failed to encode JPEG: {e}")))?;
        writer.flush()?;
    }

    Ok(file.into_temp_path())
}

#[cfg(feature = "heif")]
fn default_decoder() -> LibHeifDecoder {
    LibHeifDecoder
}

#[cfg(not(feature = "heif"))]
fn default_decoder() -> HeifConvertCommand {
    HeifConvertCommand::default()
}

/// Decodes in-process through libheif.
#[cfg(feature = "heif")]
#[derive(Debug, Clone, Copy, Default)]
pub struct LibHeifDecoder;

#[cfg(feature = "heif")]
impl HeifDecoder for LibHeifDecoder {
    fn decode(&self, source: &Path) -> Result<DynamicImage> {
        use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

        let source_str = source.to_str().ok_or_else(|| {
            PolyOcrError::Preprocessing(format!("Non UTF-8 path: {}", source.display()))
        })?;

        let lib_heif = LibHeif::new();
        let ctx = HeifContext::read_from_file(source_str)
            .map_err(|e| PolyOcrError::Preprocessing(format!("Failed to read HEIF: {e}")))?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| PolyOcrError::Preprocessing(format!("No primary image: {e}")))?;
        let decoded = lib_heif
            .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
            .map_err(|e| PolyOcrError::Preprocessing(format!("Failed to decode HEIF: {e}")))?;

        let planes = decoded.planes();
        let plane = planes
            .interleaved
            .ok_or_else(|| PolyOcrError::Preprocessing("Missing interleaved plane".to_string()))?;

        let (width, height, stride) = (plane.width, plane.height, plane.stride);
        let row_len = width as usize * 3;
        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&plane.data[start..start + row_len]);
        }

        image::RgbImage::from_raw(width, height, pixels)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(|| PolyOcrError::Preprocessing("HEIF plane size mismatch".to_string()))
    }
}

/// Decodes by shelling out to libheif's `heif-convert` tool, which writes a
/// lossless PNG that is then loaded with the `image` crate.
#[derive(Debug, Clone)]
pub struct HeifConvertCommand {
    program: String,
}

impl Default for HeifConvertCommand {
    fn default() -> Self {
        Self {
            program: "heif-convert".to_string(),
        }
    }
}

impl HeifConvertCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl HeifDecoder for HeifConvertCommand {
    fn decode(&self, source: &Path) -> Result<DynamicImage> {
        let scratch = tempfile::Builder::new()
            .prefix("polyocr-heif-")
            .suffix(".png")
            .tempfile()?
            .into_temp_path();

        let output = std::process::Command::new(&self.program)
            .arg(source)
            .arg(&*scratch)
            .output()
            .map_err(|e| {
                PolyOcrError::Preprocessing(format!("Failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            return Err(PolyOcrError::Preprocessing(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        image::open(&*scratch)
            .map_err(|e| PolyOcrError::Preprocessing(format!("Failed to load converted PNG: {e}")))
    }
}
