use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{PolyOcrError, Result};
use crate::models::{BatchResult, EngineSelection};
use crate::ocr::is_supported_image;

use super::orchestrator::Orchestrator;
use super::report::{write_json, RecordNamer};

/// File name of the combined batch record.
pub const COMBINED_FILE_NAME: &str = "all_results.json";

/// Recursively lists supported images under `root`, in traversal order.
/// Unreadable subdirectories are skipped with a warning. Symlinked
/// directories are not descended into.
pub fn discover_images(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(PolyOcrError::InputNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(PolyOcrError::NotADirectory(root.to_path_buf()));
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if dir == root => return Err(e.into()),
            Err(e) => {
                warn!(dir = %dir.display(), "Skipping unreadable directory: {}", e);
                continue;
            }
        };

        let mut subdirs = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                subdirs.push(path);
            } else if is_supported_image(&path) {
                found.push(path);
            }
        }
        // Visit subdirectories in the order they were listed.
        pending.extend(subdirs.into_iter().rev());
    }

    Ok(found)
}

/// Runs the orchestrator over every image in a directory tree.
pub struct BatchDriver<'a> {
    orchestrator: &'a Orchestrator,
    output_dir: PathBuf,
    sort: bool,
}

impl<'a> BatchDriver<'a> {
    pub fn new(orchestrator: &'a Orchestrator, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            orchestrator,
            output_dir: output_dir.into(),
            sort: false,
        }
    }

    /// Process files in lexicographic path order instead of traversal order.
    pub fn sorted(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Processes every image under `root` one at a time, writing one record
    /// per image and a combined record at the end.
    ///
    /// Fails only when the directory cannot be read, holds no images, or a
    /// record cannot be written; per-engine failures live in the records.
    pub async fn run(&self, root: &Path, selection: &EngineSelection) -> Result<BatchResult> {
        let mut images = discover_images(root)?;
        if images.is_empty() {
            return Err(PolyOcrError::NoImagesFound(root.to_path_buf()));
        }
        if self.sort {
            images.sort();
        }

        info!(count = images.len(), root = %root.display(), "Found images");
        std::fs::create_dir_all(&self.output_dir)?;

        let mut namer = RecordNamer::default();
        let mut batch = BatchResult::default();

        for (index, image) in images.iter().enumerate() {
            info!("[{}/{}] Processing {}", index + 1, images.len(), image.display());
            let result = self.orchestrator.process(image, selection).await;

            let record_path = self.output_dir.join(namer.name_for(image));
            write_json(&record_path, &result)?;
            batch.push(result);
        }

        let combined = self.output_dir.join(COMBINED_FILE_NAME);
        write_json(&combined, &batch)?;
        info!(
            images = batch.len(),
            output = %combined.display(),
            "Batch complete"
        );

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discover_filters_and_recurses() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a.PNG"));
        touch(&dir.path().join("notes.txt"));
        touch(&dir.path().join("nested/deeper/b.heic"));
        touch(&dir.path().join("nested/c.jpeg"));

        let mut found = discover_images(dir.path()).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![
                dir.path().join("a.PNG"),
                dir.path().join("nested/c.jpeg"),
                dir.path().join("nested/deeper/b.heic"),
            ]
        );
    }

    #[test]
    fn test_discover_missing_root() {
        let err = discover_images(Path::new("/no/such/polyocr/dir")).unwrap_err();
        assert!(matches!(err, PolyOcrError::InputNotFound(_)));
    }

    #[test]
    fn test_discover_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("page.png");
        touch(&file);

        let err = discover_images(&file).unwrap_err();
        assert!(matches!(err, PolyOcrError::NotADirectory(_)));
        assert!(err.is_input_resolution());
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_does_not_follow_directory_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("page.png"));
        touch(&dir.path().join("sub/inner.jpg"));
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("sub/back")).unwrap();

        let mut found = discover_images(dir.path()).unwrap();
        found.sort();
        assert_eq!(
            found,
            vec![dir.path().join("page.png"), dir.path().join("sub/inner.jpg")]
        );
    }
}
