//! File access used by open, save and export.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Reads and writes whole text files.
pub trait FileSystem {
    /// # Errors
    /// Returns an error if the file cannot be read as UTF-8 text.
    fn read(&self, path: &Path) -> Result<String>;

    /// # Errors
    /// Returns an error if the file cannot be written.
    fn write(&self, path: &Path, text: &str) -> Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }

    fn write(&self, path: &Path, text: &str) -> Result<()> {
        fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// `path` with `extension` appended when it has none (or a different one).
pub fn with_extension(path: &Path, extension: &str) -> PathBuf {
    let matches = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
    if matches {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// File stem used for window and export titles.
pub fn display_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned())
}
