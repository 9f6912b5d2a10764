//! Scratch storage layout

use std::path::{Path, PathBuf};

use crate::filesys::file::File;

/// Where an invocation stages its downloaded archive
#[derive(Debug, Clone)]
pub struct ScratchLayout {
    /// Base directory for scratch files
    pub base_dir: PathBuf,
}

impl ScratchLayout {
    /// Create a new scratch layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Local copy of the archive stored under `key`.
    ///
    /// Only the key's base name is used, so `bots/order.zip` lands at
    /// `<base>/order.zip`.
    pub fn archive_file(&self, key: &str) -> File {
        File::new(self.base_dir.join(base_name(key)))
    }
}

impl Default for ScratchLayout {
    fn default() -> Self {
        // The only writable location inside Lambda
        Self::new("/tmp")
    }
}

/// Final path component of an object key or path, falling back to the input
pub fn base_name(key: &str) -> &str {
    Path::new(key)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(key)
}
