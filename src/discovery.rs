use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::error::{ReportError, Result, SourceId};

/// Finds report files under a path
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    /// File extensions to include (e.g., ["xml", "gz"])
    extensions: Vec<String>,
    /// Maximum depth for directory traversal (None = unlimited)
    max_depth: Option<usize>,
    /// Follow symbolic links
    follow_symlinks: bool,
}

impl Default for FileDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl FileDiscovery {
    pub fn new() -> Self {
        Self {
            extensions: vec!["xml".to_string(), "gz".to_string()],
            max_depth: None,
            follow_symlinks: false,
        }
    }

    /// Set file extensions to discover
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Set maximum traversal depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set whether to follow symbolic links
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Files to process under `path`, sorted
    ///
    /// A path naming a file is returned as-is whatever its extension. Unreadable entries
    /// inside a directory are logged and skipped.
    pub fn discover_files(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let metadata = std::fs::metadata(path).map_err(|source| ReportError::Io {
            source_id: SourceId::file(path),
            source,
        })?;

        if metadata.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }

        let walker = WalkBuilder::new(path)
            .standard_filters(false)
            .hidden(true)
            .follow_links(self.follow_symlinks)
            .max_depth(self.max_depth)
            .build();

        let mut files = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) => {
                    let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
                    if is_file && self.has_wanted_extension(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(e) => tracing::warn!(error = %e, "skipping unreadable directory entry"),
            }
        }

        files.sort();
        tracing::debug!(root = %path.display(), files = files.len(), "discovered report files");
        Ok(files)
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }
}
