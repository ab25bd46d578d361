//! Schema fragment discovery
//!
//! Enumerates the XSD resources the registry is built from: all files with
//! a matching extension under a root directory, optionally filtered by
//! exclude globs. Enumeration order is pinned to a lexicographic sort of the
//! full paths so that registry construction does not depend on filesystem
//! iteration order.

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// Discovers schema fragment files under a root directory
#[derive(Debug, Clone)]
pub struct SchemaDiscovery {
    /// File extensions to include
    extensions: Vec<String>,
    /// Exclude patterns, matched against root-relative paths
    exclude_set: Option<GlobSet>,
}

impl SchemaDiscovery {
    /// Create a discovery for `.xsd` files
    pub fn new() -> Self {
        Self {
            extensions: vec!["xsd".to_string()],
            exclude_set: None,
        }
    }

    /// Set the file extensions to discover
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Add exclude patterns (globs matched against root-relative paths)
    pub fn with_exclude_patterns(mut self, patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            self.exclude_set = None;
            return Ok(self);
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    Error::Discovery(format!("invalid glob pattern '{}': {}", pattern, e))
                })?;
            builder.add(glob);
        }
        self.exclude_set = Some(
            builder
                .build()
                .map_err(|e| Error::Discovery(format!("failed to build glob set: {}", e)))?,
        );
        Ok(self)
    }

    /// Enumerate matching files under `root`, sorted lexicographically.
    ///
    /// Any I/O failure while walking is fatal: the resource set must be
    /// enumerated completely or not at all.
    pub fn discover(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(Error::Discovery(format!(
                "schema root '{}' is not a directory",
                root.display()
            )));
        }

        let mut found = Vec::new();
        self.walk(root, root, &mut found)?;
        found.sort();
        Ok(found)
    }

    fn walk(&self, root: &Path, dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::Discovery(format!("cannot read directory '{}': {}", dir.display(), e))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Discovery(format!("cannot read entry in '{}': {}", dir.display(), e))
            })?;
            let path = entry.path();

            if path.is_dir() {
                self.walk(root, &path, found)?;
            } else if self.matches(root, &path) {
                found.push(path);
            }
        }
        Ok(())
    }

    fn matches(&self, root: &Path, path: &Path) -> bool {
        let extension_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|want| want == e))
            .unwrap_or(false);
        if !extension_ok {
            return false;
        }

        if let Some(exclude) = &self.exclude_set {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if exclude.is_match(relative) {
                return false;
            }
        }
        true
    }
}

impl Default for SchemaDiscovery {
    fn default() -> Self {
        Self::new()
    }
}
