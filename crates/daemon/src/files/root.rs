//! The immutable sandbox configuration handed to every file operation.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::classify::{extension_of, is_text_extension};
use crate::config::FilesConfig;

/// Root directory, excluded directory names and text extensions.
///
/// Built once at startup and shared read-only between requests. Operations
/// take it by reference rather than reaching for global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootContext {
    /// Absolute sandbox boundary.
    root_dir: PathBuf,
    /// Directory names that are never listed.
    excluded_directories: HashSet<String>,
    /// Extensions (with leading dot) treated as editable text.
    text_extensions: HashSet<String>,
}

impl RootContext {
    /// Create a context from already-validated values.
    pub fn new<E, T>(root_dir: impl Into<PathBuf>, excluded_directories: E, text_extensions: T) -> Self
    where
        E: IntoIterator,
        E::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            root_dir: root_dir.into(),
            excluded_directories: excluded_directories.into_iter().map(Into::into).collect(),
            text_extensions: text_extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the context from configuration.
    ///
    /// Creates the root directory if it does not exist yet and canonicalizes
    /// it, so later prefix checks compare against the real location.
    pub fn from_config(config: &FilesConfig) -> Result<Self> {
        fs::create_dir_all(&config.root_dir).with_context(|| {
            format!(
                "Failed to create root directory: {}",
                config.root_dir.display()
            )
        })?;

        let root_dir = fs::canonicalize(&config.root_dir).with_context(|| {
            format!(
                "Failed to resolve root directory: {}",
                config.root_dir.display()
            )
        })?;

        tracing::debug!(
            root = %root_dir.display(),
            excluded = config.exclude_directories.len(),
            text_extensions = config.text_extensions.len(),
            "Root context ready"
        );

        Ok(Self::new(
            root_dir,
            config.exclude_directories.iter().cloned(),
            config.text_extensions.iter().cloned(),
        ))
    }

    /// The sandbox root.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Whether a directory with this name is hidden from listings.
    pub fn is_excluded(&self, name: &str) -> bool {
        self.excluded_directories.contains(name)
    }

    /// The configured text extension allow-list.
    pub fn text_extensions(&self) -> &HashSet<String> {
        &self.text_extensions
    }

    /// Whether the file at `path` is classified as text.
    pub fn is_text_file(&self, path: &Path) -> bool {
        is_text_extension(&extension_of(path), &self.text_extensions)
    }

    /// Render `path` relative to the root for messages and replies.
    ///
    /// Absolute locations are never echoed back to clients.
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root_dir) {
            Ok(relative) if relative.as_os_str().is_empty() => "/".to_string(),
            Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
            Err(_) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}
