//! Single-file operations: existence checks, reads, downloads, text updates
//! and deletion.
//!
//! Writes go through a sibling temporary file that is renamed over the
//! target, so a reader sees either the old or the new contents, never a
//! partial write.

use std::fs;
use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info};

use super::classify::extension_of;
use super::error::FileError;
use super::listing::FileEntry;
use super::root::RootContext;

/// Content type used for downloads of text files.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Content type used for downloads of everything else.
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// What exists at a resolved path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathStatus {
    /// A regular file or directory exists at the path.
    pub exists: bool,
    /// The entry is a directory.
    pub is_directory: bool,
}

impl PathStatus {
    /// The entry is an existing regular file.
    pub fn is_file(&self) -> bool {
        self.exists && !self.is_directory
    }
}

/// Raw file bytes for an attachment transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    /// Suggested file name for the attachment.
    pub file_name: String,
    /// MIME type of the body.
    pub content_type: &'static str,
    /// The full file contents.
    pub data: Bytes,
}

/// Check what exists at `path`.
///
/// Only regular files and directories count as existing; sockets, FIFOs and
/// dangling symlinks report as absent.
pub fn stat(path: &Path) -> PathStatus {
    match fs::metadata(path) {
        Ok(metadata) => PathStatus {
            exists: metadata.is_file() || metadata.is_dir(),
            is_directory: metadata.is_dir(),
        },
        Err(_) => PathStatus::default(),
    }
}

/// Like [`stat`], but fails with `NotFound` when nothing exists at `path`.
pub fn ensure_exists(root: &RootContext, path: &Path) -> Result<PathStatus, FileError> {
    let status = stat(path);
    if !status.exists {
        return Err(FileError::NotFound(root.display_path(path)));
    }
    Ok(status)
}

/// Read a file's metadata, plus its contents if it is a text file.
///
/// Binary files are returned without contents rather than as an error.
pub fn read_file(root: &RootContext, path: &Path) -> Result<FileEntry, FileError> {
    let metadata = regular_file_metadata(root, path)?;
    let mut entry = FileEntry::from_metadata(root, path, &metadata);

    if entry.is_text {
        let bytes = fs::read(path).map_err(|e| FileError::from_io(e, root, path))?;
        let text = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
        entry.contents = Some(String::from_utf8_lossy(text).into_owned());
    }

    debug!(path = %root.display_path(path), is_text = entry.is_text, size = entry.size, "Read file");

    Ok(entry)
}

/// Read a file's raw bytes for download, whatever its classification.
pub fn read_for_download(root: &RootContext, path: &Path) -> Result<Download, FileError> {
    regular_file_metadata(root, path)?;

    let data = fs::read(path).map_err(|e| FileError::from_io(e, root, path))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = if root.is_text_file(path) {
        TEXT_CONTENT_TYPE
    } else {
        BINARY_CONTENT_TYPE
    };

    debug!(path = %root.display_path(path), size = data.len(), "Prepared download");

    Ok(Download {
        file_name,
        content_type,
        data: Bytes::from(data),
    })
}

/// Replace the full contents of an existing text file.
///
/// Checks, in order: the extension is in the text allow-list, contents were
/// supplied, and a regular file exists at `path`.
pub fn write_text(
    root: &RootContext,
    path: &Path,
    contents: Option<&str>,
) -> Result<(), FileError> {
    let extension = extension_of(path);
    if !root.is_text_file(path) {
        let message = if extension.is_empty() {
            "only text files can be updated, not files without an extension".to_string()
        } else {
            format!("only text files can be updated, not '{extension}'")
        };
        return Err(FileError::UnsupportedMediaType(message));
    }

    let contents = contents
        .ok_or_else(|| FileError::Validation("text_contents is required".to_string()))?;

    let metadata = regular_file_metadata(root, path)?;

    write_atomic(path, contents.as_bytes(), Some(metadata.permissions()))
        .map_err(|e| FileError::from_io(e, root, path))?;

    info!(path = %root.display_path(path), bytes = contents.len(), "Updated text file");
    Ok(())
}

/// Remove a single regular file.
///
/// Directories are never removed through this path; they report `NotFound`.
pub fn delete_file(root: &RootContext, path: &Path) -> Result<(), FileError> {
    regular_file_metadata(root, path)?;

    fs::remove_file(path).map_err(|e| FileError::from_io(e, root, path))?;

    info!(path = %root.display_path(path), "Deleted file");
    Ok(())
}

/// Metadata for `path`, or `NotFound` unless it is a regular file.
fn regular_file_metadata(root: &RootContext, path: &Path) -> Result<fs::Metadata, FileError> {
    let metadata = fs::metadata(path).map_err(|e| FileError::from_io(e, root, path))?;
    if !metadata.is_file() {
        return Err(FileError::NotFound(root.display_path(path)));
    }
    Ok(metadata)
}

/// Write `data` to a temporary file next to `path` and rename it into place.
///
/// New files get `0o644` on Unix unless `permissions` carries the mode of the
/// file being replaced.
pub(crate) fn write_atomic(
    path: &Path,
    data: &[u8],
    permissions: Option<fs::Permissions>,
) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("path has no parent directory"))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".restfiles-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;

    match permissions {
        Some(perms) => fs::set_permissions(temp.path(), perms)?,
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(temp.path(), fs::Permissions::from_mode(0o644))?;
            }
        }
    }

    // Dropping the temp file on error removes it.
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
