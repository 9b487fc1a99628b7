//! Multi-file upload into a directory.

use std::fs;
use std::path::Path;

use bytes::Bytes;
use tracing::info;

use super::access::{stat, write_atomic};
use super::error::FileError;
use super::paths::resolve_file_name;
use super::root::RootContext;

/// One file received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Name as sent by the client, possibly with a client-side path.
    pub file_name: String,
    /// Raw file bytes.
    pub content: Bytes,
}

impl UploadedFile {
    /// Create an upload from a client file name and its bytes.
    ///
    /// The name is kept as sent; [`create`] reduces it to its last segment.
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// Write every upload into `target_dir`, creating it and any missing parents.
///
/// All names and destinations are validated before anything is written, so
/// an invalid name or a folder in the way leaves the filesystem untouched. A
/// file already at a destination is replaced. Returns the stored file names in upload order.
pub fn create(
    root: &RootContext,
    target_dir: &Path,
    uploads: &[UploadedFile],
) -> Result<Vec<String>, FileError> {
    if stat(target_dir).is_file() {
        return Err(FileError::Conflict(format!(
            "{} is a file; upload into a folder",
            root.display_path(target_dir)
        )));
    }

    let names = uploads
        .iter()
        .map(|upload| resolve_file_name(&upload.file_name))
        .collect::<Result<Vec<_>, _>>()?;

    for name in &names {
        let destination = target_dir.join(name);
        if !destination.starts_with(root.root_dir()) {
            return Err(FileError::InvalidPath(name.clone()));
        }
        if stat(&destination).is_directory {
            return Err(FileError::Conflict(format!(
                "{} is a folder",
                root.display_path(&destination)
            )));
        }
    }

    fs::create_dir_all(target_dir).map_err(|e| FileError::from_io(e, root, target_dir))?;

    for (name, upload) in names.iter().zip(uploads) {
        let destination = target_dir.join(name);
        let existing = stat(&destination);

        write_atomic(&destination, &upload.content, None)
            .map_err(|e| FileError::from_io(e, root, &destination))?;

        info!(
            path = %root.display_path(&destination),
            bytes = upload.content.len(),
            replaced = existing.exists,
            "Stored uploaded file"
        );
    }

    Ok(names)
}
