//! Request router mapping verbs onto file operations.
//!
//! This module provides the `FileRouter` struct that receives a parsed
//! `FileRequest` and a `Verb`, resolves the path against the sandbox root and
//! runs the matching operation from [`crate::files`]. Hosts (the HTTP server,
//! the one-shot CLI commands) only translate their own request format into a
//! `FileRequest` and serialize the `FileReply`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use protocol::messages::{ErrorCode, ErrorMessage, FilesResponse, UploadResult};
use tracing::{debug, error, info};

use crate::files::{
    self, delete_file, ensure_exists, list_directory, read_file, read_for_download, resolve,
    stat, write_text, Download, FileError, RootContext, UploadedFile,
};

/// Result type for router operations.
pub type RouterResult = Result<FileReply, RouterError>;

/// Errors that can occur while routing a request.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// File operation error.
    #[error(transparent)]
    File(#[from] FileError),

    /// The host could not parse the request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouterError {
    /// Wire error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            RouterError::File(e) => e.code(),
            RouterError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            RouterError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Convert the error to a protocol ErrorMessage.
    pub fn to_error_message(&self, context: Option<String>) -> ErrorMessage {
        match self {
            RouterError::File(e) => e.to_error_message(context),
            RouterError::InvalidRequest(_) => ErrorMessage {
                code: self.code(),
                message: self.to_string(),
                context,
                recoverable: false,
            },
            RouterError::Internal(_) => ErrorMessage {
                code: self.code(),
                message: self.to_string(),
                context,
                recoverable: true,
            },
        }
    }
}

/// Request verbs understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Read a file or list a directory.
    Get,
    /// Upload files into a directory.
    Post,
    /// Replace the contents of a text file.
    Put,
    /// Delete a file.
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request addressed by a path relative to the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileRequest {
    /// Client-supplied relative path, possibly percent-encoded.
    pub path: String,
    /// Replacement text for updates.
    pub text_contents: Option<String>,
    /// Return raw bytes instead of a JSON description.
    pub for_download: bool,
    /// Uploaded files for creates.
    pub files: Vec<UploadedFile>,
}

impl FileRequest {
    /// Create a request for `path` with no payload.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Attach replacement text.
    pub fn with_text(mut self, contents: impl Into<String>) -> Self {
        self.text_contents = Some(contents.into());
        self
    }

    /// Ask for the raw file bytes.
    pub fn download(mut self) -> Self {
        self.for_download = true;
        self
    }

    /// Attach uploaded files.
    pub fn with_files(mut self, files: Vec<UploadedFile>) -> Self {
        self.files = files;
        self
    }
}

/// Successful outcome of a routed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileReply {
    /// Directory listing or file description.
    Read(FilesResponse),
    /// Raw file bytes.
    Download(Download),
    /// Files stored by an upload.
    Created(UploadResult),
    /// Text file replaced.
    Updated,
    /// File removed.
    Deleted,
}

/// Router that runs file operations against one sandbox root.
///
/// The root context is immutable and shared, so the router can be cloned
/// cheaply into every request handler.
#[derive(Debug, Clone)]
pub struct FileRouter {
    root: Arc<RootContext>,
}

impl FileRouter {
    /// Create a router for the given root.
    pub fn new(root: RootContext) -> Self {
        Self {
            root: Arc::new(root),
        }
    }

    /// The sandbox configuration requests run against.
    pub fn root(&self) -> &RootContext {
        &self.root
    }

    /// Route a request to the operation its verb selects.
    ///
    /// Filesystem work runs on the blocking thread pool so slow disks never
    /// stall the async workers.
    pub async fn route(&self, verb: Verb, request: FileRequest) -> RouterResult {
        let root = Arc::clone(&self.root);
        let path = request.path.clone();

        let result = tokio::task::spawn_blocking(move || dispatch(&root, verb, request))
            .await
            .map_err(|e| RouterError::Internal(format!("file operation task failed: {e}")))?;

        if let Err(e) = &result {
            if e.code() == ErrorCode::InternalError {
                error!(verb = %verb, path = %path, error = %e, "Request failed");
            } else {
                debug!(verb = %verb, path = %path, error = %e, "Request rejected");
            }
        }

        result
    }
}

/// Run a request synchronously on the calling thread.
pub fn dispatch(root: &RootContext, verb: Verb, request: FileRequest) -> RouterResult {
    debug!(verb = %verb, path = %request.path, "Routing request");

    let path = resolve(root, &request.path)?;

    match verb {
        Verb::Get => handle_get(root, &path, request.for_download),
        Verb::Post => handle_post(root, &path, &request.files),
        Verb::Put => handle_put(root, &path, request.text_contents.as_deref()),
        Verb::Delete => handle_delete(root, &path),
    }
}

// =========================================================================
// Verb Handlers
// =========================================================================

fn handle_get(root: &RootContext, path: &Path, for_download: bool) -> RouterResult {
    let status = ensure_exists(root, path)?;

    // Download intent on a directory falls back to the listing.
    if status.is_directory {
        let listing = list_directory(root, path)?;
        return Ok(FileReply::Read(FilesResponse::directory(
            listing.to_protocol(),
        )));
    }

    if for_download {
        return Ok(FileReply::Download(read_for_download(root, path)?));
    }

    let entry = read_file(root, path)?;
    Ok(FileReply::Read(FilesResponse::file(entry.to_protocol())))
}

fn handle_post(root: &RootContext, path: &Path, uploads: &[UploadedFile]) -> RouterResult {
    if stat(path).is_file() {
        return Err(FileError::Conflict(format!(
            "{} already exists as a file",
            root.display_path(path)
        ))
        .into());
    }

    let files = files::create(root, path, uploads)?;
    let shown = root.display_path(path);

    info!(path = %shown, count = files.len(), "Upload complete");

    Ok(FileReply::Created(UploadResult {
        path: shown,
        files,
    }))
}

fn handle_put(root: &RootContext, path: &Path, contents: Option<&str>) -> RouterResult {
    let status = ensure_exists(root, path)?;
    if status.is_directory {
        return Err(FileError::NotFound(root.display_path(path)).into());
    }

    write_text(root, path, contents)?;
    Ok(FileReply::Updated)
}

fn handle_delete(root: &RootContext, path: &Path) -> RouterResult {
    ensure_exists(root, path)?;
    delete_file(root, path)?;
    Ok(FileReply::Deleted)
}
