//! Error taxonomy shared by all file operations.

use std::io;
use std::path::Path;

use protocol::{ErrorCode, ErrorMessage};
use thiserror::Error;

use super::root::RootContext;

/// Errors that can occur while serving a file request.
#[derive(Debug, Error)]
pub enum FileError {
    /// The requested path escapes the root or is malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The path does not exist as the kind of entry the operation needs.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target already exists as a file.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The file is not in the text extension allow-list.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// A required payload field is missing.
    #[error("validation error: {0}")]
    Validation(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FileError {
    /// Map an IO error for `path`, turning a vanished entry into `NotFound`.
    pub(crate) fn from_io(err: io::Error, root: &RootContext, path: &Path) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            FileError::NotFound(root.display_path(path))
        } else {
            FileError::Io(err)
        }
    }

    /// Wire error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            FileError::InvalidPath(_) => ErrorCode::InvalidPath,
            FileError::NotFound(_) => ErrorCode::NotFound,
            FileError::Conflict(_) => ErrorCode::Conflict,
            FileError::UnsupportedMediaType(_) => ErrorCode::UnsupportedMediaType,
            FileError::Validation(_) => ErrorCode::ValidationError,
            FileError::Io(_) => ErrorCode::InternalError,
        }
    }

    /// Whether retrying the same request could succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FileError::Io(_))
    }

    /// Convert the error to a protocol ErrorMessage.
    pub fn to_error_message(&self, context: Option<String>) -> ErrorMessage {
        ErrorMessage {
            code: self.code(),
            message: self.to_string(),
            context,
            recoverable: self.is_recoverable(),
        }
    }
}
