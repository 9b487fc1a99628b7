//! Wire message definitions for RestFiles.
//!
//! This module defines the payloads exchanged between the daemon and its
//! clients. Every type serializes with serde, so hosts can choose JSON or
//! MessagePack without the daemon caring which.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Listing Messages
// ============================================================================

/// A subdirectory inside a listed folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Directory name (not full path).
    pub name: String,
    /// Last write time.
    pub modified_date: DateTime<Utc>,
    /// Number of regular files directly inside the directory.
    pub file_count: u64,
}

/// A single file, either from a listing or a direct read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    /// File name (not full path).
    pub name: String,
    /// Extension including the leading dot, or empty.
    pub extension: String,
    /// Size in bytes.
    pub file_size_bytes: u64,
    /// Last write time.
    pub modified_date: DateTime<Utc>,
    /// Whether the file may be viewed and edited as text.
    pub is_text_file: bool,
    /// Text contents. Only present on direct reads of text files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
}

/// Listing of a single directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderResult {
    /// Subdirectories, in enumeration order.
    pub folders: Vec<Folder>,
    /// Files, in enumeration order.
    pub files: Vec<File>,
}

/// Reply to a read request. Exactly one of the fields is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesResponse {
    /// Set when the requested path is a directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<FolderResult>,
    /// Set when the requested path is a file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<File>,
}

impl FilesResponse {
    /// Response wrapping a directory listing.
    pub fn directory(listing: FolderResult) -> Self {
        Self {
            directory: Some(listing),
            file: None,
        }
    }

    /// Response wrapping a single file.
    pub fn file(file: File) -> Self {
        Self {
            directory: None,
            file: Some(file),
        }
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to MessagePack with named fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize from MessagePack.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

// ============================================================================
// Mutation Messages
// ============================================================================

/// Body of an update (PUT) request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFile {
    /// Replacement text for the whole file.
    #[serde(default)]
    pub text_contents: Option<String>,
}

/// Reply to an upload (POST) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// Directory the files were written into, relative to the root.
    pub path: String,
    /// Names of the files written, in upload order.
    pub files: Vec<String>,
}

impl UploadResult {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to MessagePack with named fields.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserialize from MessagePack.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

// ============================================================================
// Error Messages
// ============================================================================

/// Error codes for structured error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The path escapes the root or is malformed.
    InvalidPath,
    /// Resource not found.
    NotFound,
    /// Resource already exists with an incompatible type.
    Conflict,
    /// The file is not a text file.
    UnsupportedMediaType,
    /// A required field is missing.
    ValidationError,
    /// Invalid request or parameters.
    InvalidRequest,
    /// Server-side error.
    InternalError,
}

/// Error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable error message.
    pub message: String,
    /// Optional context (e.g., the requested path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Whether the client may retry the same request.
    pub recoverable: bool,
}
