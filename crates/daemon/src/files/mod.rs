//! Sandboxed file repository operations.
//!
//! This module provides the file operations behind every request verb:
//! - Path resolution confined to a configured root directory
//! - Text/binary classification from an extension allow-list
//! - Directory listing with excluded directory names
//! - Reading, downloading, text updates and deletion of single files
//! - Materializing uploaded files into a target directory
//!
//! # Security
//!
//! Client-supplied paths are normalized lexically and joined onto the root;
//! anything that would land outside the root is rejected with
//! [`FileError::InvalidPath`] before the filesystem is touched. Every
//! operation receives the [`RootContext`] explicitly, so there is no ambient
//! configuration.

pub mod access;
pub mod classify;
pub mod error;
pub mod listing;
pub mod paths;
pub mod root;
pub mod upload;

pub use access::{delete_file, ensure_exists, read_file, read_for_download, stat, write_text};
pub use access::{Download, PathStatus};
pub use classify::{extension_of, is_text_extension};
pub use error::FileError;
pub use listing::{list_directory, FileEntry, FolderEntry, Listing};
pub use paths::{resolve, resolve_file_name};
pub use root::RootContext;
pub use upload::{create, UploadedFile};
