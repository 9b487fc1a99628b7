//! # RestFiles Protocol Library
//!
//! Wire types shared by the RestFiles daemon and its clients.
//!
//! ## Overview
//!
//! - **Listings**: [`FolderResult`] with its [`Folder`] and [`File`] entries
//! - **Replies**: [`FilesResponse`] for reads, [`UploadResult`] for uploads
//! - **Requests**: [`UpdateFile`] carries replacement text for an update
//! - **Errors**: [`ErrorMessage`] and [`ErrorCode`] for typed failures
//!
//! All types are plain serde structs; [`FilesResponse`] additionally offers
//! JSON and MessagePack helpers.
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{FilesResponse, FolderResult};
//!
//! let response = FilesResponse::directory(FolderResult::default());
//! let json = response.to_json().unwrap();
//! assert!(json.contains("directory"));
//! ```

pub mod error;
pub mod messages;

pub use error::{ProtocolError, Result};
pub use messages::{
    ErrorCode, ErrorMessage, File, FilesResponse, Folder, FolderResult, UpdateFile, UploadResult,
};
