//! # RestFiles Daemon Library
//!
//! This crate provides a sandboxed file repository addressed by relative
//! paths and driven by four verbs.
//!
//! ## Overview
//!
//! - **GET**: list a directory, read a file (with contents for text files),
//!   or download raw bytes
//! - **POST**: upload one or more files into a directory, creating it
//! - **PUT**: replace the full contents of a text file
//! - **DELETE**: remove a single file
//!
//! Every client path is resolved against one configured root directory and
//! rejected if it would escape it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │      HTTP host (axum)        │   │      CLI one-shot commands   │
//! └──────────────┬───────────────┘   └──────────────┬───────────────┘
//!                └──────────────┬────────────────────┘
//!                      ┌────────▼────────┐
//!                      │   FileRouter    │  verb → operation
//!                      └────────┬────────┘
//!        ┌───────────┬──────────┼───────────┬──────────────┐
//!   ┌────▼────┐ ┌────▼────┐ ┌───▼────┐ ┌────▼────┐  ┌──────▼──────┐
//!   │  paths  │ │classify │ │listing │ │ access  │  │   upload    │
//!   └─────────┘ └─────────┘ └────────┘ └─────────┘  └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use daemon::files::RootContext;
//! use daemon::router::{FileRequest, FileRouter, Verb};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = daemon::Config::load_default()?;
//!     let router = FileRouter::new(RootContext::from_config(&config.files)?);
//!
//!     let reply = router.route(Verb::Get, FileRequest::new("docs")).await?;
//!     println!("{reply:?}");
//!
//!     daemon::http::serve(router, &config.server).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Path resolution and file operations
//! - [`router`]: Verb dispatch onto file operations
//! - [`http`]: axum HTTP host

pub mod config;
pub mod files;
pub mod http;
pub mod router;

// Re-export protocol for convenience
pub use protocol;

// Re-export config types for convenience
pub use config::{Config, ConfigError};

// Re-export files types for convenience
pub use files::{FileError, RootContext, UploadedFile};

// Re-export router types for convenience
pub use router::{FileReply, FileRequest, FileRouter, RouterError, RouterResult, Verb};
