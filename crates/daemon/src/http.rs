//! HTTP host for the file router.
//!
//! Every verb on `/files/{path}` is translated into a [`FileRequest`] and
//! handed to the [`FileRouter`]. Replies are JSON, or MessagePack when the
//! client sends `Accept: application/msgpack`. Errors always carry a JSON
//! [`ErrorMessage`](protocol::ErrorMessage) body.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::QueryRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use protocol::messages::{ErrorCode, FilesResponse, UpdateFile, UploadResult};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::files::{Download, UploadedFile};
use crate::router::{FileReply, FileRequest, FileRouter, RouterError, Verb};

/// URL prefix all file routes live under.
pub const FILES_PREFIX: &str = "/files";

/// Content type for MessagePack replies.
pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

/// Content type for JSON replies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Query parameters accepted on reads.
#[derive(Debug, Default, Deserialize)]
struct ReadParams {
    #[serde(default)]
    download: bool,
}

/// Build the HTTP application around `router`.
pub fn app(router: FileRouter, max_upload_size: usize) -> Router {
    let files = get(read_file)
        .post(upload_files)
        .put(update_file)
        .delete(delete_file);

    Router::new()
        .route("/", get(|| async { "restfiles ok" }))
        .route(FILES_PREFIX, files.clone())
        .route(&format!("{FILES_PREFIX}/{{*path}}"), files)
        .layer(DefaultBodyLimit::max(max_upload_size))
        .with_state(router)
}

/// Bind to the configured address and serve until Ctrl-C.
pub async fn serve(router: FileRouter, config: &ServerConfig) -> Result<()> {
    let addr: SocketAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_address))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        addr = %listener.local_addr()?,
        root = %router.root().root_dir().display(),
        "Serving files"
    );

    let limit = usize::try_from(config.max_upload_size).unwrap_or(usize::MAX);
    axum::serve(listener, app(router, limit))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

// =========================================================================
// Handlers
// =========================================================================

async fn read_file(
    State(router): State<FileRouter>,
    uri: Uri,
    headers: HeaderMap,
    params: Result<Query<ReadParams>, QueryRejection>,
) -> Response {
    let path = relative_path(&uri);
    let params = match params {
        Ok(Query(params)) => params,
        Err(e) => {
            let err = RouterError::InvalidRequest(e.body_text());
            return error_response(&err, context(Verb::Get, &path));
        }
    };

    let mut request = FileRequest::new(path);
    request.for_download = params.download;
    respond(&router, Verb::Get, request, wants_msgpack(&headers)).await
}

async fn upload_files(
    State(router): State<FileRouter>,
    uri: Uri,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let path = relative_path(&uri);
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(e) => {
            let err = RouterError::InvalidRequest(e.body_text());
            return with_status(e.status(), &err, context(Verb::Post, &path));
        }
    };

    let mut files = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                // Form fields without a file name are not uploads.
                let Some(file_name) = field.file_name().map(str::to_string) else {
                    continue;
                };
                match field.bytes().await {
                    Ok(content) => files.push(UploadedFile::new(file_name, content)),
                    Err(e) => {
                        let err = RouterError::InvalidRequest(e.body_text());
                        return with_status(e.status(), &err, context(Verb::Post, &path));
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                let err = RouterError::InvalidRequest(e.body_text());
                return with_status(e.status(), &err, context(Verb::Post, &path));
            }
        }
    }

    let request = FileRequest::new(path).with_files(files);
    respond(&router, Verb::Post, request, wants_msgpack(&headers)).await
}

async fn update_file(State(router): State<FileRouter>, uri: Uri, body: Bytes) -> Response {
    let path = relative_path(&uri);

    let update = if body.is_empty() {
        UpdateFile::default()
    } else {
        match serde_json::from_slice::<UpdateFile>(&body) {
            Ok(update) => update,
            Err(e) => {
                let err = RouterError::InvalidRequest(format!("malformed JSON body: {e}"));
                return error_response(&err, context(Verb::Put, &path));
            }
        }
    };

    let mut request = FileRequest::new(path);
    request.text_contents = update.text_contents;
    respond(&router, Verb::Put, request, false).await
}

async fn delete_file(State(router): State<FileRouter>, uri: Uri) -> Response {
    let request = FileRequest::new(relative_path(&uri));
    respond(&router, Verb::Delete, request, false).await
}

// =========================================================================
// Responses
// =========================================================================

async fn respond(router: &FileRouter, verb: Verb, request: FileRequest, msgpack: bool) -> Response {
    let context = context(verb, &request.path);

    match router.route(verb, request).await {
        Ok(FileReply::Read(response)) => encode(StatusCode::OK, &response, msgpack),
        Ok(FileReply::Download(download)) => download_response(download),
        Ok(FileReply::Created(result)) => encode(StatusCode::CREATED, &result, msgpack),
        Ok(FileReply::Updated) | Ok(FileReply::Deleted) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e, context),
    }
}

/// HTTP status for a router error.
pub fn status_for(error: &RouterError) -> StatusCode {
    match error.code() {
        ErrorCode::InvalidPath | ErrorCode::ValidationError | ErrorCode::InvalidRequest => {
            StatusCode::BAD_REQUEST
        }
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: &RouterError, context: String) -> Response {
    with_status(status_for(error), error, context)
}

fn with_status(status: StatusCode, error: &RouterError, context: String) -> Response {
    (status, Json(error.to_error_message(Some(context)))).into_response()
}

/// Reply bodies that know their own wire encodings.
trait WireReply {
    fn json(&self) -> protocol::Result<String>;
    fn msgpack(&self) -> protocol::Result<Vec<u8>>;
}

impl WireReply for FilesResponse {
    fn json(&self) -> protocol::Result<String> {
        self.to_json()
    }

    fn msgpack(&self) -> protocol::Result<Vec<u8>> {
        self.to_msgpack()
    }
}

impl WireReply for UploadResult {
    fn json(&self) -> protocol::Result<String> {
        self.to_json()
    }

    fn msgpack(&self) -> protocol::Result<Vec<u8>> {
        self.to_msgpack()
    }
}

fn encode<T: WireReply>(status: StatusCode, value: &T, msgpack: bool) -> Response {
    let body = if msgpack {
        value.msgpack().map(|body| (MSGPACK_CONTENT_TYPE, body))
    } else {
        value
            .json()
            .map(|body| (JSON_CONTENT_TYPE, body.into_bytes()))
    };

    match body {
        Ok((content_type, body)) => (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static(content_type))],
            body,
        )
            .into_response(),
        Err(e) => {
            let err = RouterError::Internal(format!("failed to encode reply: {e}"));
            error_response(&err, "encode".to_string())
        }
    }
}

fn download_response(download: Download) -> Response {
    let disposition = HeaderValue::from_str(&content_disposition(&download.file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static(download.content_type)),
            (CONTENT_DISPOSITION, disposition),
        ],
        download.data,
    )
        .into_response()
}

/// `attachment` disposition with an ASCII fallback name and an RFC 5987
/// encoded original.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

// =========================================================================
// Request Parsing
// =========================================================================

/// Raw request path below the files prefix, still percent-encoded.
fn relative_path(uri: &Uri) -> String {
    let path = uri.path();
    let rest = path.strip_prefix(FILES_PREFIX).unwrap_or(path);
    rest.strip_prefix('/').unwrap_or(rest).to_string()
}

fn wants_msgpack(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(MSGPACK_CONTENT_TYPE))
}

fn context(verb: Verb, path: &str) -> String {
    format!("{verb} /{path}")
}
