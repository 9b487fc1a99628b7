//! Client path resolution confined to the sandbox root.
//!
//! Resolution is purely lexical: the relative path is decoded, split on both
//! separator styles and normalized before it is joined onto the root. No
//! filesystem call is made, so a traversal attempt is rejected before any
//! file is touched.

use std::path::PathBuf;

use super::error::FileError;
use super::root::RootContext;

/// Resolve a client-supplied relative path to an absolute path under the root.
///
/// The empty path, and any path that normalizes to nothing, is the root
/// itself.
pub fn resolve(root: &RootContext, relative: &str) -> Result<PathBuf, FileError> {
    let segments = normalize(relative)?;

    let mut resolved = root.root_dir().to_path_buf();
    resolved.extend(&segments);

    // Component-wise, so "/srv/files-evil" never passes for "/srv/files".
    if !resolved.starts_with(root.root_dir()) {
        return Err(FileError::InvalidPath(relative.to_string()));
    }

    Ok(resolved)
}

/// Normalize a relative path into plain segments.
///
/// Rejects NUL bytes, absolute and drive-prefixed input, and any `..` that
/// would climb above the first segment.
pub fn normalize(relative: &str) -> Result<Vec<String>, FileError> {
    let decoded = urlencoding::decode(relative)
        .map_err(|_| FileError::InvalidPath(format!("{relative} is not valid UTF-8")))?;

    if decoded.contains('\0') {
        return Err(FileError::InvalidPath(
            "path contains a NUL byte".to_string(),
        ));
    }

    let unified = decoded.replace('\\', "/");

    if unified.starts_with('/') {
        return Err(FileError::InvalidPath(format!(
            "{relative} is absolute; paths are relative to the root"
        )));
    }

    if has_drive_prefix(&unified) {
        return Err(FileError::InvalidPath(format!(
            "{relative} has a drive or volume prefix"
        )));
    }

    let mut segments: Vec<String> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                if segments.pop().is_none() {
                    return Err(FileError::InvalidPath(format!(
                        "{relative} escapes the root directory"
                    )));
                }
            }
            name => segments.push(name.to_string()),
        }
    }

    Ok(segments)
}

/// Validate the name of an uploaded file.
///
/// Browsers sometimes send the full client-side path, so only the last
/// segment is kept. The result is always a single plain file name.
pub fn resolve_file_name(name: &str) -> Result<String, FileError> {
    if name.contains('\0') {
        return Err(FileError::InvalidPath(
            "file name contains a NUL byte".to_string(),
        ));
    }

    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    match base {
        "" | "." | ".." => Err(FileError::InvalidPath(format!(
            "'{name}' is not a valid file name"
        ))),
        base if has_drive_prefix(base) => Err(FileError::InvalidPath(format!(
            "'{name}' is not a valid file name"
        ))),
        base => Ok(base.to_string()),
    }
}

/// `C:` style prefixes on the first segment.
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
