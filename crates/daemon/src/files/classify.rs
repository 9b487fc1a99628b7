//! Text/binary classification by file extension.

use std::collections::HashSet;
use std::path::Path;

/// Whether `extension` is in the text allow-list.
///
/// Matching is exact and case-sensitive; `extension` must carry its leading
/// dot, the same way the allow-list is configured.
pub fn is_text_extension(extension: &str, allow_list: &HashSet<String>) -> bool {
    !extension.is_empty() && allow_list.contains(extension)
}

/// Extension of the file name at `path`, including the leading dot.
///
/// Everything from the last `.` of the file name onward, so `.bashrc` is its
/// own extension and `archive.tar.gz` has `.gz`. Names without a dot or with
/// a trailing dot have no extension.
pub fn extension_of(path: &Path) -> String {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return String::new();
    };

    match name.rfind('.') {
        Some(index) if index + 1 < name.len() => name[index..].to_string(),
        _ => String::new(),
    }
}
