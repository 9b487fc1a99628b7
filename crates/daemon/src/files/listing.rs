//! Directory listing with excluded directory names.
//!
//! A listing reports the immediate subdirectories and files of one directory.
//! Entries are captured as value structs from a single metadata query each, in
//! the order the filesystem enumerates them.

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use protocol::messages::{File, Folder, FolderResult};
use tracing::debug;

use super::classify::extension_of;
use super::error::FileError;
use super::root::RootContext;

/// A subdirectory with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    /// Directory name (not full path).
    pub name: String,
    /// Last modified timestamp.
    pub modified: DateTime<Utc>,
    /// Number of regular files directly inside.
    pub file_count: u64,
}

impl FolderEntry {
    /// Convert to protocol Folder.
    pub fn to_protocol(&self) -> Folder {
        Folder {
            name: self.name.clone(),
            modified_date: self.modified,
            file_count: self.file_count,
        }
    }
}

/// A file with metadata and, for direct text reads, its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// File name (not full path).
    pub name: String,
    /// Extension including the leading dot, or empty.
    pub extension: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modified timestamp.
    pub modified: DateTime<Utc>,
    /// Whether the extension is in the text allow-list.
    pub is_text: bool,
    /// Text contents; never set by a listing.
    pub contents: Option<String>,
}

impl FileEntry {
    /// Capture an entry from metadata already read for `path`.
    pub(crate) fn from_metadata(root: &RootContext, path: &Path, metadata: &fs::Metadata) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name,
            extension: extension_of(path),
            size: metadata.len(),
            modified: modified_utc(metadata),
            is_text: root.is_text_file(path),
            contents: None,
        }
    }

    /// Convert to protocol File.
    pub fn to_protocol(&self) -> File {
        File {
            name: self.name.clone(),
            extension: self.extension.clone(),
            file_size_bytes: self.size,
            modified_date: self.modified,
            is_text_file: self.is_text,
            contents: self.contents.clone(),
        }
    }
}

/// Folders and files of one directory, each in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Subdirectories, minus excluded names.
    pub folders: Vec<FolderEntry>,
    /// Regular files.
    pub files: Vec<FileEntry>,
}

impl Listing {
    /// Convert to protocol FolderResult.
    pub fn to_protocol(&self) -> FolderResult {
        FolderResult {
            folders: self.folders.iter().map(FolderEntry::to_protocol).collect(),
            files: self.files.iter().map(FileEntry::to_protocol).collect(),
        }
    }
}

/// List the immediate contents of `dir`.
///
/// Directories whose name is excluded by the root context are skipped; files
/// are never excluded. Entries that cannot be inspected are left out.
pub fn list_directory(root: &RootContext, dir: &Path) -> Result<Listing, FileError> {
    let metadata = fs::metadata(dir).map_err(|e| FileError::from_io(e, root, dir))?;
    if !metadata.is_dir() {
        return Err(FileError::NotFound(root.display_path(dir)));
    }

    let entries = fs::read_dir(dir).map_err(|e| FileError::from_io(e, root, dir))?;

    let mut listing = Listing::default();

    for entry_result in entries {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                debug!(dir = %root.display_path(dir), error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let path = entry.path();

        // Follows symlinks; dangling links fail here and are skipped.
        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                debug!(path = %root.display_path(&path), error = %e, "Skipping entry without metadata");
                continue;
            }
        };

        if metadata.is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if root.is_excluded(&name) {
                continue;
            }

            let file_count = count_files(root, &path);
            listing.folders.push(FolderEntry {
                name,
                modified: modified_utc(&metadata),
                file_count,
            });
        } else if metadata.is_file() {
            listing
                .files
                .push(FileEntry::from_metadata(root, &path, &metadata));
        } else {
            debug!(path = %root.display_path(&path), "Skipping special file");
        }
    }

    debug!(
        dir = %root.display_path(dir),
        folders = listing.folders.len(),
        files = listing.files.len(),
        "Listed directory"
    );

    Ok(listing)
}

/// Number of regular files directly inside `dir`.
fn count_files(root: &RootContext, dir: &Path) -> u64 {
    match fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|e| fs::metadata(e.path()).map(|m| m.is_file()).unwrap_or(false))
            .count() as u64,
        Err(e) => {
            debug!(dir = %root.display_path(dir), error = %e, "Cannot count files");
            0
        }
    }
}

pub(crate) fn modified_utc(metadata: &fs::Metadata) -> DateTime<Utc> {
    DateTime::<Utc>::from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_root(dir: &Path) -> RootContext {
        RootContext::new(dir, [".git", "node_modules"], [".txt", ".md"])
    }

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("docs/nested")).unwrap();
        fs::create_dir_all(dir.join(".git/objects")).unwrap();
        fs::create_dir_all(dir.join("node_modules")).unwrap();

        fs::write(dir.join("notes.txt"), "hello").unwrap();
        fs::write(dir.join("logo.png"), [0x89, b'P', b'N', b'G']).unwrap();
        fs::write(dir.join("docs/a.md"), "# A").unwrap();
        fs::write(dir.join("docs/b.bin"), [0u8; 16]).unwrap();
        fs::write(dir.join("docs/nested/deep.txt"), "deep").unwrap();
        fs::write(dir.join(".git/HEAD"), "ref: refs/heads/main").unwrap();
    }

    #[test]
    fn test_list_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, temp_dir.path()).unwrap();

        let folder_names: Vec<&str> = listing.folders.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(folder_names, vec!["docs"]);

        let mut file_names: Vec<&str> = listing.files.iter().map(|f| f.name.as_str()).collect();
        file_names.sort();
        assert_eq!(file_names, vec!["logo.png", "notes.txt"]);
    }

    #[test]
    fn test_entries_convert_field_for_field() {
        let modified = Utc::now();
        let listing = Listing {
            folders: vec![FolderEntry {
                name: "docs".to_string(),
                modified,
                file_count: 3,
            }],
            files: vec![FileEntry {
                name: "notes.txt".to_string(),
                extension: ".txt".to_string(),
                size: 5,
                modified,
                is_text: true,
                contents: None,
            }],
        };

        let wire = listing.to_protocol();

        assert_eq!(
            wire.folders,
            vec![Folder {
                name: "docs".to_string(),
                modified_date: modified,
                file_count: 3,
            }]
        );
        assert_eq!(
            wire.files,
            vec![File {
                name: "notes.txt".to_string(),
                extension: ".txt".to_string(),
                file_size_bytes: 5,
                modified_date: modified,
                is_text_file: true,
                contents: None,
            }]
        );
    }

    #[test]
    fn test_folder_file_count_is_not_recursive() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, temp_dir.path()).unwrap();
        let docs = listing.folders.iter().find(|f| f.name == "docs").unwrap();

        // a.md and b.bin; nested/ and its file are not counted.
        assert_eq!(docs.file_count, 2);
    }

    #[test]
    fn test_file_entries_are_classified() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, temp_dir.path()).unwrap();

        let notes = listing.files.iter().find(|f| f.name == "notes.txt").unwrap();
        assert!(notes.is_text);
        assert_eq!(notes.extension, ".txt");
        assert_eq!(notes.size, 5);

        let logo = listing.files.iter().find(|f| f.name == "logo.png").unwrap();
        assert!(!logo.is_text);
        assert_eq!(logo.extension, ".png");
    }

    #[test]
    fn test_listing_never_includes_contents() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, temp_dir.path()).unwrap();
        assert!(listing.files.iter().all(|f| f.contents.is_none()));
    }

    #[test]
    fn test_excluded_directory_contents_still_listable() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, &temp_dir.path().join(".git")).unwrap();

        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "HEAD");
        assert_eq!(listing.folders.len(), 1);
    }

    #[test]
    fn test_exclusion_applies_to_directories_only() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".git"), "gitdir: ../.git/worktrees/x").unwrap();
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, temp_dir.path()).unwrap();

        assert!(listing.folders.is_empty());
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, ".git");
    }

    #[test]
    fn test_list_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = test_root(temp_dir.path());

        let result = list_directory(&root, &temp_dir.path().join("missing"));
        assert!(matches!(result, Err(FileError::NotFound(ref p)) if p == "missing"));
    }

    #[test]
    fn test_list_file_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = test_root(temp_dir.path());

        let result = list_directory(&root, &temp_dir.path().join("notes.txt"));
        assert!(matches!(result, Err(FileError::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink(
            temp_dir.path().join("gone.txt"),
            temp_dir.path().join("dangling.txt"),
        )
        .unwrap();
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, temp_dir.path()).unwrap();

        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "real.txt");
    }

    #[test]
    fn test_listing_to_protocol() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());
        let root = test_root(temp_dir.path());

        let listing = list_directory(&root, &temp_dir.path().join("docs")).unwrap();
        let proto = listing.to_protocol();

        assert_eq!(proto.folders.len(), 1);
        assert_eq!(proto.folders[0].name, "nested");
        assert_eq!(proto.folders[0].file_count, 1);

        let md = proto.files.iter().find(|f| f.name == "a.md").unwrap();
        assert!(md.is_text_file);
        assert_eq!(md.file_size_bytes, 3);
        assert!(md.contents.is_none());
    }
}
