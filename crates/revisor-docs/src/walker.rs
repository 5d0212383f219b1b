use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha2::{Digest, Sha256};

/// A reference document found during discovery.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use revisor_docs::walker::DocumentEntry;
///
/// let entry = DocumentEntry {
///     path: PathBuf::from("manual.pdf"),
///     len: 1024,
///     modified: None,
/// };
/// assert_eq!(entry.len, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    /// Path to the document (as walked, i.e. prefixed by the scanned directory).
    pub path: PathBuf,
    /// File size in bytes.
    pub len: u64,
    /// Last modification time, when the platform reports one.
    pub modified: Option<SystemTime>,
}

/// Find documents under `dir` whose extension matches `extension`.
///
/// Matching is case-insensitive (`Manual.PDF` counts as a `pdf`). Hidden
/// files are skipped; `.gitignore` rules are not applied since reference
/// manuals are commonly kept out of version control. Results are sorted by
/// path so discovery order is stable across runs and platforms.
///
/// A missing or unreadable directory yields an empty list.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use revisor_docs::walker::discover_documents;
///
/// let docs = discover_documents(Path::new("."), "pdf", 1);
/// for d in &docs {
///     println!("{}", d.path.display());
/// }
/// ```
pub fn discover_documents(dir: &Path, extension: &str, max_depth: usize) -> Vec<DocumentEntry> {
    let walker = ignore::WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(max_depth))
        .build();

    let mut entries = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }

        let metadata = match std::fs::metadata(path) {
            Ok(m) => m,
            Err(_) => continue,
        };

        entries.push(DocumentEntry {
            path: path.to_path_buf(),
            len: metadata.len(),
            modified: metadata.modified().ok(),
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

/// Hash identifying a document set: paths, sizes, and modification times.
///
/// Two scans of an unchanged directory produce the same fingerprint; adding,
/// removing, or rewriting any document changes it.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use revisor_docs::walker::{fingerprint, DocumentEntry};
///
/// let a = vec![DocumentEntry { path: PathBuf::from("a.pdf"), len: 1, modified: None }];
/// let b = vec![DocumentEntry { path: PathBuf::from("a.pdf"), len: 2, modified: None }];
/// assert_ne!(fingerprint(&a), fingerprint(&b));
/// assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
/// ```
pub fn fingerprint(entries: &[DocumentEntry]) -> String {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.path.to_string_lossy().as_bytes());
        hasher.update([0]);
        hasher.update(entry.len.to_le_bytes());
        let nanos = entry
            .modified
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        hasher.update(nanos.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}
