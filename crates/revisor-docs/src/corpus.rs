use std::path::PathBuf;
use std::sync::Arc;

use revisor_core::DocumentsConfig;

use crate::extract::{extractor_for, TextExtractor};
use crate::walker::{discover_documents, fingerprint, DocumentEntry};

/// Concatenated reference text, bounded to a character budget.
///
/// # Examples
///
/// ```
/// use revisor_docs::corpus::ReferenceCorpus;
///
/// let corpus = ReferenceCorpus::empty();
/// assert!(corpus.is_empty());
/// assert_eq!(corpus.prefix(2000), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCorpus {
    text: String,
    documents: Vec<PathBuf>,
    skipped: Vec<SkippedDocument>,
}

/// A document left out of the corpus because it could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    /// Path of the unreadable document.
    pub path: PathBuf,
    /// Why extraction failed.
    pub reason: String,
}

impl ReferenceCorpus {
    /// A corpus with no reference text.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a corpus directly from text, applying the character budget.
    ///
    /// # Examples
    ///
    /// ```
    /// use revisor_docs::corpus::ReferenceCorpus;
    ///
    /// let corpus = ReferenceCorpus::from_text("abcdef", 4);
    /// assert_eq!(corpus.text(), "abcd");
    /// ```
    pub fn from_text(text: &str, max_chars: usize) -> Self {
        Self {
            text: truncate_chars(text, max_chars).to_string(),
            ..Self::default()
        }
    }

    /// The bounded corpus text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether no reference text was gathered.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length of the corpus in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// First `max_chars` characters of the corpus.
    pub fn prefix(&self, max_chars: usize) -> &str {
        truncate_chars(&self.text, max_chars)
    }

    /// Documents that contributed text, in discovery order.
    pub fn documents(&self) -> &[PathBuf] {
        &self.documents
    }

    /// Documents that failed to extract.
    pub fn skipped(&self) -> &[SkippedDocument] {
        &self.skipped
    }
}

/// Return the longest prefix of `s` holding at most `max_chars` characters.
///
/// Never splits a multi-byte character.
///
/// # Examples
///
/// ```
/// use revisor_docs::corpus::truncate_chars;
///
/// assert_eq!(truncate_chars("ação", 2), "aç");
/// assert_eq!(truncate_chars("abc", 10), "abc");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Extract and concatenate `entries` in order until `max_chars` is reached.
///
/// Unreadable documents are recorded in [`ReferenceCorpus::skipped`] and
/// logged; they never abort the build.
pub fn build_corpus(
    entries: &[DocumentEntry],
    extractor: &dyn TextExtractor,
    max_chars: usize,
) -> ReferenceCorpus {
    let mut corpus = ReferenceCorpus::empty();
    let mut chars = 0usize;

    for entry in entries {
        if chars >= max_chars {
            break;
        }
        match extractor.extract(&entry.path) {
            Ok(text) => {
                let remaining = max_chars - chars;
                let taken = truncate_chars(&text, remaining);
                chars += taken.chars().count();
                corpus.text.push_str(taken);
                corpus.documents.push(entry.path.clone());
            }
            Err(e) => {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %e,
                    "skipping unreadable reference document"
                );
                corpus.skipped.push(SkippedDocument {
                    path: entry.path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    corpus
}

/// Loads the reference corpus and caches it until the document set changes.
///
/// Each [`load`](Self::load) re-scans the directory (cheap metadata only) and
/// re-extracts text only when the fingerprint of the scanned set differs from
/// the cached one.
pub struct DocumentLoader {
    config: DocumentsConfig,
    extractor: Box<dyn TextExtractor>,
    cached: Option<(String, Arc<ReferenceCorpus>)>,
    dir_missing: bool,
}

impl DocumentLoader {
    /// Create a loader using the extractor matching the configured extension.
    pub fn new(config: DocumentsConfig) -> Self {
        let extractor = extractor_for(&config.extension);
        Self::with_extractor(config, extractor)
    }

    /// Create a loader with a custom extractor.
    pub fn with_extractor(config: DocumentsConfig, extractor: Box<dyn TextExtractor>) -> Self {
        Self {
            config,
            extractor,
            cached: None,
            dir_missing: false,
        }
    }

    /// Settings this loader scans with.
    pub fn config(&self) -> &DocumentsConfig {
        &self.config
    }

    /// Return the current corpus, rebuilding it if the documents changed.
    pub fn load(&mut self) -> Arc<ReferenceCorpus> {
        self.check_dir();

        let entries = discover_documents(
            &self.config.dir,
            &self.config.extension,
            self.config.max_depth,
        );
        let key = fingerprint(&entries);

        if let Some((cached_key, corpus)) = &self.cached {
            if *cached_key == key {
                tracing::debug!(documents = entries.len(), "reference corpus cache hit");
                return Arc::clone(corpus);
            }
        }

        let corpus = Arc::new(build_corpus(
            &entries,
            self.extractor.as_ref(),
            self.config.max_chars,
        ));
        tracing::info!(
            documents = corpus.documents().len(),
            skipped = corpus.skipped().len(),
            chars = corpus.char_len(),
            "reference corpus built"
        );
        self.cached = Some((key, Arc::clone(&corpus)));
        corpus
    }

    /// Warn when the document directory goes missing, once per disappearance.
    /// Returns whether a warning was logged.
    fn check_dir(&mut self) -> bool {
        let missing = !self.config.dir.is_dir();
        let warn = missing && !self.dir_missing;
        if warn {
            tracing::warn!(
                dir = %self.config.dir.display(),
                "reference document directory not found"
            );
        }
        self.dir_missing = missing;
        warn
    }

    /// Drop the cached corpus so the next load re-extracts everything.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
