use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::OutputConfig;
use crate::error::RevisorError;

/// Raw text of an uploaded source file.
///
/// Immutable once read; lives for one user interaction.
///
/// # Examples
///
/// ```
/// use revisor_core::CodeSubmission;
///
/// let code = CodeSubmission::from_bytes("report.txt", b"SELECT * FROM mara.").unwrap();
/// assert_eq!(code.name(), "report.txt");
/// assert_eq!(code.line_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeSubmission {
    name: String,
    content: String,
}

impl CodeSubmission {
    /// Build a submission from already-decoded text.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Decode an uploaded file as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::InvalidSubmission`] if the bytes are not valid UTF-8.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, RevisorError> {
        let name = name.into();
        let content = std::str::from_utf8(bytes).map_err(|e| {
            RevisorError::InvalidSubmission(format!("{name} is not UTF-8 text: {e}"))
        })?;
        Ok(Self::new(name, content))
    }

    /// File name the submission was uploaded as.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full text of the submission.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of lines in the submission.
    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Kind of text the review pipeline produced.
///
/// # Examples
///
/// ```
/// use revisor_core::{ArtifactKind, OutputConfig};
///
/// let output = OutputConfig::default();
/// assert_eq!(ArtifactKind::MarkupDocument.filename(&output), "revisao.xml");
/// assert_eq!(ArtifactKind::SourceCode.content_type(), "text/plain");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    /// Optimized source code.
    SourceCode,
    /// A `<review>` document with per-line suggestions.
    MarkupDocument,
}

impl ArtifactKind {
    /// Download file name for this kind.
    pub fn filename<'a>(&self, output: &'a OutputConfig) -> &'a str {
        match self {
            ArtifactKind::SourceCode => &output.source_filename,
            ArtifactKind::MarkupDocument => &output.markup_filename,
        }
    }

    /// MIME type used in the download data URI.
    pub fn content_type(&self) -> &'static str {
        match self {
            ArtifactKind::SourceCode => "text/plain",
            ArtifactKind::MarkupDocument => "application/xml",
        }
    }

    /// Syntax label used when displaying the result.
    pub fn language<'a>(&self, output: &'a OutputConfig) -> &'a str {
        match self {
            ArtifactKind::SourceCode => &output.source_language,
            ArtifactKind::MarkupDocument => "xml",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::SourceCode => write!(f, "source"),
            ArtifactKind::MarkupDocument => write!(f, "markup"),
        }
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use revisor_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown with a fenced result and an HTML download link.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
