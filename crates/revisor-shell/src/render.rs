use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use revisor_core::{ArtifactKind, OutputConfig, OutputFormat, RevisorError};
use revisor_review::PipelineResult;
use serde::Serialize;

/// A downloadable copy of a pipeline result.
///
/// # Examples
///
/// ```
/// use revisor_core::{ArtifactKind, OutputConfig};
/// use revisor_shell::DownloadArtifact;
///
/// let artifact = DownloadArtifact::new(ArtifactKind::MarkupDocument, "<review/>", &OutputConfig::default());
/// assert_eq!(artifact.filename, "revisao.xml");
/// assert!(artifact.data_uri.starts_with("data:application/xml;base64,"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadArtifact {
    /// Suggested file name.
    pub filename: String,
    /// MIME type of the content.
    pub content_type: String,
    /// `data:` URI embedding the base64 content.
    pub data_uri: String,
    #[serde(skip)]
    content: String,
}

impl DownloadArtifact {
    /// Package `content` for download under the name configured for `kind`.
    pub fn new(kind: ArtifactKind, content: &str, output: &OutputConfig) -> Self {
        let content_type = kind.content_type();
        Self {
            filename: kind.filename(output).to_string(),
            content_type: content_type.to_string(),
            data_uri: format!("data:{content_type};base64,{}", STANDARD.encode(content)),
            content: content.to_string(),
        }
    }

    /// HTML anchor that downloads the artifact when clicked.
    pub fn to_html_link(&self) -> String {
        format!(
            "<a href=\"{}\" download=\"{}\">📥 Download result</a>",
            self.data_uri, self.filename
        )
    }

    /// Write the artifact into `dir`, returning the file path.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Io`] if the directory or file cannot be written.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, RevisorError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// A pipeline result prepared for display and download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedResult {
    /// Which branch the pipeline took.
    pub kind: ArtifactKind,
    /// Syntax-highlighting language for `body`.
    pub language: String,
    /// The artifact text.
    pub body: String,
    /// Download packaging of `body`.
    pub artifact: DownloadArtifact,
}

impl RenderedResult {
    /// Render `result` with the names configured in `output`.
    pub fn new(result: &PipelineResult, output: &OutputConfig) -> Self {
        let kind = result.kind();
        Self {
            kind,
            language: kind.language(output).to_string(),
            body: result.content().to_string(),
            artifact: DownloadArtifact::new(kind, result.content(), output),
        }
    }

    /// Format for terminal or machine consumption.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Serialization`] if JSON encoding fails.
    pub fn format(&self, format: OutputFormat) -> Result<String, RevisorError> {
        Ok(match format {
            OutputFormat::Text => format!(
                "── {} ({}) ──\n{}\n",
                self.artifact.filename, self.language, self.body
            ),
            OutputFormat::Markdown => format!(
                "```{}\n{}\n```\n\n{}\n",
                self.language,
                self.body,
                self.artifact.to_html_link()
            ),
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_result_renders_as_xml() {
        let result = PipelineResult::MarkupDocument("<review>OK</review>".into());
        let rendered = RenderedResult::new(&result, &OutputConfig::default());
        assert_eq!(rendered.kind, ArtifactKind::MarkupDocument);
        assert_eq!(rendered.language, "xml");
        assert_eq!(rendered.artifact.filename, "revisao.xml");
        assert_eq!(rendered.artifact.content_type, "application/xml");
        assert_eq!(
            rendered.artifact.data_uri,
            format!("data:application/xml;base64,{}", STANDARD.encode("<review>OK</review>"))
        );
    }

    #[test]
    fn source_result_renders_as_abap() {
        let result = PipelineResult::SourceCode("IMPROVED CODE".into());
        let rendered = RenderedResult::new(&result, &OutputConfig::default());
        assert_eq!(rendered.language, "abap");
        assert_eq!(rendered.artifact.filename, "codigo_otimizado.abap");
        assert_eq!(rendered.artifact.content_type, "text/plain");
    }

    #[test]
    fn filenames_follow_config() {
        let output = OutputConfig {
            source_filename: "optimized.abap".into(),
            ..OutputConfig::default()
        };
        let rendered = RenderedResult::new(&PipelineResult::SourceCode("x".into()), &output);
        assert_eq!(rendered.artifact.filename, "optimized.abap");
    }

    #[test]
    fn html_link_downloads_with_filename() {
        let artifact =
            DownloadArtifact::new(ArtifactKind::SourceCode, "WRITE 'x'.", &OutputConfig::default());
        let link = artifact.to_html_link();
        assert!(link.starts_with("<a href=\"data:text/plain;base64,"));
        assert!(link.contains("download=\"codigo_otimizado.abap\""));
        assert!(link.ends_with("📥 Download result</a>"));
    }

    #[test]
    fn write_to_saves_content() {
        let dir = tempfile::tempdir().unwrap();
        let artifact =
            DownloadArtifact::new(ArtifactKind::MarkupDocument, "<review/>", &OutputConfig::default());
        let path = artifact.write_to(&dir.path().join("out")).unwrap();
        assert_eq!(path.file_name().unwrap(), "revisao.xml");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<review/>");
    }

    #[test]
    fn formats() {
        let rendered = RenderedResult::new(
            &PipelineResult::MarkupDocument("<review>OK</review>".into()),
            &OutputConfig::default(),
        );
        let md = rendered.format(OutputFormat::Markdown).unwrap();
        assert!(md.starts_with("```xml\n<review>OK</review>\n```"));
        assert!(md.contains("download=\"revisao.xml\""));

        let json: serde_json::Value =
            serde_json::from_str(&rendered.format(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["kind"], "markupDocument");
        assert_eq!(json["artifact"]["contentType"], "application/xml");
        assert!(json["artifact"].get("content").is_none());

        let text = rendered.format(OutputFormat::Text).unwrap();
        assert!(text.contains("revisao.xml"));
    }
}
