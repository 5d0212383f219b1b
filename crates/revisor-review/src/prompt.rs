use revisor_core::CodeSubmission;
use serde::Deserialize;

use crate::agent::Task;
use crate::pipeline::{PipelineResult, ReviewFindings};

pub(crate) const REVIEWER_ROLE: &str = "ABAP Code Reviewer";
pub(crate) const REVIEWER_GOAL: &str =
    "Review ABAP code against best practices and the technical reference manuals";
pub(crate) const REVIEWER_BACKSTORY: &str =
    "You are an SAP specialist with years of experience reviewing ABAP code.";

pub(crate) const OPTIMIZER_ROLE: &str = "ABAP Optimizer";
pub(crate) const OPTIMIZER_GOAL: &str =
    "Improve ABAP code based on the review findings and the technical manuals";
pub(crate) const OPTIMIZER_BACKSTORY: &str =
    "You apply performance, security and clarity standards to ABAP code.";

/// Build the review task for `submission`, grounded on the reference text.
pub fn review_task(submission: &CodeSubmission, reference: &str) -> Task {
    let reference = if reference.trim().is_empty() {
        "(no reference documentation available)"
    } else {
        reference
    };
    Task {
        description: format!(
            "Review the ABAP code below. Use the information from the technical \
             manuals to suggest improvements.\n\n\
             Code ({name}):\n{code}\n\n\
             Technical documentation:\n{reference}",
            name = submission.name(),
            code = submission.content(),
        ),
        expected_output: "Detailed improvement suggestions, referencing the affected lines."
            .into(),
        json_output: false,
    }
}

/// Build the optimize task from the submission and the reviewer's findings.
pub fn optimize_task(submission: &CodeSubmission, findings: &ReviewFindings) -> Task {
    Task {
        description: format!(
            "Apply the improvements from the review to the code and deliver the result \
             either as optimized ABAP source or as an XML review document with \
             per-line suggestions.\n\n\
             Original code ({name}):\n{code}\n\n\
             Review findings:\n{findings}\n\n\
             Respond with a JSON object of the form \
             {{\"kind\": \"source\" | \"markup\", \"content\": \"...\"}}. \
             Use \"source\" when content is ABAP code and \"markup\" when content is an XML \
             document whose root element is <review>.",
            name = submission.name(),
            code = submission.content(),
            findings = findings.text(),
        ),
        expected_output: "Optimized ABAP code or an XML review document, wrapped in the JSON \
                          envelope."
            .into(),
        json_output: true,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum EnvelopeKind {
    Source,
    Markup,
}

#[derive(Deserialize)]
struct Envelope {
    kind: EnvelopeKind,
    content: String,
}

/// Classify the optimizer's raw reply.
///
/// The JSON envelope wins when present. Otherwise the reply is markup only
/// when the whole trimmed text is a `<review>` element; anything else is
/// source code.
///
/// # Examples
///
/// ```
/// use revisor_review::parse_optimizer_output;
/// use revisor_review::PipelineResult;
///
/// let markup = parse_optimizer_output(r#"{"kind":"markup","content":"<review>OK</review>"}"#);
/// assert_eq!(markup, PipelineResult::MarkupDocument("<review>OK</review>".into()));
///
/// let code = parse_optimizer_output("WRITE 'hello'.");
/// assert_eq!(code, PipelineResult::SourceCode("WRITE 'hello'.".into()));
/// ```
pub fn parse_optimizer_output(raw: &str) -> PipelineResult {
    let text = strip_code_fences(raw);

    if let Ok(envelope) = serde_json::from_str::<Envelope>(text) {
        return match envelope.kind {
            EnvelopeKind::Source => PipelineResult::SourceCode(envelope.content),
            EnvelopeKind::Markup => PipelineResult::MarkupDocument(envelope.content),
        };
    }

    tracing::debug!("optimizer reply is not an envelope, classifying by content");
    if is_review_document(text) {
        PipelineResult::MarkupDocument(text.to_string())
    } else {
        PipelineResult::SourceCode(text.to_string())
    }
}

fn is_review_document(text: &str) -> bool {
    let text = text.trim();
    let text = match text.strip_prefix("<?xml") {
        Some(rest) => match rest.find("?>") {
            Some(end) => rest[end + 2..].trim_start(),
            None => return false,
        },
        None => text,
    };
    let Some(rest) = text.strip_prefix("<review") else {
        return false;
    };
    if !(rest.starts_with(['>', '/']) || rest.starts_with(char::is_whitespace)) {
        return false;
    }
    let self_closing = rest.ends_with("/>") && !rest.contains('<');
    self_closing || text.ends_with("</review>")
}

/// Strip one surrounding markdown code fence, with or without an info string.
fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            let body = match inner.find('\n') {
                Some(nl) if !inner[..nl].trim().contains(' ') => &inner[nl + 1..],
                _ => inner,
            };
            return body.trim();
        }
    }
    trimmed
}
