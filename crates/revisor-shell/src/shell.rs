use std::path::Path;
use std::sync::Arc;

use revisor_auth::Session;
use revisor_core::{CodeSubmission, OutputConfig, RevisorError};
use revisor_docs::DocumentLoader;
use revisor_review::{CodeReviewer, ReviewerChat};

use crate::render::RenderedResult;

/// Everything a shell needs besides the session.
pub struct ShellServices {
    /// Reference manual loader, with its corpus cache.
    pub loader: DocumentLoader,
    /// The review pipeline.
    pub reviewer: Arc<dyn CodeReviewer>,
    /// Conversational side path.
    pub chat: ReviewerChat,
    /// Artifact names and output directory.
    pub output: OutputConfig,
}

/// State of one signed-in user's interaction: the uploaded code, the
/// optional question, and the last review result.
///
/// Construction requires a [`Session`], so nothing here runs for a user who
/// has not logged in.
pub struct InteractionShell {
    session: Session,
    services: ShellServices,
    submission: Option<CodeSubmission>,
    question: Option<String>,
    last_result: Option<RenderedResult>,
}

impl InteractionShell {
    /// Open a shell for an authorized session.
    pub fn new(session: Session, services: ShellServices) -> Self {
        tracing::debug!(email = %session.email(), "shell opened");
        Self {
            session,
            services,
            submission: None,
            question: None,
            last_result: None,
        }
    }

    /// The session this shell belongs to.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Close the shell and hand back its services.
    pub fn into_services(self) -> ShellServices {
        self.services
    }

    /// Replace the current submission with `bytes`, decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::InvalidSubmission`] for non-UTF-8 content; the
    /// previous submission is kept in that case.
    pub fn upload(&mut self, name: &str, bytes: &[u8]) -> Result<&CodeSubmission, RevisorError> {
        let submission = CodeSubmission::from_bytes(name, bytes)?;
        tracing::info!(file = name, lines = submission.line_count(), "code uploaded");
        self.last_result = None;
        Ok(&*self.submission.insert(submission))
    }

    /// Upload a file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::FileNotFound`] if `path` does not exist, or any
    /// error from [`upload`](Self::upload).
    pub fn upload_file(&mut self, path: &Path) -> Result<&CodeSubmission, RevisorError> {
        if !path.is_file() {
            return Err(RevisorError::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.upload(&name, &bytes)
    }

    /// The current submission, if any.
    pub fn submission(&self) -> Option<&CodeSubmission> {
        self.submission.as_ref()
    }

    /// Set or clear the question. Blank text clears it.
    pub fn set_question(&mut self, question: Option<String>) {
        self.question = question
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());
    }

    /// The current question, if any.
    pub fn question(&self) -> Option<&str> {
        self.question.as_deref()
    }

    /// The result of the last successful review of the current submission.
    pub fn last_result(&self) -> Option<&RenderedResult> {
        self.last_result.as_ref()
    }

    /// Output settings the shell renders with.
    pub fn output(&self) -> &OutputConfig {
        &self.services.output
    }

    /// Review the current submission.
    ///
    /// Returns `Ok(None)` without doing anything when no code is uploaded.
    ///
    /// # Errors
    ///
    /// Propagates pipeline failures. Session and submission stay intact, so
    /// the review can simply be retried.
    pub async fn run_review(&mut self) -> Result<Option<RenderedResult>, RevisorError> {
        let Some(submission) = &self.submission else {
            return Ok(None);
        };
        let corpus = self.services.loader.load();
        let result = self.services.reviewer.review(submission, &corpus).await?;
        let rendered = RenderedResult::new(&result, &self.services.output);
        self.last_result = Some(rendered.clone());
        Ok(Some(rendered))
    }

    /// Ask the current question about the current submission.
    ///
    /// Returns `Ok(None)` without calling the chat model unless both a
    /// submission and a question are present.
    ///
    /// # Errors
    ///
    /// Propagates chat model failures.
    pub async fn ask(&mut self) -> Result<Option<String>, RevisorError> {
        let (Some(submission), Some(question)) = (&self.submission, &self.question) else {
            return Ok(None);
        };
        let corpus = self.services.loader.load();
        let reference = corpus.prefix(self.services.loader.config().chat_chars);
        let answer = self
            .services
            .chat
            .ask(reference, submission, question)
            .await?;
        Ok(Some(answer))
    }
}
