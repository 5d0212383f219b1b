use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use revisor_core::{AgentsConfig, ArtifactKind, CodeSubmission, RevisorError};
use revisor_docs::ReferenceCorpus;

use crate::agent::AgentRole;
use crate::llm::ChatModel;
use crate::prompt;
use crate::search::SearchTool;

/// What the reviewer found, handed unchanged to the optimizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewFindings(String);

impl ReviewFindings {
    /// Wrap the reviewer's answer.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The reviewer's answer.
    pub fn text(&self) -> &str {
        &self.0
    }
}

/// Final artifact of a review run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    /// Optimized source code.
    SourceCode(String),
    /// A structured XML review document.
    MarkupDocument(String),
}

impl PipelineResult {
    /// The artifact body.
    pub fn content(&self) -> &str {
        match self {
            Self::SourceCode(s) | Self::MarkupDocument(s) => s,
        }
    }

    /// Which kind of artifact this is.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::SourceCode(_) => ArtifactKind::SourceCode,
            Self::MarkupDocument(_) => ArtifactKind::MarkupDocument,
        }
    }
}

/// Anything that can turn a submission and its reference text into a result.
#[async_trait]
pub trait CodeReviewer: Send + Sync {
    /// Review `submission` against `corpus`.
    ///
    /// # Errors
    ///
    /// Returns the first model, search, or agent error encountered.
    async fn review(
        &self,
        submission: &CodeSubmission,
        corpus: &ReferenceCorpus,
    ) -> Result<PipelineResult, RevisorError>;
}

/// Two agents run in sequence: a reviewer, then an optimizer that consumes
/// the reviewer's findings.
pub struct ReviewPipeline {
    reviewer: AgentRole,
    optimizer: AgentRole,
}

impl ReviewPipeline {
    /// Build both agents over one shared model client.
    pub fn new(
        llm: Arc<dyn ChatModel>,
        search: Option<Arc<dyn SearchTool>>,
        agents: &AgentsConfig,
    ) -> Self {
        let reviewer = AgentRole::new(
            prompt::REVIEWER_ROLE,
            prompt::REVIEWER_GOAL,
            prompt::REVIEWER_BACKSTORY,
            Arc::clone(&llm),
        )
        .with_search(search.clone())
        .with_max_iterations(agents.max_iterations);

        let optimizer = AgentRole::new(
            prompt::OPTIMIZER_ROLE,
            prompt::OPTIMIZER_GOAL,
            prompt::OPTIMIZER_BACKSTORY,
            llm,
        )
        .with_search(search)
        .with_max_iterations(agents.max_iterations);

        Self {
            reviewer,
            optimizer,
        }
    }

    /// Run the reviewer over the code and the reference text.
    ///
    /// # Errors
    ///
    /// Propagates any agent failure.
    pub async fn review_stage(
        &self,
        submission: &CodeSubmission,
        corpus: &ReferenceCorpus,
    ) -> Result<ReviewFindings, RevisorError> {
        tracing::info!(
            agent = self.reviewer.role(),
            model = self.reviewer.model(),
            file = submission.name(),
            reference_chars = corpus.char_len(),
            "Running code review"
        );
        let started = Instant::now();
        let task = prompt::review_task(submission, corpus.text());
        let answer = self.reviewer.perform(&task).await?;
        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = answer.len(),
            "Review finished"
        );
        Ok(ReviewFindings::new(answer))
    }

    /// Run the optimizer over the code and the review findings.
    ///
    /// # Errors
    ///
    /// Propagates any agent failure.
    pub async fn optimize_stage(
        &self,
        submission: &CodeSubmission,
        findings: &ReviewFindings,
    ) -> Result<PipelineResult, RevisorError> {
        tracing::info!(
            agent = self.optimizer.role(),
            model = self.optimizer.model(),
            file = submission.name(),
            "Optimizing code"
        );
        let started = Instant::now();
        let task = prompt::optimize_task(submission, findings);
        let answer = self.optimizer.perform(&task).await?;
        let result = prompt::parse_optimizer_output(&answer);
        tracing::info!(
            kind = %result.kind(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = result.content().len(),
            "Optimization finished"
        );
        Ok(result)
    }

    /// Review, then optimize.
    ///
    /// # Errors
    ///
    /// Stops at the first failing stage.
    pub async fn run(
        &self,
        submission: &CodeSubmission,
        corpus: &ReferenceCorpus,
    ) -> Result<PipelineResult, RevisorError> {
        let findings = self.review_stage(submission, corpus).await?;
        self.optimize_stage(submission, &findings).await
    }
}

#[async_trait]
impl CodeReviewer for ReviewPipeline {
    async fn review(
        &self,
        submission: &CodeSubmission,
        corpus: &ReferenceCorpus,
    ) -> Result<PipelineResult, RevisorError> {
        self.run(submission, corpus).await
    }
}
