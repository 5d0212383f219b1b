//! Multi-agent ABAP code review.
//!
//! A reviewer agent reads the code alongside the reference manuals, then an
//! optimizer agent applies the findings and produces either optimized source
//! or an XML review document. Both agents may call a web search tool.

pub mod agent;
pub mod chat;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod search;

#[cfg(test)]
mod testing;

pub use agent::{AgentRole, Task};
pub use chat::{ConversationMemory, ReviewerChat};
pub use llm::{ChatModel, LlmClient};
pub use pipeline::{CodeReviewer, PipelineResult, ReviewFindings, ReviewPipeline};
pub use prompt::parse_optimizer_output;
pub use search::{SearchTool, SerperSearch};
