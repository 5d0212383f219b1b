//! Core types, configuration, and error handling for Revisor.
//!
//! This crate provides the shared foundation used by all other Revisor crates:
//! - [`RevisorError`]: unified error type using `thiserror`
//! - [`RevisorConfig`]: configuration loaded from `.revisor.toml`
//! - Shared types: [`CodeSubmission`], [`ArtifactKind`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{
    AgentsConfig, AuthConfig, ChatConfig, DocumentsConfig, LlmConfig, OutputConfig,
    RevisorConfig, SearchConfig, MODEL_KEY_VARS, SEARCH_KEY_VARS,
};
pub use error::RevisorError;
pub use types::{ArtifactKind, CodeSubmission, OutputFormat};

/// A convenience `Result` type for Revisor operations.
pub type Result<T> = std::result::Result<T, RevisorError>;
