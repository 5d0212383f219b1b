use std::path::PathBuf;

/// Errors that can occur across the Revisor crates.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary converts to a `miette` report at the boundary.
///
/// # Examples
///
/// ```
/// use revisor_core::RevisorError;
///
/// let err = RevisorError::Config("missing API key".into());
/// assert!(err.to_string().contains("missing API key"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum RevisorError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// LLM API or response error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Web search tool failure.
    #[error("search error: {0}")]
    Search(String),

    /// An agent could not complete its task.
    #[error("agent error: {0}")]
    Agent(String),

    /// A reference document could not be read or parsed.
    #[error("document error: {0}")]
    Document(String),

    /// The identity provider rejected or failed a sign-in request.
    ///
    /// Only logged; callers show [`RevisorError::Unauthorized`] instead.
    #[error("identity provider error: {0}")]
    IdentityProvider(String),

    /// Login was rejected. Carries no provider detail on purpose.
    #[error("login failed, check your credentials")]
    #[diagnostic(help("verify the email and password and try again"))]
    Unauthorized,

    /// The uploaded submission is unusable (e.g. not UTF-8 text).
    #[error("invalid submission: {0}")]
    InvalidSubmission(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
