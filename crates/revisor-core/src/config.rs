use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::RevisorError;

/// Environment variables checked (in order) for the model provider key.
pub const MODEL_KEY_VARS: &[&str] = &["OPENAI_API_KEY", "OPENAI"];

/// Environment variables checked (in order) for the search provider key.
pub const SEARCH_KEY_VARS: &[&str] = &["SERPER_API_KEY", "SERPER"];

/// Top-level configuration loaded from `.revisor.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use revisor_core::RevisorConfig;
///
/// let config = RevisorConfig::default();
/// assert_eq!(config.documents.max_chars, 8000);
/// assert_eq!(config.llm.model, "gpt-4o-mini");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevisorConfig {
    /// Model used by the reviewer/optimizer pipeline.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Model used by the single-turn question side path.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Web search tool available to both agents.
    #[serde(default)]
    pub search: SearchConfig,
    /// Reference document discovery and budgets.
    #[serde(default)]
    pub documents: DocumentsConfig,
    /// Identity provider settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Agent execution limits.
    #[serde(default)]
    pub agents: AgentsConfig,
    /// Result rendering and download artifacts.
    #[serde(default)]
    pub output: OutputConfig,
}

impl RevisorConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Io`] if the file cannot be read, or
    /// [`RevisorError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, RevisorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use revisor_core::RevisorConfig;
    ///
    /// let toml = r#"
    /// [documents]
    /// max_chars = 4000
    /// "#;
    /// let config = RevisorConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.documents.max_chars, 4000);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, RevisorError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Fill in credentials that the config file left empty.
    ///
    /// `lookup` resolves an environment variable name. Keys already present in
    /// the file win over the environment; blank keys count as missing. The
    /// `[chat]` client then inherits whatever key and base URL `[llm]`
    /// resolved to, unless set explicitly.
    ///
    /// # Examples
    ///
    /// ```
    /// use revisor_core::RevisorConfig;
    ///
    /// let mut config = RevisorConfig::default();
    /// config.apply_env(|name| (name == "SERPER").then(|| "serper-key".to_string()));
    /// assert_eq!(config.search.api_key.as_deref(), Some("serper-key"));
    /// assert!(config.llm.api_key.is_none());
    /// ```
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in [
            &mut self.llm.api_key,
            &mut self.chat.api_key,
            &mut self.search.api_key,
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                *key = None;
            }
        }

        let first = |vars: &[&str]| {
            vars.iter()
                .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))
        };

        if self.llm.api_key.is_none() {
            self.llm.api_key = first(MODEL_KEY_VARS);
        }
        if self.chat.api_key.is_none() {
            self.chat.api_key = first(MODEL_KEY_VARS);
        }
        if self.search.api_key.is_none() {
            self.search.api_key = first(SEARCH_KEY_VARS);
        }

        if self.chat.api_key.is_none() {
            self.chat.api_key = self.llm.api_key.clone();
        }
        if self.chat.base_url.is_none() {
            self.chat.base_url = self.llm.base_url.clone();
        }
    }
}

/// LLM provider configuration for the review pipeline.
///
/// # Examples
///
/// ```
/// use revisor_core::LlmConfig;
///
/// let config = LlmConfig::default();
/// assert_eq!(config.model, "gpt-4o-mini");
/// assert_eq!(config.max_tokens, Some(4000));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name (only OpenAI-compatible endpoints are supported).
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on generated tokens per call.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,
}

fn default_provider() -> String {
    "openai".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> Option<u32> {
    Some(4000)
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Model settings for the conversational side path.
///
/// Kept separate from [`LlmConfig`] so the two clients never share state.
///
/// # Examples
///
/// ```
/// use revisor_core::ChatConfig;
///
/// let chat = ChatConfig::default();
/// assert_eq!(chat.model, "gpt-4");
/// assert_eq!(chat.to_llm_config().max_tokens, None);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model identifier.
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Upper bound on generated tokens, unbounded when absent.
    pub max_tokens: Option<u32>,
}

fn default_chat_model() -> String {
    "gpt-4".into()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_chat_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

impl ChatConfig {
    /// View these settings as a client configuration.
    pub fn to_llm_config(&self) -> LlmConfig {
        LlmConfig {
            provider: default_provider(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Web search provider configuration.
///
/// # Examples
///
/// ```
/// use revisor_core::SearchConfig;
///
/// let config = SearchConfig::default();
/// assert_eq!(config.provider, "serper");
/// assert_eq!(config.num_results, 5);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search provider (default: `"serper"`).
    #[serde(default = "default_search_provider")]
    pub provider: String,
    /// API key for the search provider.
    pub api_key: Option<String>,
    /// Base URL of the search API.
    #[serde(default = "default_search_base_url")]
    pub base_url: String,
    /// Number of organic results handed back to the agent.
    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

fn default_search_provider() -> String {
    "serper".into()
}

fn default_search_base_url() -> String {
    "https://google.serper.dev".into()
}

fn default_num_results() -> usize {
    5
}

impl SearchConfig {
    /// Whether a usable (non-blank) API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
            api_key: None,
            base_url: default_search_base_url(),
            num_results: default_num_results(),
        }
    }
}

/// Reference document discovery settings.
///
/// # Examples
///
/// ```
/// use revisor_core::DocumentsConfig;
///
/// let config = DocumentsConfig::default();
/// assert_eq!(config.extension, "pdf");
/// assert_eq!(config.max_chars, 8000);
/// assert_eq!(config.chat_chars, 2000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// Directory scanned for reference documents.
    #[serde(default = "default_documents_dir")]
    pub dir: PathBuf,
    /// Recognized file extension, matched case-insensitively.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Character budget of the reference corpus.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    /// Character slice of the corpus sent with a question.
    #[serde(default = "default_chat_chars")]
    pub chat_chars: usize,
    /// Directory depth to scan (1 = only `dir` itself).
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_documents_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    "pdf".into()
}

fn default_max_chars() -> usize {
    8000
}

fn default_chat_chars() -> usize {
    2000
}

fn default_max_depth() -> usize {
    1
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            dir: default_documents_dir(),
            extension: default_extension(),
            max_chars: default_max_chars(),
            chat_chars: default_chat_chars(),
            max_depth: default_max_depth(),
        }
    }
}

/// Identity provider settings.
///
/// # Examples
///
/// ```
/// use revisor_core::AuthConfig;
///
/// let config = AuthConfig::default();
/// assert_eq!(config.firebase_config.to_str(), Some("firebase_config.json"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Path to the Firebase web-app JSON configuration.
    #[serde(default = "default_firebase_config")]
    pub firebase_config: PathBuf,
    /// Base URL of the identity toolkit REST API.
    #[serde(default = "default_identity_url")]
    pub identity_url: String,
}

fn default_firebase_config() -> PathBuf {
    PathBuf::from("firebase_config.json")
}

fn default_identity_url() -> String {
    "https://identitytoolkit.googleapis.com".into()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            firebase_config: default_firebase_config(),
            identity_url: default_identity_url(),
        }
    }
}

/// Agent execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Model round-trips allowed per task before a final answer is forced.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

fn default_max_iterations() -> usize {
    4
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
        }
    }
}

/// Result rendering and download artifact settings.
///
/// # Examples
///
/// ```
/// use revisor_core::OutputConfig;
///
/// let config = OutputConfig::default();
/// assert_eq!(config.markup_filename, "revisao.xml");
/// assert_eq!(config.source_filename, "codigo_otimizado.abap");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory where downloaded artifacts are written.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Artifact name for a markup review document.
    #[serde(default = "default_markup_filename")]
    pub markup_filename: String,
    /// Artifact name for optimized source code.
    #[serde(default = "default_source_filename")]
    pub source_filename: String,
    /// Syntax label used when displaying optimized source.
    #[serde(default = "default_source_language")]
    pub source_language: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_markup_filename() -> String {
    "revisao.xml".into()
}

fn default_source_filename() -> String {
    "codigo_otimizado.abap".into()
}

fn default_source_language() -> String {
    "abap".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            markup_filename: default_markup_filename(),
            source_filename: default_source_filename(),
            source_language: default_source_language(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = RevisorConfig::default();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.temperature, 0.2);
        assert_eq!(config.llm.max_tokens, Some(4000));
        assert_eq!(config.chat.model, "gpt-4");
        assert_eq!(config.search.base_url, "https://google.serper.dev");
        assert_eq!(config.documents.dir, PathBuf::from("."));
        assert_eq!(config.documents.max_depth, 1);
        assert_eq!(config.agents.max_iterations, 4);
        assert_eq!(config.output.source_language, "abap");
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[llm]
model = "gpt-4o"
base_url = "http://localhost:11434"
temperature = 0.0
max_tokens = 2000

[chat]
model = "gpt-4o-mini"

[search]
num_results = 3

[documents]
dir = "manuals"
extension = "PDF"
max_chars = 6000

[auth]
firebase_config = "config/firebase.json"

[output]
dir = "out"
markup_filename = "review.xml"
"#;
        let config = RevisorConfig::from_toml(toml).unwrap();
        assert_eq!(config.llm.model, "gpt-4o");
        assert_eq!(config.llm.base_url.as_deref(), Some("http://localhost:11434"));
        assert_eq!(config.llm.max_tokens, Some(2000));
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.search.num_results, 3);
        assert_eq!(config.documents.dir, PathBuf::from("manuals"));
        assert_eq!(config.documents.chat_chars, 2000);
        assert_eq!(
            config.auth.firebase_config,
            PathBuf::from("config/firebase.json")
        );
        assert_eq!(config.output.markup_filename, "review.xml");
        assert_eq!(config.output.source_filename, "codigo_otimizado.abap");
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = RevisorConfig::from_toml("").unwrap();
        assert_eq!(config.documents.max_chars, 8000);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = RevisorConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn env_fills_missing_keys_only() {
        let toml = r#"
[llm]
api_key = "from-file"
"#;
        let mut config = RevisorConfig::from_toml(toml).unwrap();
        config.apply_env(|name| match name {
            "OPENAI_API_KEY" => Some("from-env".into()),
            "SERPER_API_KEY" => Some("serper".into()),
            _ => None,
        });
        assert_eq!(config.llm.api_key.as_deref(), Some("from-file"));
        assert_eq!(config.chat.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.search.api_key.as_deref(), Some("serper"));
    }

    #[test]
    fn env_falls_back_to_short_names() {
        let mut config = RevisorConfig::default();
        config.apply_env(|name| match name {
            "OPENAI" => Some("short".into()),
            "SERPER_API_KEY" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(config.llm.api_key.as_deref(), Some("short"));
        assert!(config.search.api_key.is_none());
    }

    #[test]
    fn chat_inherits_llm_credentials_from_file() {
        let toml = r#"
[llm]
api_key = "sk-file"
base_url = "http://localhost:11434"
"#;
        let mut config = RevisorConfig::from_toml(toml).unwrap();
        config.apply_env(|_| None);
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-file"));
        assert_eq!(
            config.chat.base_url.as_deref(),
            Some("http://localhost:11434")
        );
        let client = config.chat.to_llm_config();
        assert_eq!(client.api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn blank_keys_in_file_count_as_missing() {
        let toml = r#"
[llm]
api_key = ""

[search]
api_key = "  "
"#;
        let mut config = RevisorConfig::from_toml(toml).unwrap();
        assert!(!config.search.has_api_key());
        config.apply_env(|name| (name == "OPENAI").then(|| "sk-env".to_string()));
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-env"));
        assert!(config.search.api_key.is_none());
        assert!(!config.search.has_api_key());
    }

    #[test]
    fn explicit_chat_settings_win() {
        let toml = r#"
[llm]
api_key = "sk-llm"
base_url = "http://localhost:11434"

[chat]
api_key = "sk-chat"
base_url = "https://api.openai.com/v1"
"#;
        let mut config = RevisorConfig::from_toml(toml).unwrap();
        config.apply_env(|_| Some("sk-env".into()));
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-chat"));
        assert_eq!(
            config.chat.base_url.as_deref(),
            Some("https://api.openai.com/v1")
        );
    }
}
