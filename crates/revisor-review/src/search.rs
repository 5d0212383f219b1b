use std::time::Duration;

use async_trait::async_trait;
use revisor_core::{RevisorError, SearchConfig};
use serde::Deserialize;

use crate::llm::ToolSpec;

/// One organic web search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Result URL.
    #[serde(default)]
    pub link: String,
    /// Short excerpt shown by the search engine.
    #[serde(default)]
    pub snippet: String,
}

/// A web search capability that agents may call as a tool.
#[async_trait]
pub trait SearchTool: Send + Sync {
    /// Tool name exposed to the model.
    fn name(&self) -> &str {
        "web_search"
    }

    /// Tool description exposed to the model.
    fn description(&self) -> &str {
        "Search the web for up-to-date documentation and best practices. \
         Input is a plain-text query."
    }

    /// Run `query` and return the top results.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Search`] when the search backend fails.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RevisorError>;
}

/// Function schema for a search tool, taking a single `query` string.
pub fn tool_spec(tool: &dyn SearchTool) -> ToolSpec {
    ToolSpec::function(
        tool.name(),
        tool.description(),
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query" }
            },
            "required": ["query"]
        }),
    )
}

/// Render hits as the text fed back to the model.
///
/// # Examples
///
/// ```
/// use revisor_review::search::{format_hits, SearchHit};
///
/// let hits = vec![SearchHit {
///     title: "Open SQL".into(),
///     link: "https://help.sap.com".into(),
///     snippet: "Avoid SELECT *".into(),
/// }];
/// let text = format_hits(&hits);
/// assert!(text.contains("Open SQL"));
/// assert_eq!(format_hits(&[]), "No results found.");
/// ```
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No results found.".into();
    }
    hits.iter()
        .map(|h| format!("Title: {}\nLink: {}\nSnippet: {}", h.title, h.link, h.snippet))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Google search through the Serper API.
pub struct SerperSearch {
    client: reqwest::Client,
    config: SearchConfig,
}

impl SerperSearch {
    /// Build a Serper client.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Search`] if no API key is configured or the
    /// HTTP client cannot be built.
    pub fn new(config: &SearchConfig) -> Result<Self, RevisorError> {
        if !config.has_api_key() {
            return Err(RevisorError::Search("no search API key configured".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RevisorError::Search(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SearchHit>,
}

#[async_trait]
impl SearchTool for SerperSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RevisorError> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        tracing::debug!(query, "web search");
        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({ "q": query, "num": self.config.num_results }))
            .send()
            .await
            .map_err(|e| RevisorError::Search(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RevisorError::Search(format!("search API error {status}: {body}")));
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|e| RevisorError::Search(format!("failed to parse response: {e}")))?;

        let mut hits = parsed.organic;
        hits.truncate(self.config.num_results);
        Ok(hits)
    }
}
