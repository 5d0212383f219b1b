use std::time::Duration;

use async_trait::async_trait;
use revisor_core::{LlmConfig, RevisorError};
use serde::{Deserialize, Serialize};

/// A message in a chat conversation with the LLM.
///
/// # Examples
///
/// ```
/// use revisor_review::llm::{ChatMessage, Role};
///
/// let msg = ChatMessage::user("Review this code");
/// assert!(matches!(msg.role, Role::User));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Text content of the message.
    #[serde(default)]
    pub content: String,
    /// Tool invocations requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Which tool call a `tool` message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// System-level instructions.
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    /// User input.
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// A plain assistant reply.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// An assistant turn that only requests tool calls.
    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::text(Role::Assistant, "")
        }
    }

    /// The output of one tool call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::text(Role::Tool, content)
        }
    }
}

/// Role in the chat conversation.
///
/// # Examples
///
/// ```
/// use revisor_review::llm::Role;
///
/// let role = Role::System;
/// assert_eq!(serde_json::to_string(&role).unwrap(), "\"system\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System-level instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// Result of a tool call.
    Tool,
}

/// A function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back in the tool result.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    /// Function name and JSON-encoded arguments.
    pub function: FunctionCall,
}

/// Name and raw JSON arguments of a requested function call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name.
    pub name: String,
    /// Arguments as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".into()
}

/// A function the model may call, described by a JSON schema.
///
/// # Examples
///
/// ```
/// use revisor_review::llm::ToolSpec;
///
/// let spec = ToolSpec::function("web_search", "Search the web", serde_json::json!({"type": "object"}));
/// let json = serde_json::to_value(&spec).unwrap();
/// assert_eq!(json["type"], "function");
/// assert_eq!(json["function"]["name"], "web_search");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl ToolSpec {
    /// Describe a callable function.
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: "function",
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }

    /// Name of the described function.
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// One completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// Conversation so far.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call; empty disables tool calling.
    pub tools: Vec<ToolSpec>,
    /// Ask the provider for a JSON object reply.
    pub json_output: bool,
}

impl ChatRequest {
    /// A plain request with no tools.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

/// What the model produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// A final text answer.
    Text(String),
    /// The model wants these tools run before it answers.
    ToolCalls(Vec<ToolCall>),
}

/// A chat-completion language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs and stats.
    fn model(&self) -> &str;

    /// Run one completion.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Llm`] on transport, API, or response errors.
    async fn complete(&self, request: ChatRequest) -> Result<Completion, RevisorError>;

    /// Send `messages` without tools and return the text reply.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Llm`] if the call fails or the model answers
    /// with tool calls anyway.
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, RevisorError> {
        match self.complete(ChatRequest::new(messages)).await? {
            Completion::Text(text) => Ok(text),
            Completion::ToolCalls(_) => Err(RevisorError::Llm(
                "model requested tool calls on a request without tools".into(),
            )),
        }
    }
}

/// OpenAI-compatible chat completions client.
///
/// Works with any provider that exposes the `/v1/chat/completions` endpoint:
/// OpenAI, Ollama, vLLM, LiteLLM, etc. Temperature and the output token bound
/// come from the [`LlmConfig`] it was built with.
///
/// # Examples
///
/// ```
/// use revisor_core::LlmConfig;
/// use revisor_review::llm::{ChatModel, LlmClient};
///
/// let config = LlmConfig {
///     api_key: Some("test-key".into()),
///     ..LlmConfig::default()
/// };
/// let client = LlmClient::new(&config).unwrap();
/// assert_eq!(client.model(), "gpt-4o-mini");
/// ```
pub struct LlmClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Llm`] if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, RevisorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(180))
            .build()
            .map_err(|e| RevisorError::Llm(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn request_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": request.messages,
            "temperature": self.config.temperature,
        });
        if let Some(max_tokens) = self.config.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(request.tools);
            body["tool_choice"] = serde_json::json!("auto");
        }
        if request.json_output {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<Completion, RevisorError> {
        let base_url = self
            .config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com")
            .trim_end_matches('/');
        let url = format!("{base_url}/v1/chat/completions");

        let mut http = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            http = http.header("Authorization", format!("Bearer {api_key}"));
        }
        http = http.header("Content-Type", "application/json");

        let response = http
            .json(&self.request_body(&request))
            .send()
            .await
            .map_err(|e| RevisorError::Llm(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(RevisorError::Llm(format!(
                "LLM API error {status}: {body_text}"
            )));
        }

        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| RevisorError::Llm(format!("failed to parse response: {e}")))?;

        parse_completion(&response_body)
    }
}

fn parse_completion(body: &serde_json::Value) -> Result<Completion, RevisorError> {
    let message = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| RevisorError::Llm(format!("unexpected response structure: {body}")))?;

    if let Some(calls) = message.get("tool_calls").filter(|v| !v.is_null()) {
        let calls: Vec<ToolCall> = serde_json::from_value(calls.clone())
            .map_err(|e| RevisorError::Llm(format!("malformed tool calls: {e}")))?;
        if !calls.is_empty() {
            return Ok(Completion::ToolCalls(calls));
        }
    }

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .ok_or_else(|| RevisorError::Llm(format!("unexpected response structure: {body}")))?;

    Ok(Completion::Text(content.to_string()))
}
