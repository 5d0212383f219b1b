use std::sync::Arc;

use revisor_core::RevisorError;

use crate::llm::{ChatMessage, ChatModel, ChatRequest, Completion, ToolCall};
use crate::search::{format_hits, tool_spec, SearchTool};

/// A unit of work handed to an [`AgentRole`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// What to do, with all inputs interpolated.
    pub description: String,
    /// Shape of the expected answer.
    pub expected_output: String,
    /// Ask the model for a JSON object reply.
    pub json_output: bool,
}

/// A persona-driven agent backed by a chat model and an optional web search
/// tool.
pub struct AgentRole {
    role: String,
    goal: String,
    backstory: String,
    llm: Arc<dyn ChatModel>,
    search: Option<Arc<dyn SearchTool>>,
    max_iterations: usize,
}

impl AgentRole {
    /// Create an agent with no tools.
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        llm: Arc<dyn ChatModel>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            llm,
            search: None,
            max_iterations: 4,
        }
    }

    /// Give the agent a web search tool.
    pub fn with_search(mut self, search: Option<Arc<dyn SearchTool>>) -> Self {
        self.search = search;
        self
    }

    /// Bound the number of tool rounds before a final answer is forced.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// The agent's role title.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Model the agent talks to.
    pub fn model(&self) -> &str {
        self.llm.model()
    }

    fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\n\nYour personal goal is: {}",
            self.role, self.backstory, self.goal
        )
    }

    fn task_prompt(task: &Task) -> String {
        format!(
            "Current task: {}\n\nThis is the expected criteria for your final answer: {}\n\
             You MUST return the actual complete content as the final answer, not a summary.",
            task.description, task.expected_output
        )
    }

    /// Carry out `task` and return the final text answer.
    ///
    /// The model may call the search tool up to `max_iterations` rounds; after
    /// that one last request without tools forces an answer.
    ///
    /// # Errors
    ///
    /// Any model failure or search backend failure aborts the task.
    pub async fn perform(&self, task: &Task) -> Result<String, RevisorError> {
        let mut messages = vec![
            ChatMessage::system(self.system_prompt()),
            ChatMessage::user(Self::task_prompt(task)),
        ];
        let tools = self
            .search
            .as_deref()
            .map(|s| vec![tool_spec(s)])
            .unwrap_or_default();

        if !tools.is_empty() {
            for round in 0..self.max_iterations {
                let request = ChatRequest {
                    messages: messages.clone(),
                    tools: tools.clone(),
                    json_output: task.json_output,
                };
                match self.llm.complete(request).await? {
                    Completion::Text(text) => return Ok(text),
                    Completion::ToolCalls(calls) => {
                        tracing::debug!(role = %self.role, round, calls = calls.len(), "tool round");
                        messages.push(ChatMessage::assistant_tool_calls(calls.clone()));
                        for call in &calls {
                            let output = self.run_tool(call).await?;
                            messages.push(ChatMessage::tool_result(&call.id, output));
                        }
                    }
                }
            }
            tracing::debug!(role = %self.role, "tool budget spent, forcing final answer");
            messages.push(ChatMessage::user(
                "Stop using tools now and give your final answer.",
            ));
        }

        let request = ChatRequest {
            messages,
            tools: Vec::new(),
            json_output: task.json_output,
        };
        match self.llm.complete(request).await? {
            Completion::Text(text) => Ok(text),
            Completion::ToolCalls(_) => Err(RevisorError::Agent(format!(
                "{} kept requesting tools after the tool budget was spent",
                self.role
            ))),
        }
    }

    /// Run one requested tool call. Mistakes in the call itself are reported
    /// back to the model; a failing search backend is an error.
    async fn run_tool(&self, call: &ToolCall) -> Result<String, RevisorError> {
        let Some(search) = self.search.as_deref() else {
            return Ok(format!("Error: no tool named '{}' is available.", call.function.name));
        };
        if call.function.name != search.name() {
            return Ok(format!("Error: no tool named '{}' is available.", call.function.name));
        }

        let query = serde_json::from_str::<serde_json::Value>(&call.function.arguments)
            .ok()
            .and_then(|v| v.get("query").and_then(|q| q.as_str()).map(str::to_string));
        let Some(query) = query else {
            return Ok("Error: arguments must be a JSON object with a 'query' string.".into());
        };

        let hits = search.search(&query).await?;
        Ok(format_hits(&hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FunctionCall, Role};
    use crate::search::SearchHit;
    use crate::testing::ScriptedModel;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeSearch {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    impl FakeSearch {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                queries: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl SearchTool for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RevisorError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(RevisorError::Search("quota exceeded".into()));
            }
            Ok(vec![SearchHit {
                title: "SAP Help".into(),
                link: "https://help.sap.com".into(),
                snippet: "Use explicit field lists".into(),
            }])
        }
    }

    fn call(name: &str, args: &str) -> Completion {
        Completion::ToolCalls(vec![ToolCall {
            id: "call_1".into(),
            kind: "function".into(),
            function: FunctionCall {
                name: name.into(),
                arguments: args.into(),
            },
        }])
    }

    fn task() -> Task {
        Task {
            description: "Review SELECT * FROM mara.".into(),
            expected_output: "A list of findings".into(),
            json_output: false,
        }
    }

    #[tokio::test]
    async fn answers_directly_without_tools() {
        let model = ScriptedModel::new(vec![Completion::Text("fine".into())]);
        let agent = AgentRole::new("Reviewer", "review", "expert", model.clone());
        assert_eq!(agent.perform(&task()).await.unwrap(), "fine");

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        assert_eq!(requests[0].messages[0].role, Role::System);
        assert!(requests[0].messages[0].content.contains("Reviewer"));
        assert!(requests[0].messages[1].content.contains("SELECT * FROM mara"));
    }

    #[tokio::test]
    async fn feeds_search_results_back() {
        let model = ScriptedModel::new(vec![
            call("web_search", r#"{"query":"ABAP SELECT *"}"#),
            Completion::Text("use a field list".into()),
        ]);
        let search = FakeSearch::new(false);
        let agent = AgentRole::new("Reviewer", "review", "expert", model.clone())
            .with_search(Some(search.clone()));

        assert_eq!(agent.perform(&task()).await.unwrap(), "use a field list");
        assert_eq!(*search.queries.lock().unwrap(), vec!["ABAP SELECT *".to_string()]);

        let requests = model.requests();
        let last = requests[1].messages.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
        assert!(last.content.contains("SAP Help"));
    }

    #[tokio::test]
    async fn bad_arguments_are_reported_to_model() {
        let model = ScriptedModel::new(vec![
            call("web_search", "not json"),
            call("lookup", "{}"),
            Completion::Text("ok".into()),
        ]);
        let search = FakeSearch::new(false);
        let agent = AgentRole::new("Reviewer", "review", "expert", model.clone())
            .with_search(Some(search.clone()));

        assert_eq!(agent.perform(&task()).await.unwrap(), "ok");
        assert!(search.queries.lock().unwrap().is_empty());
        let requests = model.requests();
        assert!(requests[1].messages.last().unwrap().content.starts_with("Error"));
        assert!(requests[2].messages.last().unwrap().content.contains("lookup"));
    }

    #[tokio::test]
    async fn search_failure_aborts() {
        let model = ScriptedModel::new(vec![call("web_search", r#"{"query":"x"}"#)]);
        let agent = AgentRole::new("Reviewer", "review", "expert", model)
            .with_search(Some(FakeSearch::new(true)));
        let err = agent.perform(&task()).await.unwrap_err();
        assert!(matches!(err, RevisorError::Search(_)));
    }

    #[tokio::test]
    async fn forces_final_answer_after_budget() {
        let model = ScriptedModel::new(vec![
            call("web_search", r#"{"query":"a"}"#),
            call("web_search", r#"{"query":"b"}"#),
            Completion::Text("final".into()),
        ]);
        let agent = AgentRole::new("Reviewer", "review", "expert", model.clone())
            .with_search(Some(FakeSearch::new(false)))
            .with_max_iterations(2);

        assert_eq!(agent.perform(&task()).await.unwrap(), "final");
        let requests = model.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].tools.is_empty());
    }

    #[tokio::test]
    async fn model_error_aborts() {
        let model = ScriptedModel::new(vec![]);
        let agent = AgentRole::new("Reviewer", "review", "expert", model);
        assert!(matches!(
            agent.perform(&task()).await,
            Err(RevisorError::Llm(_))
        ));
    }
}
