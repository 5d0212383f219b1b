//! Scripted chat model for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use revisor_core::RevisorError;

use crate::llm::{ChatModel, ChatRequest, Completion};

/// Replays canned completions in order and records every request.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Completion>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: Vec<Completion>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ChatRequest) -> Result<Completion, RevisorError> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RevisorError::Llm("script exhausted".into()))
    }
}
