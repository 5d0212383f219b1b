use std::sync::Arc;

use revisor_core::{CodeSubmission, RevisorError};

use crate::llm::{ChatMessage, ChatModel};

const CONVERSATION_PREAMBLE: &str = "The following is a friendly conversation between a human \
and an AI. The AI is talkative and provides lots of specific details from its context. If the \
AI does not know the answer to a question, it truthfully says it does not know.";

/// Buffer of every exchanged message, replayed in full on each turn.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
}

impl ConversationMemory {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages exchanged so far.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Record one human/AI exchange.
    pub fn record(&mut self, input: impl Into<String>, output: impl Into<String>) {
        self.messages.push(ChatMessage::user(input));
        self.messages.push(ChatMessage::assistant(output));
    }

    /// Number of recorded exchanges.
    pub fn turns(&self) -> usize {
        self.messages.len() / 2
    }
}

/// Free-form questions about a submission, answered by a conversational model.
pub struct ReviewerChat {
    llm: Arc<dyn ChatModel>,
}

impl ReviewerChat {
    /// Wrap the chat model. This is usually a different instance from the one
    /// the review pipeline uses.
    pub fn new(llm: Arc<dyn ChatModel>) -> Self {
        Self { llm }
    }

    /// Send one turn over `memory` and record the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Llm`] if the model call fails; `memory` is left
    /// unchanged in that case.
    pub async fn turn(
        &self,
        memory: &mut ConversationMemory,
        input: &str,
    ) -> Result<String, RevisorError> {
        let mut messages = Vec::with_capacity(memory.messages().len() + 2);
        messages.push(ChatMessage::system(CONVERSATION_PREAMBLE));
        messages.extend(memory.messages().iter().cloned());
        messages.push(ChatMessage::user(input));

        let reply = self.llm.chat(messages).await?;
        memory.record(input, reply.clone());
        Ok(reply)
    }

    /// Ask `question` about `submission` with `reference` as background, in a
    /// brand new conversation.
    ///
    /// # Errors
    ///
    /// Returns [`RevisorError::Llm`] if the model call fails.
    pub async fn ask(
        &self,
        reference: &str,
        submission: &CodeSubmission,
        question: &str,
    ) -> Result<String, RevisorError> {
        tracing::info!(model = self.llm.model(), file = submission.name(), "Asking reviewer");
        let mut memory = ConversationMemory::new();
        self.turn(&mut memory, &question_prompt(reference, submission, question))
            .await
    }
}

fn question_prompt(reference: &str, submission: &CodeSubmission, question: &str) -> String {
    format!(
        "You are an ABAP reviewer grounded in these technical documents:\n{reference}\n\n\
         Code:\n{code}\n\n\
         User question: {question}",
        code = submission.content(),
    )
}
