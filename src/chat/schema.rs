use serde::{Deserialize, Serialize};

use super::Message;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

impl ChatResponse {
    /// Content of the first choice, if the model produced any.
    pub(crate) fn first_content(&self) -> Option<&str> {
        self.choices.first()?.message.content.as_deref()
    }

    pub(crate) fn total_tokens(&self) -> u64 {
        self.usage.total_tokens
    }
}
