use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::schema::ChatRequest;
use super::transport::{ChatTransport, RawResponse, TransportError};

/// Replays canned transport outcomes in order and records every request.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(
        script: impl IntoIterator<Item = Result<RawResponse, TransportError>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with `content`, reporting `tokens` each time.
    pub(crate) fn repeating(content: &str, tokens: u64, times: usize) -> Self {
        Self::new((0..times).map(|_| ok_body(content, tokens)))
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<RawResponse, TransportError> {
        let turn = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted response for request #{turn}"))
    }
}

pub(crate) fn ok_body(content: &str, tokens: u64) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status: 200,
        body: serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"total_tokens": tokens},
        })
        .to_string(),
    })
}
