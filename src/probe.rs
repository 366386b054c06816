use anyhow::{Context, Result};

use crate::chat::{ChatRequest, ChatTransport, Message};

const PROBE_PROMPT: &str = "Say hi in 5 words";
const PROBE_MAX_TOKENS: u32 = 50;
const BODY_EXCERPT_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub status: u16,
    pub body_excerpt: String,
}

impl ProbeReport {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one small request, without retry, to check connectivity and credentials.
pub async fn probe(transport: &impl ChatTransport, model: &str) -> Result<ProbeReport> {
    let request = ChatRequest {
        model: model.to_owned(),
        messages: vec![Message::user(PROBE_PROMPT)],
        max_tokens: PROBE_MAX_TOKENS,
    };

    let response = transport
        .send(&request)
        .await
        .context("Probe request failed")?;

    Ok(ProbeReport {
        status: response.status,
        body_excerpt: response.body.chars().take(BODY_EXCERPT_CHARS).collect(),
    })
}
