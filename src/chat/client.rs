use super::budget::TokenBudget;
use super::retry::{Failure, RetryPolicy};
use super::schema::{ChatRequest, ChatResponse};
use super::transport::ChatTransport;
use super::Message;

const ERROR_BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub tokens: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Token cap reached ({used}/{cap})")]
    BudgetExhausted { used: u64, cap: u64 },
    #[error("Failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: Failure },
    #[error("Malformed chat completion response: {0}")]
    MalformedResponse(String),
}

pub struct ChatClient<T> {
    transport: T,
    policy: RetryPolicy,
    max_tokens_per_call: u32,
}

impl<T: ChatTransport> ChatClient<T> {
    pub fn new(transport: T, policy: RetryPolicy, max_tokens_per_call: u32) -> Self {
        Self {
            transport,
            policy,
            max_tokens_per_call,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Requests one completion and adds its usage to `budget`.
    pub async fn complete(
        &self,
        budget: &mut TokenBudget,
        model: &str,
        messages: Vec<Message>,
    ) -> Result<Completion, CallError> {
        if budget.is_exhausted() {
            return Err(CallError::BudgetExhausted {
                used: budget.used(),
                cap: budget.cap(),
            });
        }

        let request = ChatRequest {
            model: model.to_owned(),
            messages,
            max_tokens: self.max_tokens_per_call,
        };

        let attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let failure = match self.transport.send(&request).await {
                Ok(response) if response.status == 200 => {
                    let completion = parse_completion(&response.body)?;
                    budget.record(completion.tokens);
                    return Ok(completion);
                }
                Ok(response) if response.status == 429 => Failure::RateLimited,
                Ok(response) => Failure::Status {
                    status: response.status,
                    body: response.body.chars().take(ERROR_BODY_EXCERPT_CHARS).collect(),
                },
                Err(error) => Failure::from(error),
            };

            if attempt >= attempts {
                tracing::warn!(attempt, "{failure}, giving up");
                return Err(CallError::RetriesExhausted {
                    attempts,
                    last_error: failure,
                });
            }

            let wait = self.policy.backoff(&failure, attempt);
            tracing::warn!(attempt, wait_secs = wait.as_secs(), "{failure}, retrying");
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

fn parse_completion(body: &str) -> Result<Completion, CallError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|error| CallError::MalformedResponse(error.to_string()))?;

    let content = response
        .first_content()
        .ok_or_else(|| CallError::MalformedResponse("no content in first choice".to_owned()))?
        .to_owned();

    Ok(Completion {
        content,
        tokens: response.total_tokens(),
    })
}
