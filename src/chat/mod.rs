pub(crate) mod budget;
pub(crate) mod client;
pub(crate) mod retry;
pub(crate) mod schema;
pub(crate) mod transport;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use strum::Display;

pub use budget::TokenBudget;
pub use client::ChatClient;
pub use retry::RetryPolicy;
pub use schema::ChatRequest;
pub use transport::{ChatTransport, HttpTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
