use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::chat::{ChatClient, ChatTransport, Message, TokenBudget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum Speaker {
    A,
    B,
}

impl Speaker {
    /// Instance A speaks on odd turns, B on even ones.
    pub fn for_turn(turn: u32) -> Self {
        if turn % 2 == 1 { Speaker::A } else { Speaker::B }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub speaker: Speaker,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationResult {
    pub seed_prompt: String,
    pub full_conversation: Vec<TurnRecord>,
    pub turns_completed: usize,
    pub tokens_used: u64,
}

/// One simulated agent: the system prompt plus its own private history.
struct Instance<'a> {
    system_prompt: &'a str,
    history: Vec<Message>,
}

impl<'a> Instance<'a> {
    fn new(system_prompt: &'a str) -> Self {
        Self {
            system_prompt,
            history: Vec::new(),
        }
    }

    fn hear(&mut self, content: &str) {
        self.history.push(Message::user(content));
    }

    fn request_messages(&self) -> Vec<Message> {
        std::iter::once(Message::system(self.system_prompt))
            .chain(self.history.iter().cloned())
            .collect()
    }

    fn say(&mut self, content: &str) {
        self.history.push(Message::assistant(content));
    }
}

/// Runs up to `turns` alternating turns between two instances, starting
/// with A on `seed_prompt`. Stops early once `budget` is exhausted.
pub async fn run_conversation<T: ChatTransport>(
    client: &ChatClient<T>,
    budget: &mut TokenBudget,
    model: &str,
    system_prompt: &str,
    seed_prompt: &str,
    turns: u32,
) -> Result<ConversationResult> {
    tracing::info!("Seed: {}...", seed_prompt.chars().take(50).collect::<String>());

    let mut instance_a = Instance::new(system_prompt);
    let mut instance_b = Instance::new(system_prompt);
    let mut full_conversation = Vec::new();
    let mut tokens_used = 0;
    let mut last_response = seed_prompt.to_owned();

    for turn in 1..=turns {
        if budget.is_exhausted() {
            tracing::warn!(
                used = budget.used(),
                cap = budget.cap(),
                "Token cap reached at turn {turn}"
            );
            break;
        }

        let speaker = Speaker::for_turn(turn);
        let instance = match speaker {
            Speaker::A => &mut instance_a,
            Speaker::B => &mut instance_b,
        };

        instance.hear(&last_response);
        let completion = client
            .complete(budget, model, instance.request_messages())
            .await
            .with_context(|| format!("Turn {turn}/{turns} ({speaker}) failed"))?;
        instance.say(&completion.content);

        tokens_used += completion.tokens;
        tracing::info!("Turn {turn}/{turns} ({speaker}) [{} tokens]", completion.tokens);

        full_conversation.push(TurnRecord {
            speaker,
            content: completion.content.clone(),
        });
        last_response = completion.content;
    }

    Ok(ConversationResult {
        seed_prompt: seed_prompt.to_owned(),
        turns_completed: full_conversation.len(),
        full_conversation,
        tokens_used,
    })
}
