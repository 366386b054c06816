use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::chat::{ChatClient, ChatTransport, TokenBudget};
use crate::conversation::{ConversationResult, run_conversation};

const RESULTS_FILE_NAME: &str = "conversations.json";

#[derive(Debug, Clone)]
pub struct ExperimentSettings {
    pub model: String,
    pub turns: u32,
    pub conversations: usize,
    pub system_prompt: String,
    pub seed_prompts: Vec<String>,
}

impl ExperimentSettings {
    fn prompts_to_run(&self) -> &[String] {
        &self.seed_prompts[..self.conversations.min(self.seed_prompts.len())]
    }
}

/// The document persisted after every completed conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub model: String,
    pub conversations: Vec<ConversationResult>,
    pub total_tokens: u64,
    pub generated_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Completed,
    TokenCap,
    Failed(String),
}

#[derive(Debug)]
pub struct ExperimentOutcome {
    pub conversations: Vec<ConversationResult>,
    pub total_tokens: u64,
    pub stop_reason: StopReason,
}

/// Overwrites a single JSON results file inside a per-run directory.
pub struct ResultsWriter {
    path: PathBuf,
}

impl ResultsWriter {
    /// Creates `<root>/<prefix>_<YYYYmmdd_HHMMSS>/`.
    pub async fn create_timestamped(root: &Path, prefix: &str) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        Self::create_in(root.join(format!("{prefix}_{timestamp}"))).await
    }

    pub async fn create_in(dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create results directory `{}`", dir.display()))?;

        Ok(Self {
            path: dir.join(RESULTS_FILE_NAME),
        })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }

    /// Replaces the results file. The previous contents survive a failed write.
    pub async fn save(&self, report: &ExperimentReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize results")?;
        let staging = self.path.with_extension("json.tmp");

        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("Failed to write results to `{}`", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .with_context(|| format!("Failed to move results into `{}`", self.path.display()))
    }
}

/// Runs one conversation per seed prompt, persisting after each one.
pub async fn run_experiment<T: ChatTransport>(
    client: &ChatClient<T>,
    budget: &mut TokenBudget,
    settings: &ExperimentSettings,
    writer: &ResultsWriter,
) -> Result<ExperimentOutcome> {
    let prompts = settings.prompts_to_run();
    let mut conversations = Vec::new();
    let mut stop_reason = StopReason::Completed;

    for (index, seed_prompt) in prompts.iter().enumerate() {
        println!("\n[Conversation {}/{}]", index + 1, prompts.len());

        if budget.is_exhausted() {
            tracing::warn!(used = budget.used(), cap = budget.cap(), "Token cap reached, stopping");
            stop_reason = StopReason::TokenCap;
            break;
        }

        let conversation = match run_conversation(
            client,
            budget,
            &settings.model,
            &settings.system_prompt,
            seed_prompt,
            settings.turns,
        )
        .await
        {
            Ok(conversation) => conversation,
            Err(error) => {
                tracing::error!("Conversation {} failed: {error:#}", index + 1);
                stop_reason = StopReason::Failed(format!("{error:#}"));
                break;
            }
        };

        // Only conversations that made it to disk count as completed.
        let report = ExperimentReport {
            model: settings.model.clone(),
            conversations: conversations.iter().cloned().chain([conversation]).collect(),
            total_tokens: budget.used(),
            generated_at: Local::now(),
        };
        if let Err(error) = writer.save(&report).await {
            tracing::error!("Saving conversation {} failed: {error:#}", index + 1);
            stop_reason = StopReason::Failed(format!("{error:#}"));
            break;
        }
        conversations = report.conversations;

        println!("  Saved (total tokens: {})", budget.used());
    }

    Ok(ExperimentOutcome {
        conversations,
        total_tokens: budget.used(),
        stop_reason,
    })
}
