use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::chat::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://api.moonshot.ai/v1/chat/completions";

const DEFAULT_SEED_PROMPTS: [&str; 3] = [
    "You have complete freedom to discuss whatever you want.",
    "No constraints. What would you like to explore?",
    "This is an open-ended space. Go wherever feels right.",
];

/// Credentials read from the process environment.
#[derive(Deserialize)]
pub struct Environment {
    pub moonshot_api_key: String,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("moonshot_api_key", &"<redacted>")
            .finish()
    }
}

impl Environment {
    pub fn load() -> Result<Self> {
        envy::from_env::<Environment>()
            .context("MOONSHOT_API_KEY environment variable not set")
    }
}

/// Optional experiment file. Every key falls back to a built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExperimentConfig {
    pub seed_prompts: Vec<String>,
    pub system_prompt: String,
    pub api_url: String,
    pub max_tokens_per_call: u32,
    pub request_timeout_secs: u64,
    pub results_prefix: String,
    pub retry: RetryPolicy,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            seed_prompts: DEFAULT_SEED_PROMPTS.iter().map(|&s| s.to_owned()).collect(),
            system_prompt: "You are a helpful assistant.".to_owned(),
            api_url: DEFAULT_API_URL.to_owned(),
            max_tokens_per_call: 1024,
            request_timeout_secs: 120,
            results_prefix: "kimi".to_owned(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ExperimentConfig {
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read experiment config `{}`", path.display()))?;
        Self::parse(&text)
            .with_context(|| format!("Invalid experiment config `{}`", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse experiment config TOML")?;
        ensure!(!config.seed_prompts.is_empty(), "`seed_prompts` must not be empty");
        ensure!(config.retry.max_attempts > 0, "`retry.max_attempts` must be at least 1");
        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ExperimentConfig::parse("").unwrap();
        assert_eq!(config.seed_prompts.len(), 3);
        assert_eq!(config.system_prompt, "You are a helpful assistant.");
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.max_tokens_per_call, 1024);
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn partial_overrides() {
        let config = ExperimentConfig::parse(
            r#"
seed_prompts = ["Talk about rivers."]
api_url = "http://localhost:8080/v1/chat/completions"

[retry]
max_attempts = 5
rate_limit_step_secs = 1
"#,
        )
        .unwrap();

        assert_eq!(config.seed_prompts, vec!["Talk about rivers.".to_owned()]);
        assert_eq!(config.api_url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.rate_limit_step_secs, 1);
        assert_eq!(config.retry.timeout_wait_secs, 5);
        assert_eq!(config.results_prefix, "kimi");
    }

    #[test]
    fn rejects_empty_seed_list() {
        let error = ExperimentConfig::parse("seed_prompts = []").unwrap_err();
        assert!(error.to_string().contains("seed_prompts"));
    }

    #[test]
    fn rejects_zero_attempts() {
        assert!(ExperimentConfig::parse("[retry]\nmax_attempts = 0").is_err());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(ExperimentConfig::parse("seed_prompt = \"typo\"").is_err());
    }

    #[tokio::test]
    async fn missing_path_means_defaults() {
        let config = ExperimentConfig::load(None).await.unwrap();
        assert_eq!(config.seed_prompts.len(), 3);
    }

    #[tokio::test]
    async fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.toml");
        tokio::fs::write(&path, "system_prompt = \"Be brief.\"")
            .await
            .unwrap();

        let config = ExperimentConfig::load(Some(&path)).await.unwrap();
        assert_eq!(config.system_prompt, "Be brief.");
    }
}
