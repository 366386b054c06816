mod chat;
mod config;
mod conversation;
mod experiment;
mod probe;

use std::path::PathBuf;

use structopt::StructOpt;
use tracing_subscriber::EnvFilter;

use chat::{ChatClient, HttpTransport, TokenBudget};
use config::{Environment, ExperimentConfig};
use experiment::{ExperimentSettings, ResultsWriter, StopReason};

#[derive(StructOpt, Debug)]
#[structopt(
    name = "attractor-conversations",
    about = "Let two model instances talk to each other and record the transcripts"
)]
struct Args {
    /// Increase log verbosity (-v debug, -vv trace)
    #[structopt(short, long, parse(from_occurrences), global = true)]
    verbose: u8,

    #[structopt(flatten)]
    run: RunArgs,

    #[structopt(subcommand)]
    command: Option<Command>,
}

#[derive(StructOpt, Debug)]
enum Command {
    /// Send a single request to check connectivity and credentials
    Probe {
        /// Model ID
        #[structopt(long, default_value = "kimi-k2-0905-preview")]
        model: String,

        /// Path to an experiment configuration TOML file
        #[structopt(short = "c", long)]
        config: Option<PathBuf>,
    },
}

#[derive(StructOpt, Debug)]
struct RunArgs {
    /// Model ID
    #[structopt(long, default_value = "kimi-k2-0905-preview")]
    model: String,

    /// Turns per conversation
    #[structopt(long, default_value = "20")]
    turns: u32,

    /// Number of conversations
    #[structopt(long, default_value = "3")]
    convos: usize,

    /// Total token cap across all conversations
    #[structopt(long, default_value = "50000")]
    max_tokens: u64,

    /// Path to an experiment configuration TOML file
    #[structopt(short = "c", long)]
    config: Option<PathBuf>,

    /// Directory under which the timestamped results directory is created
    #[structopt(long, default_value = "results")]
    output_root: PathBuf,
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level(verbose)))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::from_args();
    init_tracing(args.verbose);
    let environment = Environment::load()?;

    match args.command {
        None => run(args.run, environment).await,
        Some(Command::Probe { model, config }) => {
            let config = ExperimentConfig::load(config.as_deref()).await?;
            let transport = HttpTransport::new(
                &config.api_url,
                environment.moonshot_api_key,
                config.request_timeout(),
            )?;

            println!("Testing chat completion API at {}...", config.api_url);
            println!("Key: {}", transport.redacted_key());

            let report = probe::probe(&transport, &model).await?;
            println!("Status: {}", report.status);
            println!("Response: {}", report.body_excerpt);

            if !report.is_success() {
                tracing::warn!(status = report.status, "API answered with a non-success status");
            }
            Ok(())
        }
    }
}

async fn run(args: RunArgs, environment: Environment) -> anyhow::Result<()> {
    let config = ExperimentConfig::load(args.config.as_deref()).await?;
    let transport = HttpTransport::new(
        &config.api_url,
        environment.moonshot_api_key,
        config.request_timeout(),
    )?;
    let client = ChatClient::new(transport, config.retry.clone(), config.max_tokens_per_call);
    let mut budget = TokenBudget::new(args.max_tokens);

    let settings = ExperimentSettings {
        model: args.model,
        turns: args.turns,
        conversations: args.convos,
        system_prompt: config.system_prompt,
        seed_prompts: config.seed_prompts,
    };

    let rule = "=".repeat(60);
    println!("{rule}");
    println!("Attractor States Experiment");
    println!("{rule}");
    println!("Model: {}", settings.model);
    println!("Turns per conversation: {}", settings.turns);
    println!(
        "Seed prompts: {}",
        settings.conversations.min(settings.seed_prompts.len())
    );
    println!("Token cap: {}", budget.cap());
    println!("{rule}");

    let writer = ResultsWriter::create_timestamped(&args.output_root, &config.results_prefix).await?;
    let outcome = experiment::run_experiment(&client, &mut budget, &settings, &writer).await?;

    println!("\n{rule}");
    println!("SUMMARY");
    println!("{rule}");
    println!("Conversations completed: {}", outcome.conversations.len());
    println!("Total tokens used: {}", outcome.total_tokens);
    println!("Results saved to: {}", writer.dir().display());
    match outcome.stop_reason {
        StopReason::Completed => {}
        StopReason::TokenCap => println!("Stopped early: token cap reached"),
        StopReason::Failed(message) => println!("Stopped early: {message}"),
    }

    Ok(())
}
