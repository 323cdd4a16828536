use clap::{Parser, Subcommand};
use dotenv::dotenv;
use ruleweaver::config::WeaverConfig;
use ruleweaver::graph::http::HttpGraphClient;
use ruleweaver::llm::service::ReasoningClient;
use ruleweaver::wizard::engine::WizardEngine;
use ruleweaver::wizard::events::EventStore;
use ruleweaver::wizard::progress::ProgressBroadcaster;
use ruleweaver::wizard::server;
use ruleweaver::wizard::state::{Phase, WizardRequest};

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one wizard session from a request file or inline flags
    Run {
        /// Path to a YAML request file
        #[arg(short, long)]
        file: Option<String>,

        /// Rule text (ignored when --file is given)
        #[arg(long)]
        rule_text: Option<String>,

        /// Origin jurisdiction code
        #[arg(long, default_value = "EU")]
        origin: String,

        /// Receiving jurisdiction codes (repeatable)
        #[arg(long)]
        receiving: Vec<String>,

        /// Scenario type
        #[arg(long, default_value = "transfer")]
        scenario: String,

        /// Data categories (repeatable)
        #[arg(long)]
        category: Vec<String>,

        /// Whether the transfer involves PII
        #[arg(long)]
        pii: bool,

        /// Override the retry budget
        #[arg(long)]
        max_iterations: Option<u32>,
    },
    /// Serve the wizard HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = WeaverConfig::from_env()?;

    let reasoner = Arc::new(ReasoningClient::new(&config)?);
    let graph = Arc::new(HttpGraphClient::new(&config)?);
    let store = EventStore::new();
    let broadcaster = ProgressBroadcaster::new(config.heartbeat_interval);
    let engine = Arc::new(WizardEngine::new(
        reasoner,
        graph,
        store,
        broadcaster,
        config,
    ));

    match args.command {
        Commands::Run {
            file,
            rule_text,
            origin,
            receiving,
            scenario,
            category,
            pii,
            max_iterations,
        } => {
            let request: WizardRequest = match file {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)?;
                    serde_yaml::from_str(&raw)?
                }
                None => WizardRequest {
                    origin_jurisdiction: origin,
                    scenario_type: scenario,
                    receiving_jurisdictions: receiving,
                    rule_text: rule_text.unwrap_or_default(),
                    data_categories: category,
                    pii_involved: pii,
                    max_iterations,
                },
            };

            let state = engine.run(request).await?;

            println!("{}", serde_json::to_string_pretty(&state)?);
            match state.phase {
                Phase::Complete => println!("Session complete."),
                Phase::HumanReview => println!(
                    "Session suspended for human review: {}",
                    state.pending_question.as_deref().unwrap_or("(no question)")
                ),
                _ => println!(
                    "Session failed: {}",
                    state.error.as_deref().unwrap_or("(no message)")
                ),
            }
        }
        Commands::Serve { port } => {
            server::serve(port, engine).await?;
        }
    }

    Ok(())
}
