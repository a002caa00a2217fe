//! `eol-sentinel-cli`: a thin CLI for one-off lookups and cache maintenance
//! against a locally wired [`eol_sentinel::App`].
//!
//! Every subcommand builds its own `App` from `AppConfig` rather than
//! talking to a running `eol-sentineld` over HTTP — there is no daemon IPC
//! in scope, so this binary and the server binary are two independent
//! front ends onto the same library.

use clap::{Parser, Subcommand};
use eol_sentinel::domain_types::{SoftwareName, SoftwareVersion};
use eol_sentinel::{App, AppConfig};

/// `eol-sentinel-cli`: look up end-of-life dates and maintain the local cache.
#[derive(Parser, Debug)]
#[command(name = "eol-sentinel-cli", about = "End-of-life intelligence service CLI")]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve one software/version query and print the result as JSON.
    Lookup {
        /// The software product name, e.g. "Ubuntu".
        software: String,
        /// An optional version string, e.g. "20.04".
        version: Option<String>,
        /// An optional hint ("os" prepends the OS-family specialist).
        #[arg(long)]
        kind: Option<String>,
        /// Route straight to the generic fallback agent, skipping vendor agents.
        #[arg(long)]
        internet_only: bool,
    },

    /// Print cache and telemetry statistics as JSON.
    Stats,

    /// Purge cache entries, optionally scoped to a software name or agent.
    Purge {
        /// Restrict the purge to this software name.
        #[arg(long)]
        software: Option<String>,
        /// Restrict the purge to this agent name.
        #[arg(long)]
        agent: Option<String>,
    },

    /// Re-run the bulk cache-warming pass for every bulk-capable vendor agent.
    Warm,

    /// Print a liveness/health snapshot as JSON.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    eol_sentinel::observability::init_tracing(cli.config.log_json)?;
    let app = App::new(cli.config).await?;

    match cli.command {
        Command::Lookup { software, version, kind, internet_only } => {
            let software = SoftwareName::try_new(software)?;
            let version = version.map(SoftwareVersion::try_new).transpose()?;
            let response = app.orchestrator.lookup(&software, version.as_ref(), kind.as_deref(), internet_only).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Stats => {
            let telemetry = app.telemetry.snapshot();
            let cache = app.cache.stats().await;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({
                "telemetry": telemetry,
                "cache": cache,
            }))?);
        }
        Command::Purge { software, agent } => {
            let software = software.map(SoftwareName::try_new).transpose()?;
            let deleted_count = app.cache.purge(software.as_ref().map(SoftwareName::as_ref), agent.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&serde_json::json!({ "deleted_count": deleted_count }))?);
        }
        Command::Warm => {
            let results = app.orchestrator.warm_caches().await;
            for (agent, count) in results {
                println!("{agent}: {count} cycles");
            }
        }
        Command::Health => {
            let health = app.orchestrator.health();
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}
