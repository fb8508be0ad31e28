use anyhow::{Context, Result};
use chatpulse_core::Settings;
use chatpulse_daemon::{build_graph, run_cycle, CycleOutcome, CyclePlan, Scheduler};
use chatpulse_slack::SlackClient;
use chatpulse_store::GraphStoreClient;
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chatpulse")]
#[command(
    about = "Samples chat room activity and publishes it as a colored graph",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Directory holding default.toml, {env}.toml and local.toml
    #[arg(long, global = true, env = "CHATPULSE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Configuration environment (default: $CHATPULSE_ENV or development)
    #[arg(long, global = true)]
    env: Option<String>,

    /// Log filter, overrides RUST_LOG and logging.level
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample on the configured interval until the run window closes or Ctrl-C
    Run,

    /// Run a single cycle and exit
    Once {
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build the graph for the current moment and print it without submitting
    Preview,

    /// Write a starter configuration file
    InitConfig {
        /// Target file (default: ~/.chatpulse/default.toml)
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { path } = &cli.command {
        return init_config(path.clone());
    }

    let config_dir = resolve_config_dir(cli.config_dir.clone());
    let settings = Settings::load(Some(config_dir.clone()), cli.env.clone())?;
    init_tracing(&settings, cli.log_level.as_deref());
    info!(
        "Loaded configuration from {:?} (env: {}, {} tracked rooms)",
        config_dir,
        settings.env,
        settings.tracked_room_count()
    );

    match cli.command {
        Commands::Run => handle_run(settings).await,
        Commands::Once { json } => handle_once(settings, json).await,
        Commands::Preview => handle_preview(settings).await,
        Commands::InitConfig { .. } => Ok(()),
    }
}

fn resolve_config_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(Settings::default_config_dir)
}

fn init_tracing(settings: &Settings, override_level: Option<&str>) {
    let filter = match override_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if settings.logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

fn init_config(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => dirs::home_dir()
            .context("cannot determine home directory; pass a path")?
            .join(".chatpulse")
            .join("default.toml"),
    };

    if Settings::write_default(&path)? {
        println!("{} Wrote starter configuration to {}", "✓".green(), path.display());
    } else {
        println!("{} {} already exists; left unchanged", "!".yellow(), path.display());
    }
    Ok(())
}

fn print_settings_summary(settings: &Settings) {
    println!("{}", "ChatPulse".blue().bold());
    println!("  Environment: {}", settings.env);
    println!("  Graph: {}", settings.store.graph_name);
    println!("  Tracked rooms: {}", settings.tracked_room_count());
    println!(
        "  Interval: {}s, lookback: {}s",
        settings.schedule.interval_secs, settings.schedule.lookback_secs
    );
}

async fn handle_run(settings: Settings) -> Result<()> {
    print_settings_summary(&settings);
    let platform = SlackClient::new(&settings.slack)?;
    let store = GraphStoreClient::new(&settings.store)?;

    let scheduler = Scheduler::new(Arc::new(platform), Arc::new(store), Arc::new(settings));
    let report = scheduler
        .run(async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl-C"),
                Err(e) => {
                    error!("Cannot listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        })
        .await;

    let summary = format!(
        "{} cycles: {} submitted, {} skipped, {} failed",
        report.cycles, report.submitted, report.skipped, report.failed
    );
    if report.failed > 0 {
        println!("{} {}", "!".yellow(), summary);
    } else {
        println!("{} {}", "✓".green(), summary);
    }
    Ok(())
}

async fn handle_once(settings: Settings, json: bool) -> Result<()> {
    let platform = SlackClient::new(&settings.slack)?;
    let store = GraphStoreClient::new(&settings.store)?;

    let outcome = run_cycle(&platform, &store, &settings, Utc::now()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }
    match outcome {
        CycleOutcome::Submitted {
            rooms,
            nodes,
            links,
        } => println!(
            "{} Submitted {} rooms to {} ({} nodes, {} links)",
            "✓".green(),
            rooms,
            settings.store.graph_name,
            nodes,
            links
        ),
        CycleOutcome::Skipped => println!(
            "{} None of the configured rooms were found; nothing submitted",
            "!".yellow()
        ),
    }
    Ok(())
}

async fn handle_preview(settings: Settings) -> Result<()> {
    let platform = SlackClient::new(&settings.slack)?;
    let plan = CyclePlan::new(Utc::now(), settings.schedule.lookback());

    match build_graph(&platform, &settings, &plan).await? {
        Some((_, graph)) => println!("{}", serde_json::to_string_pretty(&graph)?),
        None => eprintln!("{} None of the configured rooms were found", "!".yellow()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_dir_wins() {
        let dir = PathBuf::from("/etc/chatpulse");
        assert_eq!(resolve_config_dir(Some(dir.clone())), dir);
    }

    #[test]
    fn test_global_options_parse_after_subcommand() {
        let cli = Cli::try_parse_from([
            "chatpulse",
            "once",
            "--json",
            "--config-dir",
            "/tmp/cp",
            "--env",
            "production",
        ])
        .unwrap();
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cp")));
        assert_eq!(cli.env.as_deref(), Some("production"));
        assert!(matches!(cli.command, Commands::Once { json: true }));
    }
}
