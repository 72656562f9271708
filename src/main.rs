mod types;
mod ledger;
mod risk;
mod analytics;
mod report;
mod notifications;
mod source;
mod engine;
mod config;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{load_config, write_default_config, AgentConfig};
use engine::{LedgerRefresh, ReportingAgent};
use notifications::{deliver, MessageKind, NotificationLog, TelegramNotifier};
use report::ReportKind;
use source::SnapshotFileSource;

#[derive(Parser)]
#[command(name = "account-reporter")]
#[command(version = "0.1.0")]
#[command(about = "Periodic trading account reports delivered to a chat", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "reporter.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reporting agent until Ctrl+C
    Run {
        /// Platform export file (overrides general.snapshot_path)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },
    /// Compose one report and print it
    Report {
        /// Platform export file (overrides general.snapshot_path)
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "detailed")]
        kind: ReportKind,

        /// Also deliver the report to the configured chat
        #[arg(long)]
        send: bool,
    },
    /// Send a test message to verify chat credentials
    Ping,
    /// Write a configuration file with all defaults
    InitConfig {
        #[arg(short, long, default_value = "reporter.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::InitConfig { output, force } = &cli.command {
        return init_config(output, *force);
    }

    let config = load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    init_logging(&config, cli.verbose)?;

    info!("Account Reporter v0.1.0");

    match cli.command {
        Commands::Run { snapshot } => run_agent(config, snapshot).await?,
        Commands::Report { snapshot, kind, send } => run_report(config, snapshot, kind, send).await?,
        Commands::Ping => ping(&config).await?,
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

fn init_logging(config: &AgentConfig, verbose: bool) -> Result<()> {
    let filter = if !config.logging.enabled {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.to_lowercase()))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", output.display());
    }
    write_default_config(output)?;
    println!("Wrote default configuration to {}", output.display());
    Ok(())
}

fn build_source(config: &AgentConfig, snapshot: Option<PathBuf>) -> SnapshotFileSource {
    let path = snapshot.unwrap_or_else(|| PathBuf::from(&config.general.snapshot_path));
    let source = SnapshotFileSource::new(path);
    info!("Reading platform export from {}", source.path().display());
    source
}

fn build_notifier(config: &AgentConfig) -> Result<TelegramNotifier> {
    let settings = &config.notifications;
    let notifier = TelegramNotifier::new(
        settings.bot_token.clone(),
        settings.chat_id.clone(),
        settings.timeout(),
    )?
    .with_base_url(settings.api_base.clone());
    Ok(notifier)
}

async fn run_agent(config: AgentConfig, snapshot: Option<PathBuf>) -> Result<()> {
    let source = build_source(&config, snapshot);
    let notifier = build_notifier(&config)?;
    let tick_interval = config.general.tick_interval();

    info!(
        "Reports: detailed every {} min, summary every {} min",
        config.reports.detailed_interval_mins, config.reports.summary_interval_mins
    );

    let mut agent = ReportingAgent::new(source, notifier, config, Utc::now());
    if let Err(e) = agent.start(Utc::now()).await {
        warn!("Initial account read failed, will keep retrying: {}", e);
    }

    for kind in [ReportKind::Detailed, ReportKind::Summary] {
        match agent.schedule().entry(kind).next_due() {
            Some(at) => info!("First {} report due at {}", kind, at.format("%Y-%m-%d %H:%M:%S UTC")),
            None => info!("{} reports disabled", kind),
        }
    }

    info!("Press Ctrl+C to stop");
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match agent.tick(Utc::now()).await {
                    Ok(outcome) => {
                        if let LedgerRefresh::Rebuilt(count) = outcome.ledger {
                            debug!("Ledger refreshed: {} trades", count);
                        }
                        for kind in outcome.sent {
                            info!("Sent {} report", kind);
                        }
                    }
                    Err(e) => debug!("Tick skipped: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    agent.shutdown(Utc::now()).await;
    for entry in agent.notification_log().recent(5) {
        debug!(
            "Recent delivery {} at {}: {:?} {:?}",
            entry.id,
            entry.timestamp.format("%H:%M:%S"),
            entry.kind,
            entry.outcome
        );
    }
    Ok(())
}

async fn run_report(
    config: AgentConfig,
    snapshot: Option<PathBuf>,
    kind: ReportKind,
    send: bool,
) -> Result<()> {
    let source = build_source(&config, snapshot);
    let notifier = build_notifier(&config)?;
    let now = Utc::now();

    let mut agent = ReportingAgent::new(source, notifier, config, now);
    agent.prime(now).await?;
    info!("{} closed trades in history", agent.ledger().len());

    let text = agent
        .compose(kind, now)
        .ok_or_else(|| anyhow!("no account data to report on"))?;
    println!("{}", text);

    if send {
        if !agent.notifications_active() {
            bail!("notifications are disabled or credentials are missing");
        }
        if !agent.send_message(kind.into(), &text, now).await {
            bail!("{} report was not delivered", kind);
        }
    }
    Ok(())
}

async fn ping(config: &AgentConfig) -> Result<()> {
    if !config.notifications.has_credentials() {
        bail!("set notifications.bot_token and notifications.chat_id first");
    }
    let notifier = build_notifier(config)?;

    let text = format!(
        "*Test message: {}*\nSent at {}",
        report::format::escape_markdown(&config.general.account_label),
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    let mut log = NotificationLog::default();
    if !deliver(&notifier, &mut log, MessageKind::Test, &text, Utc::now()).await {
        bail!("test message was not delivered");
    }
    Ok(())
}
