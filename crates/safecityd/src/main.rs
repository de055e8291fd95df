use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use safecity_core::event::{DocumentEvent, Snapshot};
use safecity_core::types::EventId;
use safecity_core::validation::{has_errors, Validate, ValidationLevel};
use safecity_notify::{transport_from_config, ReplayJournal};
use safecityd::{
    build_registry, init_tracing, load_config, replay_claimed, run_server, AppState, DaemonError,
    ReplayView, ReportView,
};
use std::fs;
use std::path::{Path, PathBuf};

/// SafeCity push-notification dispatcher.
#[derive(Debug, Parser)]
#[command(name = "safecityd", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Accept creation events over HTTP.
    Serve(ServeArgs),
    /// Handle a single creation event and print the report.
    Dispatch(DispatchArgs),
    /// Resend deliveries recorded in the failure journal.
    Replay(ReplayArgs),
    /// Print configuration issues; exits non-zero on errors.
    CheckConfig(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Config file [default: config/safecity.toml when present]
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ServeArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Overrides `[server] bind`.
    #[arg(long)]
    bind: Option<String>,
}

#[derive(Debug, Args)]
struct DispatchArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Document path, e.g. `incidents/abc123`.
    #[arg(long)]
    document: String,
    /// JSON file holding the document snapshot. Omitted means no snapshot.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    #[arg(long)]
    event_id: Option<String>,
}

#[derive(Debug, Args)]
struct ReplayArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Overrides `[journal] path`.
    #[arg(long)]
    journal: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("safecityd failed: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Dispatch(args) => dispatch(args).await,
        Command::Replay(args) => replay_journal(args).await,
        Command::CheckConfig(args) => check_config(args),
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.config.as_deref())?;
    init_tracing(&config.logging)?;
    let registry = build_registry(&config)?;
    let bind = resolve_bind(args.bind, &config.server.bind)?;
    run_server(&bind, AppState::new(registry)).await?;
    Ok(())
}

async fn dispatch(args: DispatchArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.config.as_deref())?;
    init_tracing(&config.logging)?;
    let registry = build_registry(&config)?;

    let snapshot = args.snapshot.as_deref().map(read_snapshot).transpose()?;
    let mut event = DocumentEvent::new(args.document, snapshot);
    if let Some(id) = args.event_id {
        event = event.with_event_id(EventId::new(id));
    }

    let report = registry.dispatch(event).await?;
    let rendered = serde_json::to_string_pretty(&ReportView::from(&report))
        .context("failed to render dispatch report")?;
    println!("{rendered}");
    Ok(())
}

async fn replay_journal(args: ReplayArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.config.as_deref())?;
    init_tracing(&config.logging)?;
    let path = args
        .journal
        .or_else(|| config.journal.path.clone())
        .ok_or(DaemonError::NoJournal)?;

    let transport = transport_from_config(&config.transport)?;
    let journal = ReplayJournal::new(path);
    let summary = replay_claimed(&journal, transport.as_ref()).await?;
    if summary.attempted == 0 {
        println!("journal {} is empty", journal.path().display());
        return Ok(());
    }

    let rendered = serde_json::to_string_pretty(&ReplayView::from(&summary))
        .context("failed to render replay summary")?;
    println!("{rendered}");
    Ok(())
}

fn check_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref())?;
    let issues = config.validate();
    if issues.is_empty() {
        println!("config ok");
        return Ok(());
    }
    for issue in &issues {
        let level = match issue.level {
            ValidationLevel::Error => "error",
            ValidationLevel::Warning => "warning",
        };
        println!("{level}: {} {}", issue.code, issue.message);
    }
    if has_errors(&issues) {
        anyhow::bail!("config has blocking issues");
    }
    Ok(())
}

fn resolve_bind(bind_override: Option<String>, configured: &str) -> Result<String, DaemonError> {
    let candidate = bind_override.unwrap_or_else(|| configured.to_string());
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err(DaemonError::InvalidConfig(
            "bind address must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

fn read_snapshot(path: &Path) -> Result<Snapshot, DaemonError> {
    let body = fs::read_to_string(path).map_err(|source| DaemonError::ReadSnapshot {
        path: path.to_path_buf(),
        source,
    })?;
    let value: serde_json::Value =
        serde_json::from_str(&body).map_err(|source| DaemonError::ParseSnapshot {
            path: path.to_path_buf(),
            source,
        })?;
    Snapshot::from_value(value).ok_or_else(|| DaemonError::SnapshotShape {
        path: path.to_path_buf(),
    })
}
