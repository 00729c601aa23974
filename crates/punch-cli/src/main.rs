use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use punch_cli::commands::{
    active, auto_stop, company_earnings, complete, earnings, import, list, start, status, stop,
};
use punch_cli::{Cli, Commands, Config};
use punch_core::DomainEvent;
use punch_core::types::UserId;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(punch_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let options = punch_db::OpenOptions {
        busy_timeout_ms: config.busy_timeout_ms,
    };
    let db = punch_db::Database::open_with(&config.database_path, options)
        .context("failed to open database")?;
    Ok((db, config))
}

/// Resolve the acting user from the flag or the configured default.
fn resolve_user(cli_user: Option<&str>, config: &Config) -> Result<UserId> {
    let id = cli_user
        .map(str::to_string)
        .or_else(|| config.default_user.clone())
        .context("no user identity: pass --user or set default_user in the config")?;
    UserId::new(id).context("invalid user ID")
}

/// Delivers events to the configured fan-out endpoint.
///
/// The ledger transaction already committed by this point; delivery failures
/// are logged, never surfaced as command failures.
fn publish_events(config: &Config, events: &[DomainEvent]) {
    if events.is_empty() {
        return;
    }
    let Some(endpoint) = config.sync_endpoint.as_deref() else {
        tracing::debug!(count = events.len(), "no sync endpoint configured, events not published");
        return;
    };
    let publisher = match punch_sync::Publisher::new(endpoint) {
        Ok(publisher) => publisher,
        Err(err) => {
            tracing::warn!(error = %err, "invalid sync endpoint");
            return;
        }
    };
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::warn!(error = %err, "failed to start event runtime");
            return;
        }
    };
    if let Err(err) = runtime.block_on(publisher.publish(events)) {
        tracing::warn!(error = %err, "event publish failed");
    }
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Start { sub_task, json }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            let events = start::run(&mut db, &user, sub_task, *json)?;
            publish_events(&config, &events);
        }
        Some(Commands::Stop { sub_task, json }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            let events = stop::run(&mut db, &user, sub_task, *json)?;
            publish_events(&config, &events);
        }
        Some(Commands::Complete {
            sub_task,
            comment,
            attachments,
            json,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            let events = complete::run(
                &mut db,
                &user,
                sub_task,
                comment.clone(),
                attachments.clone(),
                *json,
            )?;
            publish_events(&config, &events);
        }
        Some(Commands::AutoStop {
            sub_task,
            comment,
            attachments,
            json,
        }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            let events = auto_stop::run(
                &mut db,
                &user,
                sub_task,
                comment.clone(),
                attachments.clone(),
                *json,
            )?;
            publish_events(&config, &events);
        }
        Some(Commands::Active { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            active::run(&db, &user, *json)?;
        }
        Some(Commands::List { task, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            list::run(&db, task, *json)?;
        }
        Some(Commands::Earnings { from, to, json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let user = resolve_user(cli.user.as_deref(), &config)?;
            earnings::run(&db, &user, *from, *to, *json)?;
        }
        Some(Commands::CompanyEarnings {
            company,
            from,
            to,
            batch_size,
            json,
        }) => {
            // Open once to initialize the schema; the batch path opens its
            // own bounded set of connections.
            let (db, config) = open_database(cli.config.as_deref())?;
            drop(db);
            company_earnings::run(&config, company, *from, *to, *batch_size, *json)?;
        }
        Some(Commands::Import) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            import::run(&mut db)?;
        }
        Some(Commands::Status { json }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&db, &config.database_path, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
