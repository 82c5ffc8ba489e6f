use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use approval_core::{
    HttpRegistrationStore, InMemoryRegistrationStore, RegistrationStore, TransitionOutcome,
    WorkflowManager,
};
use clap::{Parser, Subcommand};
use shared::{
    domain::{RegistrationId, RegistrationStatus},
    protocol::RegistrationRecord,
};
use tracing::{debug, info};

mod config;
mod render;

#[derive(Parser, Debug)]
#[command(about = "Review pending hotel registrations")]
struct Cli {
    /// Overrides `server_url` from moderator.toml and the environment.
    #[arg(long)]
    server_url: Option<String>,
    /// Run against an in-memory store seeded from this JSON file.
    #[arg(long, value_name = "SEED")]
    local: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long, default_value = "pending")]
        tab: RegistrationStatus,
    },
    Show {
        id: String,
    },
    Approve {
        id: String,
    },
    Reject {
        id: String,
        #[arg(long)]
        reason: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();

    let manager = WorkflowManager::new(open_store(&cli)?);
    spawn_event_log(&manager);

    refresh(&manager).await;

    match cli.command {
        Command::List { tab } => {
            println!("{}", render::projection(&manager.projection(tab).await));
        }
        Command::Show { id } => {
            let registration = manager
                .select(&RegistrationId::new(id))
                .await
                .context("registration is not in any loaded bucket")?;
            println!("{}", render::detail(&registration));
        }
        Command::Approve { id } => {
            transition(&manager, RegistrationId::new(id), None).await?;
        }
        Command::Reject { id, reason } => {
            transition(&manager, RegistrationId::new(id), Some(reason)).await?;
        }
    }

    Ok(())
}

fn open_store(cli: &Cli) -> Result<Arc<dyn RegistrationStore>> {
    if let Some(seed) = &cli.local {
        let raw = fs::read_to_string(seed)
            .with_context(|| format!("failed to read seed file '{}'", seed.display()))?;
        let records: Vec<RegistrationRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("seed file '{}' is not a registration array", seed.display()))?;
        let store = InMemoryRegistrationStore::from_records(records)?;
        info!(seed = %seed.display(), "moderator: using local profile");
        return Ok(Arc::new(store));
    }

    let settings = config::load_settings();
    let server_url = cli.server_url.clone().unwrap_or(settings.server_url.clone());
    let store = HttpRegistrationStore::new(&server_url, settings.request_timeout())?;
    info!(%server_url, "moderator: using registration store");
    Ok(Arc::new(store))
}

fn spawn_event_log(manager: &WorkflowManager) {
    let mut events = manager.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(?event, "moderator: workflow event");
        }
    });
}

async fn refresh(manager: &WorkflowManager) {
    let outcome = manager.refresh().await;
    if let Some(failed) = outcome.failures() {
        for line in render::bucket_failures(failed) {
            eprintln!("{line}");
        }
    }
}

async fn transition(
    manager: &WorkflowManager,
    id: RegistrationId,
    reason: Option<String>,
) -> Result<()> {
    let name = manager
        .snapshot()
        .await
        .find(&id)
        .map(|registration| registration.name.clone())
        .unwrap_or_else(|| id.to_string());

    let outcome = match &reason {
        Some(reason) => manager.reject(&id, reason).await,
        None => manager.approve(&id).await,
    };

    match &outcome {
        TransitionOutcome::Committed(committed) => {
            println!("{}", render::committed(&name, committed.status));
            if let Some(failed) = committed.refresh.failures() {
                for line in render::bucket_failures(failed) {
                    eprintln!("{line}");
                }
            }
            Ok(())
        }
        TransitionOutcome::Failed(failed) => {
            if outcome.requires_refresh() {
                refresh(manager).await;
            }
            bail!(render::failure(&failed.error))
        }
    }
}
