//! Nordigen command line client
//!
//! Authenticates against the Bank Account Data API, runs one command, and
//! shuts the credential renewal task down cleanly. `watch` keeps the client
//! alive until SIGINT/SIGTERM and logs every credential state change.

mod cli;
mod config;

use anyhow::{Context, Result, bail};
use clap::Parser;
use nordigen_client::{
    Client, CredentialState, EndUserAgreement, Requisition, RequisitionLinkRequest,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so command output on stdout stays parseable
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let config_path = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        base_url = %config.nordigen.base_url,
        timeout_secs = config.nordigen.timeout_secs,
        "configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let client = Client::with_cancellation(config.client_config()?, &shutdown)
        .await
        .context("authentication failed")?;

    let outcome = run(&client, cli.command, &shutdown).await;

    // A renewal failure ends the task on its own; report it alongside the
    // command result rather than instead of it.
    if let Err(e) = client.shutdown().await {
        error!(error = %e, "credential renewal ended with an error");
        if outcome.is_ok() {
            return Err(e).context("credential renewal failed");
        }
    }
    outcome
}

async fn run(client: &Client, command: Command, shutdown: &CancellationToken) -> Result<()> {
    match command {
        Command::Institutions { country } => {
            print_json(&client.list_institutions(&country).await?)
        }
        Command::Institution { id } => print_json(&client.institution(&id).await?),
        Command::Agreement {
            institution_id,
            max_historical_days,
        } => {
            let request = EndUserAgreement {
                institution_id: Some(institution_id),
                max_historical_days,
                ..Default::default()
            };
            print_json(&client.create_end_user_agreement(&request).await?)
        }
        Command::Requisitions => print_json(&client.list_requisitions().await?),
        Command::Requisition { id } => print_json(&client.requisition(&id).await?),
        Command::CreateRequisition {
            redirect,
            reference,
            agreement,
        } => {
            let request = Requisition {
                redirect,
                reference,
                agreements: agreement.into_iter().collect(),
                ..Default::default()
            };
            print_json(&client.create_requisition(&request).await?)
        }
        Command::Link {
            requisition_id,
            aspsp_id,
        } => {
            let link = client
                .create_requisition_link(&requisition_id, &RequisitionLinkRequest { aspsp_id })
                .await?;
            print_json(&link)
        }
        Command::Account { id } => print_json(&client.account_metadata(&id).await?),
        Command::Balances { id } => print_json(&client.account_balances(&id).await?),
        Command::Details { id } => print_json(&client.account_details(&id).await?),
        Command::Transactions { id } => {
            print_json(&client.account_transactions(&id).await?)
        }
        Command::Watch => watch(client, shutdown).await,
    }
}

/// Log credential state changes until a signal arrives or renewal stops.
async fn watch(client: &Client, shutdown: &CancellationToken) -> Result<()> {
    let signal = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal.cancel();
    });

    let mut status = client.subscribe();
    info!(state = client.state().label(), "watching credentials");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = status.borrow_and_update().clone();
                info!(state = state.label(), "credential state changed");
                match state {
                    CredentialState::Stopped { error: Some(e) } => {
                        bail!("credential renewal stopped: {e}")
                    }
                    CredentialState::Stopped { error: None } => break,
                    _ => {}
                }
            }
        }
    }

    info!("watch finished");
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{out}");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
