//! RotaBot — on-call rota bot.
//!
//! Wires the configured rotas to a SQLite history store and a Slack
//! gateway, arms one reminder trigger per rota, and answers
//! "who is on duty" queries addressed to the bot.

mod respond;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use futures::StreamExt;
use tokio::sync::Mutex;

use rotabot_channels::SlackGateway;
use rotabot_core::traits::ChatGateway;
use rotabot_core::RotaBotConfig;
use rotabot_engine::{DutyResolver, RotaRegistry};
use rotabot_scheduler::{spawn_dispatcher, TriggerDispatcher};
use rotabot_store::SqliteHistoryStore;

use respond::{Query, Responder, DIDNT_UNDERSTAND, RESOLVE_FAILED};

#[derive(Parser, Debug)]
#[command(name = "rotabot", about = "On-call rota bot", version)]
struct Args {
    /// Config file path (default: ~/.rotabot/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dispatcher tick interval in seconds
    #[arg(long, default_value_t = 1)]
    tick_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RotaBotConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RotaBotConfig::load().context("loading config")?,
    };
    config.validate().context("validating config")?;
    tracing::info!("loaded {} rota(s)", config.rotas.len());

    let store = Arc::new(
        SqliteHistoryStore::open(&config.store.db_path()).context("opening history store")?,
    );
    tracing::info!("history store has {} record(s)", store.record_count());

    let gateway = Arc::new(SlackGateway::new(config.slack.clone()));
    let identity = gateway
        .auth_test()
        .await
        .context("authenticating with Slack")?;
    tracing::info!("connected as @{} ({})", identity.user, identity.user_id);

    let registry = RotaRegistry::new(config.rotas.clone());
    let mut resolver = DutyResolver::new(registry, store);
    {
        let gateway = gateway.clone();
        resolver.set_identity_resolver(move |name| {
            let gateway = gateway.clone();
            async move { gateway.user_id_by_name(&name).await }
        });
    }
    let resolver = Arc::new(resolver);

    let home_channel = resolve_home_channel(gateway.as_ref(), &config.slack.home_channel).await;

    let shorthands: Vec<String> = config
        .rotas
        .iter()
        .map(|r| format!("`{}?`", r.id.to_lowercase()))
        .collect();
    let greeting = format!("RotaBot online. Ask me {}.", shorthands.join(" or "));
    if let Err(e) = gateway.send_message(&home_channel, &greeting).await {
        tracing::warn!("startup greeting failed: {e}");
    }

    // Arm one trigger per rota; failures are reported and skipped so
    // a bad schedule in one rota never silences the others.
    let mut dispatcher =
        TriggerDispatcher::new(resolver.clone(), gateway.clone(), home_channel.clone());
    let failures = dispatcher.register_all(&config.rotas).await;
    if !failures.is_empty() {
        tracing::warn!("{} rota(s) have no active reminder trigger", failures.len());
    }
    tokio::spawn(spawn_dispatcher(
        Arc::new(Mutex::new(dispatcher)),
        args.tick_interval,
    ));

    // Inbound query loop. Each query is handled on its own task so a
    // slow store call never stalls delivery of other messages.
    let responder = Arc::new(Responder::new(&identity.user_id, &config.rotas));
    let mut events = gateway.listen().await.context("starting socket mode")?;
    tracing::info!("listening for queries");

    while let Some(message) = events.next().await {
        let Some(query) = responder.parse(&message.text) else {
            continue;
        };
        let resolver = resolver.clone();
        let gateway = gateway.clone();
        tokio::spawn(async move {
            let reply = match query {
                Query::WhoIsOnDuty { rota_id } => match resolver.resolve(&rota_id).await {
                    Ok(resolution) => resolution.assignee,
                    Err(e) => {
                        tracing::error!("query for rota {rota_id} failed: {e}");
                        RESOLVE_FAILED.to_string()
                    }
                },
                Query::Unrecognized => DIDNT_UNDERSTAND.to_string(),
            };
            if let Err(e) = gateway.send_message(&message.channel_id, &reply).await {
                tracing::error!("reply delivery failed: {e}");
            }
        });
    }

    tracing::info!("event stream ended, shutting down");
    Ok(())
}

/// Resolve the home channel name to an id, falling back to the raw
/// name when the lookup fails — chat.postMessage accepts both.
async fn resolve_home_channel(gateway: &SlackGateway, name: &str) -> String {
    match gateway.channel_id_by_name(name).await {
        Ok(id) if id != "unknown" => id,
        Ok(_) => {
            tracing::warn!("home channel '{name}' not found, using the name directly");
            name.to_string()
        }
        Err(e) => {
            tracing::warn!("home channel lookup failed ({e}), using the name directly");
            name.to_string()
        }
    }
}
