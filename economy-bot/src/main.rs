//! Economy bot binary
//!
//! Wires the store, the single-writer actor, the dispatcher, and the
//! Discord adapter into one process that connects and serves until
//! terminated.

use anyhow::Context;
use dotenv::dotenv;
use economy_bot::chat::ChatClient;
use economy_bot::discord::{Gateway, RestClient};
use economy_bot::{BotConfig, Dispatcher};
use economy_core::{spawn_economy_actor, Store};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Command events buffered between the gateway and the dispatch loop
const EVENT_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if std::env::var("DISCORD_TOKEN").is_err() {
        eprintln!("Discord token not found!");
        eprintln!("Set the DISCORD_TOKEN environment variable (or add it to a .env file).");
        std::process::exit(1);
    }
    let config = BotConfig::from_env().context("failed to load configuration")?;

    let core_config = economy_core::Config {
        data_file: config.data_file.clone().into(),
        ..economy_core::Config::default()
    };
    let store = Store::new(&core_config.data_file);
    // surface a corrupt data file now rather than on the first command
    store
        .load()
        .with_context(|| format!("data file {:?} is unreadable", core_config.data_file))?;
    let economy = spawn_economy_actor(store, core_config.mailbox_capacity);

    let rest = Arc::new(RestClient::new(config.discord_token.clone()));
    let dispatcher = Arc::new(Dispatcher::new(
        economy,
        rest.clone() as Arc<dyn ChatClient>,
        config.command_prefix.clone(),
    ));

    let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);
    let gateway = Gateway::new(
        config.discord_token.clone(),
        config.command_prefix.clone(),
        events_tx,
    );
    let gateway_rest = rest.clone();
    tokio::spawn(async move {
        if let Err(e) = gateway.run(&gateway_rest).await {
            tracing::error!("gateway terminated: {e}");
        }
    });

    info!(
        "serving economy commands with prefix {:?} from {:?}",
        config.command_prefix, config.data_file
    );

    // each command runs as its own task; the actor serializes the store
    while let Some(event) = events_rx.recv().await {
        let dispatcher = dispatcher.clone();
        let chat = rest.clone();
        tokio::spawn(async move {
            if let Some(reply) = dispatcher.handle(&event).await {
                if let Err(e) = chat.send(&event.channel_id, &reply).await {
                    tracing::error!("failed to send reply: {e}");
                }
            }
        });
    }

    Ok(())
}
