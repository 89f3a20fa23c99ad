//! Gateway connection
//!
//! Maintains the websocket session against the Discord gateway:
//! Hello → Identify → heartbeats, then MESSAGE_CREATE dispatches are
//! parsed into [`CommandEvent`]s and forwarded on a channel. A dropped
//! socket tears the session down and a fresh one is opened.

use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::rest::RestClient;
use crate::chat::CommandEvent;
use economy_core::UserId;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

/// GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
const INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 15);

/// Delay before reopening a dropped gateway session
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct Frame {
    op: u8,
    #[serde(default)]
    d: serde_json::Value,
    #[serde(default)]
    s: Option<u64>,
    #[serde(default)]
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Hello {
    heartbeat_interval: u64,
}

#[derive(Debug, Deserialize)]
struct Ready {
    user: Author,
}

#[derive(Debug, Deserialize)]
struct MessageCreate {
    content: String,
    channel_id: String,
    #[serde(default)]
    guild_id: Option<String>,
    author: Author,
}

#[derive(Debug, Deserialize)]
struct Author {
    id: String,
    username: String,
    #[serde(default)]
    bot: bool,
}

/// Inbound half of the Discord adapter
pub struct Gateway {
    token: String,
    prefix: String,
    events: mpsc::Sender<CommandEvent>,
}

impl Gateway {
    pub fn new(token: String, prefix: String, events: mpsc::Sender<CommandEvent>) -> Self {
        Self {
            token,
            prefix,
            events,
        }
    }

    /// Connect and serve until the event receiver is dropped
    pub async fn run(&self, rest: &RestClient) -> Result<()> {
        loop {
            let url = rest.gateway_url().await?;
            match self.session(&url).await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::warn!("gateway session ended: {e}"),
            }
            sleep(RECONNECT_DELAY).await;
        }
    }

    /// One websocket session: identify, heartbeat, dispatch
    async fn session(&self, url: &str) -> Result<()> {
        let ws_url = format!("{url}/?v=10&encoding=json");
        let (ws, _) = connect_async(&ws_url).await?;
        let (mut write, mut read) = ws.split();

        // Hello arrives first and carries the heartbeat interval
        let hello = loop {
            let frame = match read.next().await {
                Some(msg) => parse_frame(msg?)?,
                None => return Err(anyhow!("gateway closed before Hello")),
            };
            if let Some(frame) = frame {
                if frame.op != OP_HELLO {
                    return Err(anyhow!("expected Hello, got op {}", frame.op));
                }
                break serde_json::from_value::<Hello>(frame.d)?;
            }
        };

        let identify = json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.token,
                "intents": INTENTS,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "economy-bot",
                    "device": "economy-bot",
                },
            },
        });
        write.send(Message::Text(identify.to_string())).await?;

        let mut heartbeat = interval(Duration::from_millis(hello.heartbeat_interval));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_seq: Option<u64> = None;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = json!({ "op": OP_HEARTBEAT, "d": last_seq });
                    write.send(Message::Text(beat.to_string())).await?;
                }

                msg = read.next() => {
                    let msg = match msg {
                        Some(msg) => msg?,
                        None => return Err(anyhow!("gateway socket closed")),
                    };
                    let Some(frame) = parse_frame(msg)? else {
                        continue;
                    };
                    if frame.s.is_some() {
                        last_seq = frame.s;
                    }

                    match frame.op {
                        OP_DISPATCH => self.handle_dispatch(frame).await,
                        OP_HEARTBEAT => {
                            // the gateway may request an immediate beat
                            let beat = json!({ "op": OP_HEARTBEAT, "d": last_seq });
                            write.send(Message::Text(beat.to_string())).await?;
                        }
                        OP_HEARTBEAT_ACK => {}
                        OP_RECONNECT => return Err(anyhow!("gateway requested reconnect")),
                        OP_INVALID_SESSION => return Err(anyhow!("gateway invalidated the session")),
                        _ => {}
                    }
                }
            }
        }
    }

    async fn handle_dispatch(&self, frame: Frame) {
        match frame.t.as_deref() {
            Some("READY") => match serde_json::from_value::<Ready>(frame.d) {
                Ok(ready) => tracing::info!("{} is online", ready.user.username),
                Err(e) => tracing::debug!("unparsable READY payload: {e}"),
            },
            Some("MESSAGE_CREATE") => {
                let message = match serde_json::from_value::<MessageCreate>(frame.d) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::debug!("unparsable MESSAGE_CREATE payload: {e}");
                        return;
                    }
                };
                if let Some(event) = parse_command(message, &self.prefix) {
                    if self.events.send(event).await.is_err() {
                        tracing::debug!("event receiver dropped, discarding command");
                    }
                }
            }
            _ => {}
        }
    }
}

fn parse_frame(msg: Message) -> Result<Option<Frame>> {
    match msg {
        Message::Text(text) => Ok(Some(serde_json::from_str(&text)?)),
        Message::Close(reason) => Err(anyhow!("gateway closed: {reason:?}")),
        // ping/pong are handled by tungstenite itself
        _ => Ok(None),
    }
}

/// Turn a message into a command event, if it is a prefixed command from
/// a human sender
fn parse_command(message: MessageCreate, prefix: &str) -> Option<CommandEvent> {
    if message.author.bot {
        return None;
    }
    let stripped = message.content.strip_prefix(prefix)?;
    let (command, args) = match stripped.split_once(char::is_whitespace) {
        Some((command, args)) => (command, args.trim()),
        None => (stripped, ""),
    };
    if command.is_empty() {
        return None;
    }

    Some(CommandEvent {
        sender: UserId::new(message.author.id),
        sender_name: message.author.username,
        guild_id: message.guild_id,
        channel_id: message.channel_id,
        command: command.to_string(),
        args: args.to_string(),
    })
}
