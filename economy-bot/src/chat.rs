//! Chat-platform port
//!
//! The dispatcher reaches the platform only through this module: an
//! inbound [`CommandEvent`] stream and the outbound [`ChatClient`] trait.
//! The concrete Discord adapter lives in [`crate::discord`]; tests swap in
//! a mock.

use async_trait::async_trait;
use economy_core::UserId;

/// Embed colors carried over from the legacy bot
pub mod color {
    /// Success green
    pub const SUCCESS: u32 = 0x00ff00;
    /// Denial red
    pub const DENIAL: u32 = 0xff0000;
    /// Informational blue
    pub const INFO: u32 = 0x0099ff;
    /// Ranking gold
    pub const GOLD: u32 = 0xffd700;
    /// Revocation orange
    pub const WARNING: u32 = 0xff9900;
}

/// Structured display payload, rendered as an embed by the adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Embed title
    pub title: String,
    /// Embed body text
    pub body: String,
    /// Embed accent color
    pub color: u32,
}

impl Reply {
    /// Build a reply payload
    pub fn new(title: impl Into<String>, body: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            color,
        }
    }
}

/// Inbound command event delivered by the platform adapter
///
/// The adapter has already stripped the command prefix and split the
/// command name from its raw argument text.
#[derive(Debug, Clone)]
pub struct CommandEvent {
    /// Platform id of the sender
    pub sender: UserId,
    /// Sender display name at send time
    pub sender_name: String,
    /// Guild (server) the command came from; absent in direct messages
    pub guild_id: Option<String>,
    /// Channel to answer in
    pub channel_id: String,
    /// Command name, prefix stripped
    pub command: String,
    /// Raw argument text after the command name
    pub args: String,
}

/// Outbound operations the bot needs from the chat platform
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a display payload to a channel
    async fn send(&self, channel_id: &str, reply: &Reply) -> anyhow::Result<()>;

    /// Resolve a user id to a display name; fails for unknown or deleted
    /// accounts
    async fn display_name(&self, user: &UserId) -> anyhow::Result<String>;

    /// Whether `user` is an administrator of `guild_id`
    async fn is_admin(&self, guild_id: &str, user: &UserId) -> anyhow::Result<bool>;
}
