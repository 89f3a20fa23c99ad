use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::chat::{ChatClient, Reply};
use economy_core::UserId;

const API_BASE: &str = "https://discord.com/api/v10";

/// ADMINISTRATOR permission bit
const PERM_ADMINISTRATOR: u64 = 1 << 3;

/// Authenticated Discord REST client
pub struct RestClient {
    client: Client,
    base: String,
    token: String,
}

impl RestClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            base: std::env::var("DISCORD_API_BASE").unwrap_or_else(|_| API_BASE.to_string()),
            token,
        }
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base, path);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(anyhow!("Discord API {status} on {path}: {body}"));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Resolve the gateway websocket URL for this bot
    pub async fn gateway_url(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct GatewayBot {
            url: String,
        }

        let gateway: GatewayBot = self.get_json("/gateway/bot").await?;
        Ok(gateway.url)
    }
}

#[async_trait]
impl ChatClient for RestClient {
    async fn send(&self, channel_id: &str, reply: &Reply) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.base, channel_id);
        let payload = json!({
            "embeds": [{
                "title": reply.title,
                "description": reply.body,
                "color": reply.color,
            }],
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", self.auth())
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Discord API {status} sending message: {body}"));
        }
        Ok(())
    }

    async fn display_name(&self, user: &UserId) -> Result<String> {
        #[derive(Deserialize)]
        struct User {
            username: String,
        }

        let user: User = self.get_json(&format!("/users/{user}")).await?;
        Ok(user.username)
    }

    async fn is_admin(&self, guild_id: &str, user: &UserId) -> Result<bool> {
        #[derive(Deserialize)]
        struct Guild {
            owner_id: String,
        }
        #[derive(Deserialize)]
        struct Role {
            id: String,
            permissions: String,
        }
        #[derive(Deserialize)]
        struct Member {
            roles: Vec<String>,
        }

        let guild: Guild = self.get_json(&format!("/guilds/{guild_id}")).await?;
        if guild.owner_id == user.as_str() {
            return Ok(true);
        }

        let roles: Vec<Role> = self.get_json(&format!("/guilds/{guild_id}/roles")).await?;
        let member: Member = self
            .get_json(&format!("/guilds/{guild_id}/members/{user}"))
            .await?;

        // The @everyone role carries the guild's own id and applies to all
        Ok(roles
            .iter()
            .filter(|role| role.id == guild_id || member.roles.contains(&role.id))
            .filter_map(|role| role.permissions.parse::<u64>().ok())
            .any(|permissions| permissions & PERM_ADMINISTRATOR != 0))
    }
}
