//! Command dispatcher
//!
//! Translates inbound command events into economy operations and shapes
//! the results into display payloads. Argument-shape errors (bad integers,
//! missing separators, bad mentions) are answered here; domain denials
//! (invalid item, insufficient funds) come back from the ledger and are
//! formatted here. Administrator gating runs before any argument parsing
//! or ledger call.

use crate::chat::{color, ChatClient, CommandEvent, Reply};
use economy_core::{EconomyHandle, Error, UserId};
use std::sync::Arc;

/// Commands that mutate other users' balances or the catalog
const ADMIN_COMMANDS: &[&str] = &["grant", "revoke", "add-item"];

/// How many ranking rows and history records a reply shows
const DISPLAY_LIMIT: usize = 10;

/// Maps chat commands onto the economy actor
pub struct Dispatcher {
    economy: EconomyHandle,
    chat: Arc<dyn ChatClient>,
    prefix: String,
}

impl Dispatcher {
    /// Create a dispatcher answering commands under `prefix`
    pub fn new(economy: EconomyHandle, chat: Arc<dyn ChatClient>, prefix: impl Into<String>) -> Self {
        Self {
            economy,
            chat,
            prefix: prefix.into(),
        }
    }

    /// Handle one command event; `None` means the command is not ours
    pub async fn handle(&self, event: &CommandEvent) -> Option<Reply> {
        if ADMIN_COMMANDS.contains(&event.command.as_str()) {
            match self.sender_is_admin(event).await {
                Ok(true) => {}
                Ok(false) => return Some(permission_denial()),
                Err(e) => {
                    tracing::error!("permission check failed for {}: {e}", event.sender);
                    return Some(internal_failure());
                }
            }
        }

        let result = match event.command.as_str() {
            "balance" => self.balance(event).await,
            "shop" => self.shop().await,
            "buy" => self.buy(event).await,
            "ranking" => self.ranking().await,
            "history" => self.history(event).await,
            "grant" => self.grant(event).await,
            "revoke" => self.revoke(event).await,
            "add-item" => self.add_item(event).await,
            _ => return None,
        };

        Some(result.unwrap_or_else(|e| {
            tracing::error!("command {:?} failed: {e}", event.command);
            internal_failure()
        }))
    }

    async fn sender_is_admin(&self, event: &CommandEvent) -> anyhow::Result<bool> {
        // Direct messages have no guild, so no administrators either
        let Some(guild_id) = event.guild_id.as_deref() else {
            return Ok(false);
        };
        self.chat.is_admin(guild_id, &event.sender).await
    }

    async fn balance(&self, event: &CommandEvent) -> economy_core::Result<Reply> {
        let tokens = self.economy.balance(event.sender.clone()).await?;
        Ok(Reply::new(
            "💰 Your Balance",
            format!("You have **{tokens}** tokens"),
            color::SUCCESS,
        ))
    }

    async fn shop(&self) -> economy_core::Result<Reply> {
        let listing = self.economy.list_shop().await?;
        if listing.is_empty() {
            return Ok(Reply::new("🏪 Shop", "The shop is empty!", color::DENIAL));
        }

        let body = listing
            .iter()
            .map(|(position, item)| {
                format!(
                    "**ID: {position} — {}**\nPrice: {} tokens\n{}",
                    item.name, item.price, item.description
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Reply::new("🏪 Shop", body, color::INFO))
    }

    async fn buy(&self, event: &CommandEvent) -> economy_core::Result<Reply> {
        let Ok(position) = event.args.trim().parse::<usize>() else {
            return Ok(self.usage("buy <item position>"));
        };

        let result = self
            .economy
            .purchase(event.sender.clone(), event.sender_name.clone(), position)
            .await;
        match result {
            Ok(record) => Ok(Reply::new(
                "✅ Purchase Complete!",
                format!(
                    "You bought **{}** for {} tokens!",
                    record.item_name, record.price
                ),
                color::SUCCESS,
            )),
            Err(Error::InvalidItem(_)) => Ok(Reply::new(
                "❌ Invalid Item",
                "That item position is not in the shop!",
                color::DENIAL,
            )),
            Err(Error::InsufficientFunds { required }) => Ok(Reply::new(
                "❌ Not Enough Tokens",
                format!("You don't have enough tokens! You need {required} tokens."),
                color::DENIAL,
            )),
            Err(e) => Err(e),
        }
    }

    async fn ranking(&self) -> economy_core::Result<Reply> {
        let rows = self.economy.ranking().await?;
        if rows.is_empty() {
            return Ok(Reply::new(
                "🏆 Token Ranking",
                "No users found!",
                color::DENIAL,
            ));
        }

        let mut lines = Vec::new();
        for (place, (user, tokens)) in rows.into_iter().take(DISPLAY_LIMIT).enumerate() {
            // Unresolvable users (deleted accounts) are skipped, not fatal;
            // their place in the ranking stays empty
            match self.chat.display_name(&user).await {
                Ok(name) => lines.push(format!("{}. {name}: {tokens} tokens", place + 1)),
                Err(e) => tracing::debug!("skipping unresolvable user {user}: {e}"),
            }
        }
        Ok(Reply::new("🏆 Token Ranking", lines.join("\n"), color::GOLD))
    }

    async fn history(&self, event: &CommandEvent) -> economy_core::Result<Reply> {
        let records = self.economy.history(event.sender_name.clone()).await?;
        if records.is_empty() {
            return Ok(Reply::new(
                "📋 Purchase History",
                "You haven't made any purchases yet!",
                color::DENIAL,
            ));
        }

        let start = records.len().saturating_sub(DISPLAY_LIMIT);
        let body = records[start..]
            .iter()
            .map(|r| format!("**{}** — {} tokens ({})", r.item_name, r.price, r.timestamp))
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Reply::new("📋 Your Purchase History", body, color::INFO))
    }

    async fn grant(&self, event: &CommandEvent) -> economy_core::Result<Reply> {
        let Some((target, amount)) = parse_user_amount(&event.args) else {
            return Ok(self.usage("grant <user> <amount>"));
        };

        self.economy.grant(target.clone(), amount).await?;
        Ok(Reply::new(
            "✅ Tokens Granted!",
            format!("{amount} tokens were granted to <@{target}>"),
            color::SUCCESS,
        ))
    }

    async fn revoke(&self, event: &CommandEvent) -> economy_core::Result<Reply> {
        let Some((target, amount)) = parse_user_amount(&event.args) else {
            return Ok(self.usage("revoke <user> <amount>"));
        };

        match self.economy.revoke(target.clone(), amount).await {
            Ok(_) => Ok(Reply::new(
                "✅ Tokens Revoked!",
                format!("{amount} tokens were revoked from <@{target}>"),
                color::WARNING,
            )),
            Err(Error::InsufficientBalance { available }) => Ok(Reply::new(
                "❌ Not Enough Tokens",
                format!("<@{target}> only has {available} tokens!"),
                color::DENIAL,
            )),
            Err(e) => Err(e),
        }
    }

    async fn add_item(&self, event: &CommandEvent) -> economy_core::Result<Reply> {
        let usage = self.usage("add-item <price> <name> | <description>");

        let Some((price_raw, rest)) = event.args.trim().split_once(char::is_whitespace) else {
            return Ok(usage);
        };
        let Ok(price) = price_raw.parse::<i64>() else {
            return Ok(usage);
        };
        // The name/description separator is required, not optional
        let Some((name, description)) = rest.split_once(" | ") else {
            return Ok(usage);
        };

        let item = self
            .economy
            .add_item(name.trim().to_string(), price, description.trim().to_string())
            .await?;
        Ok(Reply::new(
            "✅ Item Added!",
            format!(
                "**{}** was added to the shop for {} tokens",
                item.name, item.price
            ),
            color::SUCCESS,
        ))
    }

    fn usage(&self, shape: &str) -> Reply {
        Reply::new(
            "❌ Wrong Format",
            format!("Use: `{}{shape}`", self.prefix),
            color::DENIAL,
        )
    }
}

fn permission_denial() -> Reply {
    Reply::new(
        "❌ Permission Denied",
        "You do not have permission to use this command!",
        color::DENIAL,
    )
}

fn internal_failure() -> Reply {
    Reply::new(
        "❌ Error",
        "Something went wrong while handling that command.",
        color::DENIAL,
    )
}

/// Parse `<user> <amount>` where the user is a raw id or a mention
fn parse_user_amount(args: &str) -> Option<(UserId, i64)> {
    let mut parts = args.split_whitespace();
    let target = parse_user_arg(parts.next()?)?;
    let amount = parts.next()?.parse::<i64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((target, amount))
}

/// Accepts `123456`, `<@123456>`, and the nickname form `<@!123456>`
fn parse_user_arg(raw: &str) -> Option<UserId> {
    let inner = raw
        .strip_prefix("<@!")
        .or_else(|| raw.strip_prefix("<@"))
        .and_then(|s| s.strip_suffix('>'))
        .unwrap_or(raw);
    if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
        Some(UserId::new(inner))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::MockChatClient;
    use economy_core::{spawn_economy_actor, Store};
    use tempfile::TempDir;

    fn event(command: &str, args: &str) -> CommandEvent {
        CommandEvent {
            sender: UserId::new("100"),
            sender_name: "alice".to_string(),
            guild_id: Some("900".to_string()),
            channel_id: "500".to_string(),
            command: command.to_string(),
            args: args.to_string(),
        }
    }

    fn dispatcher_with(dir: &TempDir, chat: MockChatClient) -> Dispatcher {
        let handle = spawn_economy_actor(Store::new(dir.path().join("bot_data.json")), 16);
        Dispatcher::new(handle, Arc::new(chat), "!")
    }

    fn admin_chat() -> MockChatClient {
        let mut chat = MockChatClient::new();
        chat.expect_is_admin().returning(|_, _| Ok(true));
        chat
    }

    #[tokio::test]
    async fn unknown_commands_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, MockChatClient::new());

        assert!(dispatcher.handle(&event("dance", "")).await.is_none());
    }

    #[tokio::test]
    async fn non_admins_are_denied_before_any_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let mut chat = MockChatClient::new();
        chat.expect_is_admin().returning(|_, _| Ok(false));
        let dispatcher = dispatcher_with(&dir, chat);

        let reply = dispatcher
            .handle(&event("grant", "<@200> 50"))
            .await
            .unwrap();

        assert_eq!(reply, permission_denial());
        // nothing was granted, so the data file was never written
        assert!(!dir.path().join("bot_data.json").exists());
    }

    #[tokio::test]
    async fn admin_gate_ignores_malformed_args_until_after_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut chat = MockChatClient::new();
        chat.expect_is_admin().returning(|_, _| Ok(false));
        let dispatcher = dispatcher_with(&dir, chat);

        // even with unparsable args, a non-admin sees the fixed denial
        let reply = dispatcher.handle(&event("grant", "garbage")).await.unwrap();
        assert_eq!(reply, permission_denial());
    }

    #[tokio::test]
    async fn dms_cannot_use_admin_commands() {
        let dir = tempfile::tempdir().unwrap();
        // is_admin must not even be called without a guild
        let dispatcher = dispatcher_with(&dir, MockChatClient::new());

        let mut ev = event("grant", "<@200> 50");
        ev.guild_id = None;
        let reply = dispatcher.handle(&ev).await.unwrap();
        assert_eq!(reply, permission_denial());
    }

    #[tokio::test]
    async fn balance_reports_zero_for_new_users() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, MockChatClient::new());

        let reply = dispatcher.handle(&event("balance", "")).await.unwrap();

        assert_eq!(reply.title, "💰 Your Balance");
        assert!(reply.body.contains("**0** tokens"));
    }

    #[tokio::test]
    async fn grant_buy_history_flow() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, admin_chat());

        dispatcher
            .handle(&event("add-item", "40 Sword | Sharp blade"))
            .await
            .unwrap();
        dispatcher.handle(&event("grant", "<@100> 100")).await.unwrap();

        let reply = dispatcher.handle(&event("buy", "1")).await.unwrap();
        assert_eq!(reply.title, "✅ Purchase Complete!");
        assert!(reply.body.contains("**Sword**"));

        let reply = dispatcher.handle(&event("balance", "")).await.unwrap();
        assert!(reply.body.contains("**60** tokens"));

        let reply = dispatcher.handle(&event("history", "")).await.unwrap();
        assert_eq!(reply.title, "📋 Your Purchase History");
        assert!(reply.body.contains("**Sword** — 40 tokens"));
    }

    #[tokio::test]
    async fn buy_with_too_few_tokens_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, admin_chat());

        dispatcher
            .handle(&event("add-item", "50 Sword | Sharp"))
            .await
            .unwrap();
        dispatcher.handle(&event("grant", "<@100> 30")).await.unwrap();

        let reply = dispatcher.handle(&event("buy", "1")).await.unwrap();
        assert_eq!(reply.title, "❌ Not Enough Tokens");
        assert!(reply.body.contains("50 tokens"));

        let reply = dispatcher.handle(&event("balance", "")).await.unwrap();
        assert!(reply.body.contains("**30** tokens"));
    }

    #[tokio::test]
    async fn buy_with_a_non_integer_argument_shows_usage() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, MockChatClient::new());

        let reply = dispatcher.handle(&event("buy", "sword")).await.unwrap();
        assert_eq!(reply.title, "❌ Wrong Format");
        assert!(reply.body.contains("!buy <item position>"));
    }

    #[tokio::test]
    async fn empty_shop_has_its_own_message() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, MockChatClient::new());

        let reply = dispatcher.handle(&event("shop", "")).await.unwrap();
        assert_eq!(reply.body, "The shop is empty!");
    }

    #[tokio::test]
    async fn add_item_without_separator_is_a_format_denial() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, admin_chat());

        let reply = dispatcher
            .handle(&event("add-item", "50 Sword no separator"))
            .await
            .unwrap();
        assert_eq!(reply.title, "❌ Wrong Format");

        let reply = dispatcher.handle(&event("shop", "")).await.unwrap();
        assert_eq!(reply.body, "The shop is empty!");
    }

    #[tokio::test]
    async fn revoke_past_balance_reports_the_current_balance() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, admin_chat());

        dispatcher.handle(&event("grant", "<@200> 20")).await.unwrap();

        let reply = dispatcher
            .handle(&event("revoke", "<@200> 25"))
            .await
            .unwrap();
        assert_eq!(reply.title, "❌ Not Enough Tokens");
        assert!(reply.body.contains("only has 20 tokens"));
    }

    #[tokio::test]
    async fn ranking_skips_users_that_fail_to_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let mut chat = MockChatClient::new();
        chat.expect_is_admin().returning(|_, _| Ok(true));
        chat.expect_display_name().returning(|user| {
            if user.as_str() == "100" {
                Ok("alice".to_string())
            } else {
                Err(anyhow::anyhow!("unknown user"))
            }
        });
        let dispatcher = dispatcher_with(&dir, chat);

        dispatcher.handle(&event("grant", "<@100> 30")).await.unwrap();
        dispatcher.handle(&event("grant", "<@200> 50")).await.unwrap();

        let reply = dispatcher.handle(&event("ranking", "")).await.unwrap();
        assert_eq!(reply.title, "🏆 Token Ranking");
        // user 200 holds first place but cannot be resolved
        assert_eq!(reply.body, "2. alice: 30 tokens");
    }

    #[tokio::test]
    async fn ranking_with_no_users_is_a_denial() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher_with(&dir, MockChatClient::new());

        let reply = dispatcher.handle(&event("ranking", "")).await.unwrap();
        assert_eq!(reply.body, "No users found!");
    }

    #[test]
    fn user_args_accept_ids_and_mentions() {
        assert_eq!(parse_user_arg("123456"), Some(UserId::new("123456")));
        assert_eq!(parse_user_arg("<@123456>"), Some(UserId::new("123456")));
        assert_eq!(parse_user_arg("<@!123456>"), Some(UserId::new("123456")));
        assert_eq!(parse_user_arg("<@abc>"), None);
        assert_eq!(parse_user_arg("alice"), None);
        assert_eq!(parse_user_arg(""), None);
    }

    #[test]
    fn user_amount_pairs_require_exactly_two_fields() {
        assert_eq!(
            parse_user_amount("<@1> 50"),
            Some((UserId::new("1"), 50))
        );
        assert_eq!(parse_user_amount("<@1> 50 extra"), None);
        assert_eq!(parse_user_amount("<@1>"), None);
        assert_eq!(parse_user_amount(""), None);
    }
}
