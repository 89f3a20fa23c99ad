//! Single-writer access to the economy store
//!
//! Commands arrive concurrently from the chat platform, but the data file
//! has no locking of its own: two overlapping load-modify-save cycles
//! would lose the earlier write. This module serializes every cycle
//! through one actor task that owns the [`Store`]:
//!
//! ```text
//! command handlers ──► EconomyHandle (Clone)
//!                            │
//!                            │ mpsc::channel (bounded)
//!                            ▼
//!                     EconomyActor (single task)
//!                     load → ledger op → save
//! ```
//!
//! Queries that only read skip the save; queries that lazily create an
//! account (balance) save exactly when they changed the document.

use crate::error::{Error, Result};
use crate::ledger;
use crate::store::Store;
use crate::types::{PurchaseRecord, ShopItem, UserId};
use chrono::Local;
use tokio::sync::{mpsc, oneshot};

/// Message sent to the economy actor
pub enum EconomyCommand {
    /// Current balance for a user, creating the account if missing
    Balance {
        /// Account owner
        user: UserId,
        /// Response channel
        response: oneshot::Sender<Result<i64>>,
    },

    /// 1-indexed catalog listing
    ListShop {
        /// Response channel
        response: oneshot::Sender<Result<Vec<(usize, ShopItem)>>>,
    },

    /// Buy an item by catalog position
    Purchase {
        /// Buyer
        user: UserId,
        /// Buyer display name recorded on the purchase
        display_name: String,
        /// 1-based catalog position
        position: usize,
        /// Response channel
        response: oneshot::Sender<Result<PurchaseRecord>>,
    },

    /// Full ranking, highest balance first
    Ranking {
        /// Response channel
        response: oneshot::Sender<Result<Vec<(UserId, i64)>>>,
    },

    /// Purchase history for a buyer display name
    History {
        /// Display name to filter by
        buyer: String,
        /// Response channel
        response: oneshot::Sender<Result<Vec<PurchaseRecord>>>,
    },

    /// Credit tokens to a user
    Grant {
        /// Target account
        user: UserId,
        /// Amount to add (unvalidated, may be negative)
        amount: i64,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Debit tokens from a user, refusing to go below zero
    Revoke {
        /// Target account
        user: UserId,
        /// Amount to subtract
        amount: i64,
        /// Response channel
        response: oneshot::Sender<Result<i64>>,
    },

    /// Append a catalog entry
    AddItem {
        /// Item name
        name: String,
        /// Price in tokens
        price: i64,
        /// Item description
        description: String,
        /// Response channel
        response: oneshot::Sender<Result<ShopItem>>,
    },
}

/// Actor that owns the store and processes economy commands one at a time
pub struct EconomyActor {
    /// Storage backend
    store: Store,

    /// Mailbox for incoming commands
    mailbox: mpsc::Receiver<EconomyCommand>,
}

impl EconomyActor {
    /// Create new actor
    pub fn new(store: Store, mailbox: mpsc::Receiver<EconomyCommand>) -> Self {
        Self { store, mailbox }
    }

    /// Run the actor event loop until every handle is dropped
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            self.handle_message(msg);
        }
        tracing::debug!("economy actor mailbox closed, shutting down");
    }

    /// Handle a single command: one load → operate → save cycle
    fn handle_message(&mut self, msg: EconomyCommand) {
        match msg {
            EconomyCommand::Balance { user, response } => {
                let _ = response.send(self.balance(&user));
            }
            EconomyCommand::ListShop { response } => {
                let result = self.store.load().map(|data| {
                    ledger::list_shop(&data)
                        .into_iter()
                        .map(|(position, item)| (position, item.clone()))
                        .collect()
                });
                let _ = response.send(result);
            }
            EconomyCommand::Purchase {
                user,
                display_name,
                position,
                response,
            } => {
                let _ = response.send(self.purchase(&user, &display_name, position));
            }
            EconomyCommand::Ranking { response } => {
                let result = self.store.load().map(|data| ledger::ranking(&data));
                let _ = response.send(result);
            }
            EconomyCommand::History { buyer, response } => {
                let result = self.store.load().map(|data| {
                    ledger::history(&data, &buyer)
                        .into_iter()
                        .cloned()
                        .collect()
                });
                let _ = response.send(result);
            }
            EconomyCommand::Grant {
                user,
                amount,
                response,
            } => {
                let _ = response.send(self.grant(&user, amount));
            }
            EconomyCommand::Revoke {
                user,
                amount,
                response,
            } => {
                let _ = response.send(self.revoke(&user, amount));
            }
            EconomyCommand::AddItem {
                name,
                price,
                description,
                response,
            } => {
                let _ = response.send(self.add_item(name, price, description));
            }
        }
    }

    fn balance(&mut self, user: &UserId) -> Result<i64> {
        let mut data = self.store.load()?;
        let created = !data.users.contains_key(user);
        let tokens = ledger::balance(&mut data, user);
        if created {
            self.store.save(&data)?;
        }
        Ok(tokens)
    }

    fn purchase(&mut self, user: &UserId, display_name: &str, position: usize) -> Result<PurchaseRecord> {
        let mut data = self.store.load()?;
        let record = ledger::purchase(&mut data, user, display_name, position, Local::now())?;
        self.store.save(&data)?;
        Ok(record)
    }

    fn grant(&mut self, user: &UserId, amount: i64) -> Result<()> {
        let mut data = self.store.load()?;
        ledger::grant(&mut data, user, amount);
        self.store.save(&data)?;
        Ok(())
    }

    fn revoke(&mut self, user: &UserId, amount: i64) -> Result<i64> {
        let mut data = self.store.load()?;
        let remaining = ledger::revoke(&mut data, user, amount)?;
        self.store.save(&data)?;
        Ok(remaining)
    }

    fn add_item(&mut self, name: String, price: i64, description: String) -> Result<ShopItem> {
        let mut data = self.store.load()?;
        ledger::add_item(&mut data, name, price, description);
        self.store.save(&data)?;
        Ok(data.items.last().cloned().expect("item was just appended"))
    }
}

/// Handle for sending commands to the actor
#[derive(Clone)]
pub struct EconomyHandle {
    sender: mpsc::Sender<EconomyCommand>,
}

impl EconomyHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<EconomyCommand>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: EconomyCommand,
        rx: oneshot::Receiver<Result<T>>,
    ) -> Result<T> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("actor mailbox closed".to_string()))?;
        rx.await
            .map_err(|_| Error::Concurrency("response channel closed".to_string()))?
    }

    /// Current balance for `user`, creating the account if missing
    pub async fn balance(&self, user: UserId) -> Result<i64> {
        let (tx, rx) = oneshot::channel();
        self.request(EconomyCommand::Balance { user, response: tx }, rx)
            .await
    }

    /// 1-indexed catalog listing in insertion order
    pub async fn list_shop(&self) -> Result<Vec<(usize, ShopItem)>> {
        let (tx, rx) = oneshot::channel();
        self.request(EconomyCommand::ListShop { response: tx }, rx)
            .await
    }

    /// Buy the item at `position` for `user`
    pub async fn purchase(
        &self,
        user: UserId,
        display_name: String,
        position: usize,
    ) -> Result<PurchaseRecord> {
        let (tx, rx) = oneshot::channel();
        self.request(
            EconomyCommand::Purchase {
                user,
                display_name,
                position,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Full ranking, highest balance first
    pub async fn ranking(&self) -> Result<Vec<(UserId, i64)>> {
        let (tx, rx) = oneshot::channel();
        self.request(EconomyCommand::Ranking { response: tx }, rx)
            .await
    }

    /// Purchases recorded under `buyer`, oldest first
    pub async fn history(&self, buyer: String) -> Result<Vec<PurchaseRecord>> {
        let (tx, rx) = oneshot::channel();
        self.request(EconomyCommand::History { buyer, response: tx }, rx)
            .await
    }

    /// Credit `amount` to `user`
    pub async fn grant(&self, user: UserId, amount: i64) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.request(
            EconomyCommand::Grant {
                user,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Debit `amount` from `user`; returns the remaining balance
    pub async fn revoke(&self, user: UserId, amount: i64) -> Result<i64> {
        let (tx, rx) = oneshot::channel();
        self.request(
            EconomyCommand::Revoke {
                user,
                amount,
                response: tx,
            },
            rx,
        )
        .await
    }

    /// Append a catalog entry; returns the stored item
    pub async fn add_item(
        &self,
        name: String,
        price: i64,
        description: String,
    ) -> Result<ShopItem> {
        let (tx, rx) = oneshot::channel();
        self.request(
            EconomyCommand::AddItem {
                name,
                price,
                description,
                response: tx,
            },
            rx,
        )
        .await
    }
}

/// Spawn the economy actor and return a handle to it
pub fn spawn_economy_actor(store: Store, mailbox_capacity: usize) -> EconomyHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity);
    let actor = EconomyActor::new(store, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    EconomyHandle::new(tx)
}
