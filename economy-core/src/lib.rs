//! Tokenshop Economy Core
//!
//! Domain logic and persistence for a chat-platform token economy:
//! per-user balances, a shop catalog, and an append-only purchase ledger,
//! all held in a single JSON document.
//!
//! # Architecture
//!
//! - **Document**: the whole application state, loaded fresh and rewritten
//!   wholesale on every mutating command
//! - **Single Writer**: one actor task owns the store, so overlapping
//!   commands cannot interleave their read-modify-write cycles
//! - **Pure Ledger**: domain operations never perform I/O
//!
//! # Invariants
//!
//! - Balances never go below zero at rest: debits are pre-checked
//! - Purchase records are append-only, never modified or deleted
//! - The persisted field names match the legacy data file exactly

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod store;
pub mod types;

// Re-exports
pub use actor::{spawn_economy_actor, EconomyHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use store::Store;
pub use types::{EconomyData, PurchaseRecord, ShopItem, UserAccount, UserId};
