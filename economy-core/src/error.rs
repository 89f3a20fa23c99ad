//! Error types for the economy core

use thiserror::Error;

/// Result type for economy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Economy errors
#[derive(Error, Debug)]
pub enum Error {
    /// Data file exists but does not parse as an economy document
    #[error("Malformed data file: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Item position outside `[1, catalog length]`
    #[error("Invalid item position: {0}")]
    InvalidItem(usize),

    /// Buyer cannot afford the item
    #[error("Insufficient funds: {required} tokens required")]
    InsufficientFunds {
        /// Price of the item the buyer could not afford
        required: i64,
    },

    /// Revocation larger than the current balance
    #[error("Insufficient balance: only {available} tokens available")]
    InsufficientBalance {
        /// Balance at the time of the refused revocation
        available: i64,
    },

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
