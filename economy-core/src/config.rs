//! Configuration for the economy core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Economy core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the persisted economy document
    pub data_file: PathBuf,

    /// Actor mailbox capacity (pending commands before senders wait)
    pub mailbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("bot_data.json"),
            mailbox_capacity: 64,
        }
    }
}
