//! Core types for the economy document
//!
//! Every record serializes with the exact field names of the legacy data
//! file, so existing deployments keep their state across the rewrite.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Display format of purchase timestamps in the data file
pub const PURCHASE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Chat-platform user identifier (string form of the platform's numeric id)
///
/// Externally supplied and stable; never generated by this system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user account state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Token balance; never negative at rest
    pub tokens: i64,
}

/// Catalog entry, referenced externally by its 1-based position
///
/// The position is not a stable id: removing or reordering entries changes
/// every reference after the edit point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    /// Item name
    #[serde(rename = "nome")]
    pub name: String,

    /// Price in tokens
    #[serde(rename = "preco")]
    pub price: i64,

    /// Item description
    #[serde(rename = "descricao")]
    pub description: String,
}

/// Append-only purchase record
///
/// Keyed by the buyer's display name at purchase time, not the user id;
/// a later rename orphans the record for history lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Buyer display name at purchase time
    #[serde(rename = "usuario")]
    pub buyer: String,

    /// Name of the purchased item
    #[serde(rename = "item")]
    pub item_name: String,

    /// Price paid in tokens
    #[serde(rename = "preco")]
    pub price: i64,

    /// Purchase timestamp, formatted `DD/MM/YYYY HH:MM`
    #[serde(rename = "data")]
    pub timestamp: String,
}

impl PurchaseRecord {
    /// Build a record stamped in the data file's display format
    pub fn new(
        buyer: impl Into<String>,
        item_name: impl Into<String>,
        price: i64,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            buyer: buyer.into(),
            item_name: item_name.into(),
            price,
            timestamp: at.format(PURCHASE_TIME_FORMAT).to_string(),
        }
    }
}

/// The persisted document: the entire application state
///
/// Always loaded fresh, mutated, and written back wholesale. The users
/// mapping is a `BTreeMap`, so iteration order (and with it ranking
/// tie-breaks) is lexicographic by user id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyData {
    /// Account state per user id
    #[serde(default)]
    pub users: BTreeMap<UserId, UserAccount>,

    /// Shop catalog in insertion order
    #[serde(default)]
    pub items: Vec<ShopItem>,

    /// Purchase ledger in chronological order
    #[serde(default)]
    pub purchases: Vec<PurchaseRecord>,
}

impl EconomyData {
    /// Account for `user`, created with zero tokens on first reference
    pub fn account_mut(&mut self, user: &UserId) -> &mut UserAccount {
        self.users.entry(user.clone()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_field_names_match_the_legacy_layout() {
        let mut data = EconomyData::default();
        data.account_mut(&UserId::new("42")).tokens = 7;
        data.items.push(ShopItem {
            name: "Sword".to_string(),
            price: 50,
            description: "Sharp".to_string(),
        });
        data.purchases.push(PurchaseRecord {
            buyer: "alice".to_string(),
            item_name: "Sword".to_string(),
            price: 50,
            timestamp: "01/02/2025 13:37".to_string(),
        });

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["users"]["42"]["tokens"], 7);
        assert_eq!(value["items"][0]["nome"], "Sword");
        assert_eq!(value["items"][0]["preco"], 50);
        assert_eq!(value["items"][0]["descricao"], "Sharp");
        assert_eq!(value["purchases"][0]["usuario"], "alice");
        assert_eq!(value["purchases"][0]["item"], "Sword");
        assert_eq!(value["purchases"][0]["preco"], 50);
        assert_eq!(value["purchases"][0]["data"], "01/02/2025 13:37");
    }

    #[test]
    fn missing_top_level_keys_default_to_empty() {
        let data: EconomyData = serde_json::from_str("{}").unwrap();
        assert!(data.users.is_empty());
        assert!(data.items.is_empty());
        assert!(data.purchases.is_empty());
    }
}
