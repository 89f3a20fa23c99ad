//! Pure domain operations over the economy document
//!
//! Every operation takes the already-loaded document and its identifying
//! arguments; none performs I/O. Persistence and write serialization live
//! one level up, in [`crate::actor`].

use crate::error::{Error, Result};
use crate::types::{EconomyData, PurchaseRecord, ShopItem, UserId};
use chrono::{DateTime, Local};

/// Current balance for `user`
///
/// Creates the account with zero tokens on first sight, so even this
/// query can dirty the document.
pub fn balance(data: &mut EconomyData, user: &UserId) -> i64 {
    data.account_mut(user).tokens
}

/// 1-indexed catalog listing in insertion order
pub fn list_shop(data: &EconomyData) -> Vec<(usize, &ShopItem)> {
    data.items
        .iter()
        .enumerate()
        .map(|(i, item)| (i + 1, item))
        .collect()
}

/// Buy the item at `position`, debiting its price from `user`
///
/// Creates the account if missing, then fails with [`Error::InvalidItem`]
/// for a position outside `[1, catalog length]` and with
/// [`Error::InsufficientFunds`] when the balance does not cover the
/// price. On success the balance drops by exactly the price and one
/// record is appended to the purchase ledger.
pub fn purchase(
    data: &mut EconomyData,
    user: &UserId,
    display_name: &str,
    position: usize,
    now: DateTime<Local>,
) -> Result<PurchaseRecord> {
    data.account_mut(user);

    let item = match position.checked_sub(1).and_then(|i| data.items.get(i)) {
        Some(item) => item.clone(),
        None => return Err(Error::InvalidItem(position)),
    };

    let account = data.account_mut(user);
    if account.tokens < item.price {
        return Err(Error::InsufficientFunds {
            required: item.price,
        });
    }
    account.tokens -= item.price;

    let record = PurchaseRecord::new(display_name, item.name, item.price, now);
    data.purchases.push(record.clone());
    Ok(record)
}

/// Full ranking, highest balance first
///
/// The sort is stable: equal balances keep the mapping's key order.
pub fn ranking(data: &EconomyData) -> Vec<(UserId, i64)> {
    let mut rows: Vec<(UserId, i64)> = data
        .users
        .iter()
        .map(|(id, account)| (id.clone(), account.tokens))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows
}

/// Purchases whose buyer name matches `buyer` exactly, oldest first
pub fn history<'a>(data: &'a EconomyData, buyer: &str) -> Vec<&'a PurchaseRecord> {
    data.purchases.iter().filter(|p| p.buyer == buyer).collect()
}

/// Credit `amount` to `user`, creating the account if missing
///
/// The amount is not validated: a negative grant is an administrator
/// adjustment that bypasses the revoke floor.
pub fn grant(data: &mut EconomyData, user: &UserId, amount: i64) {
    data.account_mut(user).tokens += amount;
}

/// Debit `amount` from `user`, refusing to go below zero
///
/// Creates the account if missing. Returns the remaining balance, or
/// [`Error::InsufficientBalance`] carrying the untouched balance.
pub fn revoke(data: &mut EconomyData, user: &UserId, amount: i64) -> Result<i64> {
    let account = data.account_mut(user);
    if account.tokens < amount {
        return Err(Error::InsufficientBalance {
            available: account.tokens,
        });
    }
    account.tokens -= amount;
    Ok(account.tokens)
}

/// Append a catalog entry
///
/// No validation on price sign or duplicate names; the catalog is
/// append-only from this system's point of view.
pub fn add_item(
    data: &mut EconomyData,
    name: impl Into<String>,
    price: i64,
    description: impl Into<String>,
) {
    data.items.push(ShopItem {
        name: name.into(),
        price,
        description: description.into(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 2, 1, 13, 37, 0).unwrap()
    }

    #[test]
    fn balance_creates_unseen_account_at_zero() {
        let mut data = EconomyData::default();
        let user = UserId::new("42");

        assert_eq!(balance(&mut data, &user), 0);
        assert_eq!(data.users.get(&user).unwrap().tokens, 0);
    }

    #[test]
    fn purchase_debits_and_records() {
        let mut data = EconomyData::default();
        let user = UserId::new("1");
        data.account_mut(&user).tokens = 100;
        add_item(&mut data, "Sword", 40, "Sharp");

        let record = purchase(&mut data, &user, "alice", 1, fixed_now()).unwrap();

        assert_eq!(data.users.get(&user).unwrap().tokens, 60);
        assert_eq!(data.purchases.len(), 1);
        assert_eq!(record.item_name, "Sword");
        assert_eq!(record.price, 40);
        assert_eq!(record.buyer, "alice");
        assert_eq!(record.timestamp, "01/02/2025 13:37");
    }

    #[test]
    fn purchase_refuses_when_broke() {
        let mut data = EconomyData::default();
        let user = UserId::new("1");
        data.account_mut(&user).tokens = 30;
        add_item(&mut data, "Sword", 50, "Sharp");

        let err = purchase(&mut data, &user, "alice", 1, fixed_now()).unwrap_err();

        assert!(matches!(err, Error::InsufficientFunds { required: 50 }));
        assert_eq!(data.users.get(&user).unwrap().tokens, 30);
        assert!(data.purchases.is_empty());
    }

    #[test]
    fn purchase_rejects_positions_outside_the_catalog() {
        let mut data = EconomyData::default();
        let user = UserId::new("1");
        add_item(&mut data, "Sword", 50, "Sharp");

        assert!(matches!(
            purchase(&mut data, &user, "alice", 0, fixed_now()),
            Err(Error::InvalidItem(0))
        ));
        assert!(matches!(
            purchase(&mut data, &user, "alice", 2, fixed_now()),
            Err(Error::InvalidItem(2))
        ));
        assert!(data.purchases.is_empty());
    }

    #[test]
    fn ranking_sorts_descending_with_stable_ties() {
        let mut data = EconomyData::default();
        grant(&mut data, &UserId::new("a"), 10);
        grant(&mut data, &UserId::new("b"), 30);
        grant(&mut data, &UserId::new("c"), 10);

        let rows = ranking(&data);

        assert_eq!(
            rows,
            vec![
                (UserId::new("b"), 30),
                // tie: mapping order ("a" before "c") is preserved
                (UserId::new("a"), 10),
                (UserId::new("c"), 10),
            ]
        );
    }

    #[test]
    fn history_filters_by_exact_buyer_name_in_order() {
        let mut data = EconomyData::default();
        let user = UserId::new("1");
        data.account_mut(&user).tokens = 100;
        add_item(&mut data, "Sword", 10, "Sharp");
        add_item(&mut data, "Shield", 20, "Sturdy");

        purchase(&mut data, &user, "alice", 1, fixed_now()).unwrap();
        purchase(&mut data, &user, "bob", 2, fixed_now()).unwrap();
        purchase(&mut data, &user, "alice", 2, fixed_now()).unwrap();

        let records = history(&data, "alice");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_name, "Sword");
        assert_eq!(records[1].item_name, "Shield");
        assert!(history(&data, "ALICE").is_empty());
    }

    #[test]
    fn revoke_refuses_past_the_balance() {
        let mut data = EconomyData::default();
        let user = UserId::new("1");
        grant(&mut data, &user, 20);

        let err = revoke(&mut data, &user, 25).unwrap_err();

        assert!(matches!(err, Error::InsufficientBalance { available: 20 }));
        assert_eq!(data.users.get(&user).unwrap().tokens, 20);
    }

    #[test]
    fn grant_accepts_negative_amounts() {
        let mut data = EconomyData::default();
        let user = UserId::new("1");
        grant(&mut data, &user, 20);
        grant(&mut data, &user, -5);

        assert_eq!(data.users.get(&user).unwrap().tokens, 15);
    }
}
