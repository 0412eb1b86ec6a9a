//! NicePay merchant token
//!
//! `hex(sha256(merchantKey + merchantOrderId + amount + merchantTokenKey))`,
//! with an empty amount for status and cancel lookups.

use sha2::{Digest, Sha256};

pub fn merchant_token(
    merchant_key: &str,
    merchant_order_id: &str,
    amount: Option<i64>,
    merchant_token_key: &str,
) -> String {
    let amount = amount.map(|a| a.to_string()).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(merchant_key.as_bytes());
    hasher.update(merchant_order_id.as_bytes());
    hasher.update(amount.as_bytes());
    hasher.update(merchant_token_key.as_bytes());
    hex::encode(hasher.finalize())
}
