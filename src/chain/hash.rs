use sha2::{Digest, Sha256};

use crate::core::Invoice;
use crate::core::totals::format_amount;

/// Length of a hex-encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Canonical invoice hash: lowercase hex SHA-256 of
/// `number|issue_date|total`, with the total rendered by
/// [`format_amount`] and a missing date rendered empty.
pub fn invoice_hash(invoice: &Invoice) -> String {
    let date = invoice
        .issue_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();
    let input = format!(
        "{}|{}|{}",
        invoice.number,
        date,
        format_amount(invoice.totals.total)
    );
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Whether `value` has the shape of a hex SHA-256 digest (either case).
pub fn is_hash_shaped(value: &str) -> bool {
    value.len() == HASH_HEX_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}
