//! JSON invoice documents.
//!
//! The serde shape of [`Invoice`]: amounts are decimal strings, dates ISO
//! 8601, the type code a number.

use crate::core::{FatooraError, Invoice};

/// Parse a JSON invoice. A blank PIH, QR code or stamp counts as absent.
pub fn from_json(json: &str) -> Result<Invoice, FatooraError> {
    let mut invoice: Invoice =
        serde_json::from_str(json).map_err(|e| FatooraError::Parse(format!("invalid JSON invoice: {e}")))?;
    for field in [
        &mut invoice.previous_invoice_hash,
        &mut invoice.qr_code,
        &mut invoice.signature,
    ] {
        if field.as_deref().is_some_and(|v| v.trim().is_empty()) {
            *field = None;
        }
    }
    Ok(invoice)
}

/// Serialize an invoice as pretty-printed JSON.
pub fn to_json(invoice: &Invoice) -> Result<String, FatooraError> {
    serde_json::to_string_pretty(invoice).map_err(|e| FatooraError::Json(e.to_string()))
}
