//! ZATCA QR payload: base64 of a tag-length-value byte sequence.
//!
//! Phase-one tags, each value UTF-8 with a one-byte length:
//!
//! | Tag | Value |
//! |-----|-------|
//! | 1 | seller name |
//! | 2 | seller VAT number |
//! | 3 | invoice timestamp (ISO 8601) |
//! | 4 | invoice total including VAT |
//! | 5 | VAT total |
//!
//! Unknown tags (phase-two stamp material, tags 6 and up) are skipped on
//! decode.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use crate::core::Invoice;
use crate::core::totals::format_amount;

pub const TAG_SELLER_NAME: u8 = 1;
pub const TAG_VAT_NUMBER: u8 = 2;
pub const TAG_TIMESTAMP: u8 = 3;
pub const TAG_TOTAL: u8 = 4;
pub const TAG_VAT_TOTAL: u8 = 5;

/// Why a QR payload could not be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QrError {
    #[error("QR code is not valid base64: {0}")]
    Base64(String),
    #[error("QR TLV truncated at byte {0}")]
    Truncated(usize),
    #[error("QR tag {0} is not valid UTF-8")]
    Utf8(u8),
    #[error("QR tag {0} is missing")]
    MissingTag(u8),
    #[error("QR tag {tag} value is {len} bytes, limit is 255")]
    ValueTooLong { tag: u8, len: usize },
}

/// The five phase-one fields of a QR code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrPayload {
    pub seller_name: String,
    pub vat_number: String,
    pub timestamp: String,
    pub total: String,
    pub vat_total: String,
}

impl QrPayload {
    /// Fields as they should appear for `invoice`.
    pub fn for_invoice(invoice: &Invoice) -> Self {
        let timestamp = match (invoice.issue_date, invoice.issue_time) {
            (Some(date), Some(time)) => format!("{date}T{time}"),
            (Some(date), None) => date.to_string(),
            (None, _) => String::new(),
        };
        Self {
            seller_name: invoice.seller.name.clone(),
            vat_number: invoice.seller.vat_number.clone().unwrap_or_default(),
            timestamp,
            total: format_amount(invoice.totals.total),
            vat_total: format_amount(invoice.totals.tax_total),
        }
    }

    /// Base64 TLV encoding.
    pub fn encode(&self) -> Result<String, QrError> {
        let bytes = encode_tlv(&[
            (TAG_SELLER_NAME, self.seller_name.as_str()),
            (TAG_VAT_NUMBER, self.vat_number.as_str()),
            (TAG_TIMESTAMP, self.timestamp.as_str()),
            (TAG_TOTAL, self.total.as_str()),
            (TAG_VAT_TOTAL, self.vat_total.as_str()),
        ])?;
        Ok(STANDARD.encode(bytes))
    }

    /// Decode a base64 TLV payload; all five tags must be present.
    pub fn decode(encoded: &str) -> Result<Self, QrError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| QrError::Base64(e.to_string()))?;
        let fields = decode_tlv(&bytes)?;
        let take = |tag: u8| {
            fields
                .iter()
                .find(|(t, _)| *t == tag)
                .map(|(_, v)| v.clone())
                .ok_or(QrError::MissingTag(tag))
        };
        Ok(Self {
            seller_name: take(TAG_SELLER_NAME)?,
            vat_number: take(TAG_VAT_NUMBER)?,
            timestamp: take(TAG_TIMESTAMP)?,
            total: take(TAG_TOTAL)?,
            vat_total: take(TAG_VAT_TOTAL)?,
        })
    }
}

/// Encode the QR code an invoice should carry.
pub fn encode_for(invoice: &Invoice) -> Result<String, QrError> {
    QrPayload::for_invoice(invoice).encode()
}

/// Raw TLV bytes for `(tag, value)` pairs.
pub fn encode_tlv(fields: &[(u8, &str)]) -> Result<Vec<u8>, QrError> {
    let mut out = Vec::new();
    for &(tag, value) in fields {
        let len = u8::try_from(value.len())
            .map_err(|_| QrError::ValueTooLong { tag, len: value.len() })?;
        out.push(tag);
        out.push(len);
        out.extend_from_slice(value.as_bytes());
    }
    Ok(out)
}

/// Split TLV bytes into `(tag, value)` pairs in encounter order.
pub fn decode_tlv(bytes: &[u8]) -> Result<Vec<(u8, String)>, QrError> {
    let mut fields = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if pos + 2 > bytes.len() {
            return Err(QrError::Truncated(pos));
        }
        let tag = bytes[pos];
        let len = usize::from(bytes[pos + 1]);
        let start = pos + 2;
        let end = start + len;
        if end > bytes.len() {
            return Err(QrError::Truncated(pos));
        }
        if tag <= TAG_VAT_TOTAL {
            let value =
                std::str::from_utf8(&bytes[start..end]).map_err(|_| QrError::Utf8(tag))?;
            fields.push((tag, value.to_string()));
        }
        pos = end;
    }
    Ok(fields)
}
