use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::totals::checked_sum;

/// A ZATCA e-invoice, the top-level document.
///
/// Built once per parsed file and read-only afterwards. Fields that a rule
/// must be able to report as missing (issue date, VAT numbers, PIH, QR,
/// stamp) are optional at the type level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    /// Invoice number (unique within its series).
    pub number: String,
    /// Issue date.
    pub issue_date: Option<NaiveDate>,
    /// Issue time.
    #[serde(default)]
    pub issue_time: Option<NaiveTime>,
    /// Invoice type code (UNTDID 1001 subset: 388, 381, 383).
    pub type_code: InvoiceTypeCode,
    /// Standard (B2B) or simplified (B2C) transaction.
    #[serde(default)]
    pub subtype: InvoiceSubtype,
    /// Invoice currency code (ISO 4217, e.g. "SAR").
    pub currency_code: String,
    /// Chain lineage this invoice belongs to.
    pub series_id: String,
    /// Seller.
    pub seller: Party,
    /// Buyer.
    pub buyer: Party,
    /// Invoice lines, in document order.
    #[serde(default)]
    pub lines: Vec<LineItem>,
    /// Declared document totals.
    pub totals: Totals,
    /// PIH: hash of the previous invoice in the series (absent for the first).
    #[serde(default)]
    pub previous_invoice_hash: Option<String>,
    /// Base64 TLV QR payload.
    #[serde(default)]
    pub qr_code: Option<String>,
    /// Cryptographic stamp (signature value).
    #[serde(default)]
    pub signature: Option<String>,
}

impl Invoice {
    /// Identifier used in results and logs.
    pub fn id(&self) -> &str {
        &self.number
    }

    /// Sum of line net amounts (after line discounts), `None` on overflow.
    pub fn computed_subtotal(&self) -> Option<Decimal> {
        checked_sum(self.lines.iter().map(LineItem::net_amount))
    }

    /// Sum of line VAT amounts, `None` on overflow.
    pub fn computed_tax(&self) -> Option<Decimal> {
        checked_sum(self.lines.iter().map(LineItem::tax_amount))
    }
}

/// Seller or buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// Registration name.
    pub name: String,
    /// VAT registration number (15 digits, `3…3`).
    #[serde(default)]
    pub vat_number: Option<String>,
    /// Postal address.
    pub address: Address,
}

/// Postal address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub building_number: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2.
    pub country_code: String,
}

/// Invoice line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line identifier.
    pub id: String,
    /// Item name / description.
    pub description: String,
    /// Invoiced quantity.
    pub quantity: Decimal,
    /// Net price per unit.
    pub unit_price: Decimal,
    /// VAT rate in percent (e.g. 15).
    pub tax_rate: Decimal,
    /// Line-level discount amount.
    #[serde(default)]
    pub discount: Decimal,
    /// Declared line total including VAT.
    pub line_total: Decimal,
}

/// Amounts outside the range of [`Decimal`] yield `None` rather than
/// panicking, so a hostile file becomes a finding instead of a crash.
impl LineItem {
    /// quantity × unit price − discount.
    pub fn net_amount(&self) -> Option<Decimal> {
        self.quantity
            .checked_mul(self.unit_price)?
            .checked_sub(self.discount)
    }

    /// VAT on the net amount.
    pub fn tax_amount(&self) -> Option<Decimal> {
        self.net_amount()?
            .checked_mul(self.tax_rate)?
            .checked_div(Decimal::ONE_HUNDRED)
    }

    /// Line total the declared one must match: net × (1 + rate).
    pub fn computed_total(&self) -> Option<Decimal> {
        self.net_amount()?.checked_add(self.tax_amount()?)
    }
}

/// Declared document totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Tax-exclusive amount.
    pub subtotal: Decimal,
    /// Total VAT amount.
    pub tax_total: Decimal,
    /// Tax-inclusive amount.
    pub total: Decimal,
}

/// UNTDID 1001 invoice type codes accepted by ZATCA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub enum InvoiceTypeCode {
    /// 388: tax invoice.
    Standard,
    /// 381: credit note.
    CreditNote,
    /// 383: debit note.
    DebitNote,
    /// Any other code value (reported by rule STR-002).
    Other(u16),
}

impl InvoiceTypeCode {
    /// UNTDID 1001 numeric code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Standard => 388,
            Self::CreditNote => 381,
            Self::DebitNote => 383,
            Self::Other(c) => *c,
        }
    }

    /// Parse from UNTDID 1001 numeric code.
    pub fn from_code(code: u16) -> Self {
        match code {
            388 => Self::Standard,
            381 => Self::CreditNote,
            383 => Self::DebitNote,
            c => Self::Other(c),
        }
    }

    /// Whether ZATCA accepts this code.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<u16> for InvoiceTypeCode {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

impl From<InvoiceTypeCode> for u16 {
    fn from(code: InvoiceTypeCode) -> Self {
        code.code()
    }
}

/// Transaction subtype carried in the `name` attribute of the type code
/// (`0100000` standard, `0200000` simplified).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceSubtype {
    /// B2B tax invoice; the buyer VAT number is required.
    #[default]
    Standard,
    /// B2C simplified invoice.
    Simplified,
}

impl InvoiceSubtype {
    /// Derive from the seven-character ZATCA transaction code.
    pub fn from_transaction_code(code: &str) -> Option<Self> {
        match code.get(..2) {
            Some("01") => Some(Self::Standard),
            Some("02") => Some(Self::Simplified),
            _ => None,
        }
    }

    /// Seven-character transaction code without optional flags.
    pub fn transaction_code(&self) -> &'static str {
        match self {
            Self::Standard => "0100000",
            Self::Simplified => "0200000",
        }
    }
}
