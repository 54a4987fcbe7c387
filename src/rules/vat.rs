//! Saudi VAT registration number format.

use std::fmt;

use super::{Findings, RuleCode, RuleContext};
use crate::core::{Invoice, InvoiceSubtype};

/// Error returned when a VAT registration number fails format validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VatFormatError {
    /// The invalid input value.
    pub value: String,
    /// Why the value failed validation.
    pub reason: String,
}

impl fmt::Display for VatFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid VAT number '{}': {}", self.value, self.reason)
    }
}

impl std::error::Error for VatFormatError {}

/// Validate a VAT registration number: 15 ASCII digits, first and last `3`.
///
/// No trimming is applied; surrounding whitespace is a format error.
pub fn validate_vat_number(vat: &str) -> Result<(), VatFormatError> {
    let fail = |reason: &str| {
        Err(VatFormatError {
            value: vat.into(),
            reason: reason.into(),
        })
    };
    if vat.len() != 15 {
        return fail("must be exactly 15 digits");
    }
    if !vat.bytes().all(|b| b.is_ascii_digit()) {
        return fail("must contain digits only");
    }
    if !vat.starts_with('3') {
        return fail("must start with 3");
    }
    if !vat.ends_with('3') {
        return fail("must end with 3");
    }
    Ok(())
}

pub(super) fn seller_vat(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    match invoice.seller.vat_number.as_deref() {
        None => out.error(RuleCode::SellerVat, "seller.vat_number", "seller VAT number is required"),
        Some(vat) => {
            if let Err(e) = validate_vat_number(vat) {
                out.error(RuleCode::SellerVat, "seller.vat_number", e.to_string());
            }
        }
    }
}

pub(super) fn buyer_vat(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    match invoice.buyer.vat_number.as_deref() {
        None if invoice.subtype == InvoiceSubtype::Standard => out.error(
            RuleCode::BuyerVat,
            "buyer.vat_number",
            "buyer VAT number is required for standard tax invoices",
        ),
        None => {}
        Some(vat) => {
            if let Err(e) = validate_vat_number(vat) {
                out.error(RuleCode::BuyerVat, "buyer.vat_number", e.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_vat() {
        assert!(validate_vat_number("300000000000003").is_ok());
        assert!(validate_vat_number("310122393500003").is_ok());
    }

    #[test]
    fn wrong_last_digit() {
        let err = validate_vat_number("300000000000001").unwrap_err();
        assert_eq!(err.reason, "must end with 3");
    }

    #[test]
    fn wrong_first_digit() {
        assert!(validate_vat_number("100000000000003").is_err());
    }

    #[test]
    fn wrong_length() {
        assert!(validate_vat_number("30000000000003").is_err());
        assert!(validate_vat_number("3000000000000003").is_err());
        assert!(validate_vat_number("").is_err());
    }

    #[test]
    fn non_digits_rejected() {
        assert!(validate_vat_number("3000000000A0003").is_err());
        assert!(validate_vat_number(" 30000000000003").is_err());
        // Arabic-Indic digits are not ASCII digits.
        assert!(validate_vat_number("٣00000000000003").is_err());
    }
}
