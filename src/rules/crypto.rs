use std::str::FromStr;

use rust_decimal::Decimal;

use super::{Findings, RuleCode, RuleContext};
use crate::core::Invoice;
use crate::core::totals::within_tolerance;
use crate::crypto::QrPayload;

pub(super) fn signature(invoice: &Invoice, ctx: &RuleContext<'_>, out: &mut Findings) {
    if !ctx.config.check_signatures {
        return;
    }
    match invoice.signature.as_deref() {
        None => out.error(RuleCode::Signature, "signature", "cryptographic stamp is missing"),
        Some(sig) => {
            if let Err(reason) = ctx.verifier.verify(invoice, sig) {
                out.error(RuleCode::Signature, "signature", reason);
            }
        }
    }
}

pub(super) fn qr_code(invoice: &Invoice, ctx: &RuleContext<'_>, out: &mut Findings) {
    if !ctx.config.verify_qr {
        return;
    }
    let Some(encoded) = invoice.qr_code.as_deref() else {
        out.error(RuleCode::QrCode, "qr_code", "QR code is missing");
        return;
    };
    let payload = match QrPayload::decode(encoded) {
        Ok(p) => p,
        Err(e) => {
            out.error(RuleCode::QrCode, "qr_code", e.to_string());
            return;
        }
    };

    if payload.seller_name != invoice.seller.name {
        out.error(
            RuleCode::QrCode,
            "qr_code.seller_name",
            format!(
                "QR seller name '{}' does not match '{}'",
                payload.seller_name, invoice.seller.name
            ),
        );
    }
    if Some(payload.vat_number.as_str()) != invoice.seller.vat_number.as_deref() {
        out.error(
            RuleCode::QrCode,
            "qr_code.vat_number",
            format!("QR VAT number '{}' does not match the seller", payload.vat_number),
        );
    }
    let amounts = [
        ("qr_code.total", payload.total.as_str(), invoice.totals.total),
        ("qr_code.vat_total", payload.vat_total.as_str(), invoice.totals.tax_total),
    ];
    for (field, text, declared) in amounts {
        match Decimal::from_str(text) {
            Ok(amount) if within_tolerance(amount, declared, ctx.config.amount_tolerance) => {}
            Ok(amount) => out.error(
                RuleCode::QrCode,
                field,
                format!("QR amount {amount} does not match invoice amount {declared}"),
            ),
            Err(_) => out.error(
                RuleCode::QrCode,
                field,
                format!("QR amount '{text}' is not a number"),
            ),
        }
    }
}
