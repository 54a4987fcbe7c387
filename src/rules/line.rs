use rust_decimal::Decimal;

use super::{Findings, RuleCode, RuleContext};
use crate::core::Invoice;

pub(super) fn quantity(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    for (i, line) in invoice.lines.iter().enumerate() {
        if line.quantity <= Decimal::ZERO {
            out.error(
                RuleCode::LineQuantity,
                format!("lines[{i}].quantity"),
                format!("quantity must be positive, got {}", line.quantity),
            );
        }
    }
}

pub(super) fn unit_price(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    for (i, line) in invoice.lines.iter().enumerate() {
        if line.unit_price < Decimal::ZERO {
            out.error(
                RuleCode::LineUnitPrice,
                format!("lines[{i}].unit_price"),
                format!("unit price must not be negative, got {}", line.unit_price),
            );
        }
    }
}

pub(super) fn tax_rate(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    for (i, line) in invoice.lines.iter().enumerate() {
        if !(line.tax_rate.is_zero() || line.tax_rate == Decimal::from(15)) {
            out.warn(
                RuleCode::LineTaxRate,
                format!("lines[{i}].tax_rate"),
                format!("VAT rate {}% is neither 0% nor 15%", line.tax_rate),
            );
        }
    }
}
