use super::{Findings, RuleCode, RuleContext};
use crate::core::Invoice;
use crate::core::totals::within_tolerance;

pub(super) fn line_totals(invoice: &Invoice, ctx: &RuleContext<'_>, out: &mut Findings) {
    for (i, line) in invoice.lines.iter().enumerate() {
        let Some(expected) = line.computed_total() else {
            out.error(
                RuleCode::LineTotal,
                format!("lines[{i}].line_total"),
                "computed line total overflows the decimal range",
            );
            continue;
        };
        if !within_tolerance(line.line_total, expected, ctx.config.amount_tolerance) {
            out.error(
                RuleCode::LineTotal,
                format!("lines[{i}].line_total"),
                format!(
                    "line total {} does not match computed {}",
                    line.line_total,
                    expected.round_dp(2)
                ),
            );
        }
    }
}

pub(super) fn subtotal(invoice: &Invoice, ctx: &RuleContext<'_>, out: &mut Findings) {
    let Some(expected) = invoice.computed_subtotal() else {
        out.error(
            RuleCode::Subtotal,
            "totals.subtotal",
            "sum of lines overflows the decimal range",
        );
        return;
    };
    if !within_tolerance(invoice.totals.subtotal, expected, ctx.config.amount_tolerance) {
        out.error(
            RuleCode::Subtotal,
            "totals.subtotal",
            format!(
                "subtotal {} does not match sum of lines {}",
                invoice.totals.subtotal,
                expected.round_dp(2)
            ),
        );
    }
}

pub(super) fn tax_total(invoice: &Invoice, ctx: &RuleContext<'_>, out: &mut Findings) {
    let Some(expected) = invoice.computed_tax() else {
        out.error(
            RuleCode::TaxTotal,
            "totals.tax_total",
            "sum of line VAT overflows the decimal range",
        );
        return;
    };
    if !within_tolerance(invoice.totals.tax_total, expected, ctx.config.amount_tolerance) {
        out.error(
            RuleCode::TaxTotal,
            "totals.tax_total",
            format!(
                "VAT total {} does not match sum of line VAT {}",
                invoice.totals.tax_total,
                expected.round_dp(2)
            ),
        );
    }
}

pub(super) fn grand_total(invoice: &Invoice, ctx: &RuleContext<'_>, out: &mut Findings) {
    let totals = &invoice.totals;
    let matches = totals
        .subtotal
        .checked_add(totals.tax_total)
        .is_some_and(|expected| within_tolerance(totals.total, expected, ctx.config.amount_tolerance));
    if !matches {
        out.error(
            RuleCode::GrandTotal,
            "totals.total",
            format!(
                "total {} does not equal subtotal {} + VAT {}",
                totals.total, totals.subtotal, totals.tax_total
            ),
        );
    }
}
