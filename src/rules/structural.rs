use chrono::Duration;

use super::{Findings, RuleCode, RuleContext};
use crate::core::Invoice;

pub(super) fn mandatory_fields(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    let required = [
        ("number", invoice.number.as_str()),
        ("series_id", invoice.series_id.as_str()),
        ("currency_code", invoice.currency_code.as_str()),
        ("seller.name", invoice.seller.name.as_str()),
        ("buyer.name", invoice.buyer.name.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            out.error(RuleCode::MandatoryFields, field, format!("{field} is required"));
        }
    }
}

pub(super) fn type_code(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    if !invoice.type_code.is_supported() {
        out.error(
            RuleCode::InvoiceTypeCode,
            "type_code",
            format!(
                "invoice type code {} is not one of 388, 381, 383",
                invoice.type_code.code()
            ),
        );
    }
}

pub(super) fn issue_date_present(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    if invoice.issue_date.is_none() {
        out.error(RuleCode::IssueDatePresent, "issue_date", "issue date is required");
    }
}

/// Skipped when the date is missing; STR-003 already reports that.
pub(super) fn issue_date_window(invoice: &Invoice, ctx: &RuleContext<'_>, out: &mut Findings) {
    let Some(date) = invoice.issue_date else {
        return;
    };
    // A skew past the calendar's end leaves no upper bound.
    let latest = Duration::try_days(ctx.config.future_skew_days)
        .and_then(|skew| ctx.today.checked_add_signed(skew));
    if latest.is_some_and(|latest| date > latest) {
        out.error(
            RuleCode::IssueDateWindow,
            "issue_date",
            format!("issue date {date} is in the future (today is {})", ctx.today),
        );
        return;
    }
    let age = (ctx.today - date).num_days();
    if age > ctx.config.max_age_days {
        out.warn(
            RuleCode::IssueDateWindow,
            "issue_date",
            format!(
                "issue date {date} is {age} days old (limit {})",
                ctx.config.max_age_days
            ),
        );
    }
}

pub(super) fn lines_present(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    if invoice.lines.is_empty() {
        out.error(RuleCode::LinesPresent, "lines", "at least one invoice line is required");
    }
}
