use super::{Findings, RuleCode, RuleContext};
use crate::chain::{ChainState, is_hash_shaped};
use crate::core::Invoice;

const FIELD: &str = "previous_invoice_hash";

/// Outcome of checking an invoice against its series state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Link {
    /// The invoice continues the series.
    Extends,
    /// The invoice is the one the series is currently anchored on.
    Replay,
    /// The invoice does not link; findings were recorded.
    Broken,
}

pub(super) fn hash_format(invoice: &Invoice, _ctx: &RuleContext<'_>, out: &mut Findings) {
    if let Some(pih) = invoice.previous_invoice_hash.as_deref() {
        if !is_hash_shaped(pih) {
            out.error(
                RuleCode::PreviousInvoiceHash,
                FIELD,
                format!("'{pih}' is not a hex SHA-256 digest"),
            );
        }
    }
}

/// Check `invoice` (whose own hash is `hash`) against the series state.
/// A malformed PIH was already reported by [`hash_format`].
pub(crate) fn link(
    invoice: &Invoice,
    hash: &str,
    state: Option<&ChainState>,
    out: &mut Findings,
) -> Link {
    let pih = invoice.previous_invoice_hash.as_deref();
    if pih.is_some_and(|p| !is_hash_shaped(p)) {
        return Link::Broken;
    }

    let Some(state) = state else {
        return match pih {
            None => Link::Extends,
            Some(p) => {
                out.error(
                    RuleCode::PreviousInvoiceHash,
                    FIELD,
                    format!(
                        "first invoice of series '{}' must not reference a previous hash, found {p}",
                        invoice.series_id
                    ),
                );
                Link::Broken
            }
        };
    };

    let same_pih = match (pih, state.anchor_pih.as_deref()) {
        (None, None) => true,
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        _ => false,
    };
    if hash == state.last_hash && same_pih {
        return Link::Replay;
    }

    let Some(pih) = pih else {
        out.error(
            RuleCode::PreviousInvoiceHash,
            FIELD,
            format!(
                "previous invoice hash is missing; series '{}' expects {}",
                invoice.series_id, state.last_hash
            ),
        );
        return Link::Broken;
    };
    if !pih.eq_ignore_ascii_case(&state.last_hash) {
        out.error(
            RuleCode::PreviousInvoiceHash,
            FIELD,
            format!(
                "previous invoice hash {pih} does not match last accepted {}",
                state.last_hash
            ),
        );
        return Link::Broken;
    }
    if let Some(date) = invoice.issue_date {
        if date < state.last_issue_date {
            out.error(
                RuleCode::PreviousInvoiceHash,
                "issue_date",
                format!(
                    "issue date {date} precedes last accepted invoice date {}",
                    state.last_issue_date
                ),
            );
            return Link::Broken;
        }
    }
    Link::Extends
}
