use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::chain::{self, Link};
use super::{CATALOGUE, Findings, Rule, RuleContext};
use crate::chain::{ChainState, ChainTicket, ChainTracker, invoice_hash};
use crate::core::{Invoice, ValidationConfig, ValidationResult};
use crate::crypto::{SignatureVerifier, StructuralVerifier};

/// Evaluates invoices against the rule catalogue.
///
/// Stateless apart from its configuration and verifier; chain state lives
/// in the [`ChainTracker`] passed per call. Cheap to clone, one per worker.
///
/// ```
/// use chrono::NaiveDate;
/// use fatoora::core::*;
/// use fatoora::rules::{RuleCode, RuleEngine};
/// use rust_decimal_macros::dec;
///
/// let addr = || AddressBuilder::new("Riyadh", "12211", "SA").build();
/// let invoice = InvoiceBuilder::new("INV-1", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
///     .seller(PartyBuilder::new("Seller", addr()).vat_number("300000000000003").build())
///     .buyer(PartyBuilder::new("Buyer", addr()).vat_number("399999999999993").build())
///     .add_line(LineItemBuilder::new("1", "Service", dec!(2), dec!(50)).build())
///     .build()
///     .unwrap();
///
/// let config = ValidationConfig::default()
///     .check_signatures(false)
///     .verify_qr(false)
///     .reference_date(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
/// let result = RuleEngine::new(config).evaluate(&invoice, None);
/// assert!(result.is_compliant());
/// assert!(!result.has_violation(RuleCode::PreviousInvoiceHash));
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    config: ValidationConfig,
    verifier: Arc<dyn SignatureVerifier>,
}

impl RuleEngine {
    /// Engine using the [`StructuralVerifier`] for CRY-001.
    pub fn new(config: ValidationConfig) -> Self {
        Self::with_verifier(config, Arc::new(StructuralVerifier))
    }

    pub fn with_verifier(config: ValidationConfig, verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self { config, verifier }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// The catalogue in evaluation order.
    pub fn rules(&self) -> &'static [Rule] {
        &CATALOGUE
    }

    /// Evaluate one invoice.
    ///
    /// With a tracker, the chain stage runs under the series lock and a
    /// fully compliant invoice advances the series. Without one, the invoice
    /// is checked as the first of its series and nothing is recorded.
    pub fn evaluate(&self, invoice: &Invoice, tracker: Option<&ChainTracker>) -> ValidationResult {
        let started = Instant::now();
        let hash = invoice_hash(invoice);
        let findings = self.check_rules(invoice);
        let findings = match tracker {
            Some(tracker) => tracker.with_series(&invoice.series_id, |chain| {
                self.chain_stage(invoice, &hash, chain, findings)
            }),
            None => self.chain_stage(invoice, &hash, &mut None, findings),
        };
        self.finish(invoice, findings, hash)
            .with_duration(started.elapsed())
    }

    /// Evaluate one invoice, running its chain stage only once every earlier
    /// ticket of the series has settled.
    pub fn evaluate_in_turn(&self, invoice: &Invoice, ticket: ChainTicket) -> ValidationResult {
        let started = Instant::now();
        let hash = invoice_hash(invoice);
        let findings = self.check_rules(invoice);
        let findings = ticket.settle(|chain| self.chain_stage(invoice, &hash, chain, findings));
        self.finish(invoice, findings, hash)
            .with_duration(started.elapsed())
    }

    fn check_rules(&self, invoice: &Invoice) -> Findings {
        let ctx = RuleContext {
            config: &self.config,
            today: self.config.today(),
            verifier: self.verifier.as_ref(),
        };
        let mut findings = Findings::new(self.config.strict_mode);
        for rule in &CATALOGUE {
            (rule.check)(invoice, &ctx, &mut findings);
        }
        findings
    }

    fn chain_stage(
        &self,
        invoice: &Invoice,
        hash: &str,
        chain: &mut Option<ChainState>,
        mut findings: Findings,
    ) -> Findings {
        let others_passed = findings.is_clean();
        match chain::link(invoice, hash, chain.as_ref(), &mut findings) {
            Link::Extends if others_passed => {
                if let Some(date) = invoice.issue_date {
                    *chain = Some(ChainState::extend(chain.as_ref(), hash, date));
                    debug!(
                        series = %invoice.series_id,
                        invoice = %invoice.number,
                        "chain advanced"
                    );
                }
            }
            Link::Replay => {
                debug!(
                    series = %invoice.series_id,
                    invoice = %invoice.number,
                    "anchored invoice re-validated, chain unchanged"
                );
            }
            Link::Extends | Link::Broken => {}
        }
        findings
    }

    fn finish(&self, invoice: &Invoice, findings: Findings, hash: String) -> ValidationResult {
        let (violations, warnings) = findings.into_parts();
        ValidationResult::new(
            invoice.number.clone(),
            Some(invoice.series_id.clone()),
            violations,
            warnings,
            Some(hash),
        )
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
