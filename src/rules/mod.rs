//! The ZATCA rule catalogue and the engine that runs it.
//!
//! Seventeen rules, evaluated in a fixed order, each contributing findings
//! under a stable code. Codes are an external contract: they are never
//! renumbered, only appended to.
//!
//! | Code | Category | Check |
//! |------|----------|-------|
//! | STR-001 | structural | mandatory fields present |
//! | STR-002 | structural | type code is 388, 381 or 383 |
//! | STR-003 | structural | issue date present |
//! | STR-004 | structural | issue date inside the accepted window |
//! | STR-005 | structural | at least one line |
//! | VAT-001 | vat | seller VAT number format |
//! | VAT-002 | vat | buyer VAT number format |
//! | LIN-001 | line | quantity positive |
//! | LIN-002 | line | unit price non-negative |
//! | LIN-003 | line | supported VAT rate |
//! | NUM-001 | numeric | line totals |
//! | NUM-002 | numeric | subtotal |
//! | NUM-003 | numeric | VAT total |
//! | NUM-004 | numeric | grand total |
//! | CRY-001 | cryptographic | signature |
//! | CRY-002 | cryptographic | QR code |
//! | CHN-001 | chain | previous invoice hash |

mod chain;
mod crypto;
mod engine;
mod line;
mod numeric;
mod structural;
mod vat;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::core::{Invoice, ValidationConfig, Violation};
use crate::crypto::SignatureVerifier;

pub use engine::RuleEngine;
pub use vat::{VatFormatError, validate_vat_number};

/// Stable identifier of a rule (or of a system-level finding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleCode {
    MandatoryFields,
    InvoiceTypeCode,
    IssueDatePresent,
    IssueDateWindow,
    LinesPresent,
    SellerVat,
    BuyerVat,
    LineQuantity,
    LineUnitPrice,
    LineTaxRate,
    LineTotal,
    Subtotal,
    TaxTotal,
    GrandTotal,
    Signature,
    QrCode,
    PreviousInvoiceHash,
    /// Not a rule: evaluation of one invoice faulted.
    WorkerFault,
    /// Not a rule: the item could not be parsed.
    ParseFailure,
}

/// Rule grouping, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCategory {
    Structural,
    Vat,
    Line,
    Numeric,
    Cryptographic,
    Chain,
    System,
}

impl RuleCode {
    /// The 17 catalogue rules in evaluation order.
    pub const ALL: [RuleCode; 17] = [
        Self::MandatoryFields,
        Self::InvoiceTypeCode,
        Self::IssueDatePresent,
        Self::IssueDateWindow,
        Self::LinesPresent,
        Self::SellerVat,
        Self::BuyerVat,
        Self::LineQuantity,
        Self::LineUnitPrice,
        Self::LineTaxRate,
        Self::LineTotal,
        Self::Subtotal,
        Self::TaxTotal,
        Self::GrandTotal,
        Self::Signature,
        Self::QrCode,
        Self::PreviousInvoiceHash,
    ];

    /// External code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MandatoryFields => "STR-001",
            Self::InvoiceTypeCode => "STR-002",
            Self::IssueDatePresent => "STR-003",
            Self::IssueDateWindow => "STR-004",
            Self::LinesPresent => "STR-005",
            Self::SellerVat => "VAT-001",
            Self::BuyerVat => "VAT-002",
            Self::LineQuantity => "LIN-001",
            Self::LineUnitPrice => "LIN-002",
            Self::LineTaxRate => "LIN-003",
            Self::LineTotal => "NUM-001",
            Self::Subtotal => "NUM-002",
            Self::TaxTotal => "NUM-003",
            Self::GrandTotal => "NUM-004",
            Self::Signature => "CRY-001",
            Self::QrCode => "CRY-002",
            Self::PreviousInvoiceHash => "CHN-001",
            Self::WorkerFault => "SYS-001",
            Self::ParseFailure => "SYS-002",
        }
    }

    /// Parse an external code string.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "SYS-001" => Some(Self::WorkerFault),
            "SYS-002" => Some(Self::ParseFailure),
            other => Self::ALL.into_iter().find(|r| r.code() == other),
        }
    }

    pub fn category(&self) -> RuleCategory {
        match self {
            Self::MandatoryFields
            | Self::InvoiceTypeCode
            | Self::IssueDatePresent
            | Self::IssueDateWindow
            | Self::LinesPresent => RuleCategory::Structural,
            Self::SellerVat | Self::BuyerVat => RuleCategory::Vat,
            Self::LineQuantity | Self::LineUnitPrice | Self::LineTaxRate => RuleCategory::Line,
            Self::LineTotal | Self::Subtotal | Self::TaxTotal | Self::GrandTotal => {
                RuleCategory::Numeric
            }
            Self::Signature | Self::QrCode => RuleCategory::Cryptographic,
            Self::PreviousInvoiceHash => RuleCategory::Chain,
            Self::WorkerFault | Self::ParseFailure => RuleCategory::System,
        }
    }

    /// One-line description for reports.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::MandatoryFields => "mandatory fields present",
            Self::InvoiceTypeCode => "invoice type code is 388, 381 or 383",
            Self::IssueDatePresent => "issue date present",
            Self::IssueDateWindow => "issue date not in the future and not stale",
            Self::LinesPresent => "at least one invoice line",
            Self::SellerVat => "seller VAT number is 15 digits starting and ending with 3",
            Self::BuyerVat => "buyer VAT number is 15 digits starting and ending with 3",
            Self::LineQuantity => "line quantity is positive",
            Self::LineUnitPrice => "line unit price is not negative",
            Self::LineTaxRate => "line VAT rate is 0% or 15%",
            Self::LineTotal => "line total equals net amount plus VAT",
            Self::Subtotal => "subtotal equals the sum of line net amounts",
            Self::TaxTotal => "VAT total equals the sum of line VAT",
            Self::GrandTotal => "total equals subtotal plus VAT",
            Self::Signature => "cryptographic stamp present and valid",
            Self::QrCode => "QR code present and consistent with the invoice",
            Self::PreviousInvoiceHash => "previous invoice hash continues the series chain",
            Self::WorkerFault => "evaluation fault",
            Self::ParseFailure => "parse failure",
        }
    }
}

impl std::fmt::Display for RuleCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for RuleCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for RuleCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Self::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown rule code '{code}'")))
    }
}

/// Inputs shared by every rule during one evaluation.
pub(crate) struct RuleContext<'a> {
    pub config: &'a ValidationConfig,
    pub today: NaiveDate,
    pub verifier: &'a dyn SignatureVerifier,
}

type RuleFn = fn(&Invoice, &RuleContext<'_>, &mut Findings);

/// A catalogue entry: stable code plus its stateless check.
pub struct Rule {
    pub code: RuleCode,
    check: RuleFn,
}

impl Rule {
    pub fn category(&self) -> RuleCategory {
        self.code.category()
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("code", &self.code).finish()
    }
}

/// The catalogue, in evaluation order. CHN-001's entry covers the stateless
/// part (PIH shape); the linkage part runs in the engine's chain stage.
pub static CATALOGUE: [Rule; 17] = [
    Rule { code: RuleCode::MandatoryFields, check: structural::mandatory_fields },
    Rule { code: RuleCode::InvoiceTypeCode, check: structural::type_code },
    Rule { code: RuleCode::IssueDatePresent, check: structural::issue_date_present },
    Rule { code: RuleCode::IssueDateWindow, check: structural::issue_date_window },
    Rule { code: RuleCode::LinesPresent, check: structural::lines_present },
    Rule { code: RuleCode::SellerVat, check: vat::seller_vat },
    Rule { code: RuleCode::BuyerVat, check: vat::buyer_vat },
    Rule { code: RuleCode::LineQuantity, check: line::quantity },
    Rule { code: RuleCode::LineUnitPrice, check: line::unit_price },
    Rule { code: RuleCode::LineTaxRate, check: line::tax_rate },
    Rule { code: RuleCode::LineTotal, check: numeric::line_totals },
    Rule { code: RuleCode::Subtotal, check: numeric::subtotal },
    Rule { code: RuleCode::TaxTotal, check: numeric::tax_total },
    Rule { code: RuleCode::GrandTotal, check: numeric::grand_total },
    Rule { code: RuleCode::Signature, check: crypto::signature },
    Rule { code: RuleCode::QrCode, check: crypto::qr_code },
    Rule { code: RuleCode::PreviousInvoiceHash, check: chain::hash_format },
];

/// Findings collected for one invoice. Never short-circuits.
pub(crate) struct Findings {
    strict: bool,
    violations: Vec<Violation>,
    warnings: Vec<Violation>,
}

impl Findings {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            violations: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error(&mut self, rule: RuleCode, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(Violation::error(rule, field, message));
    }

    /// Recorded as a violation in strict mode, kept aside otherwise.
    pub fn warn(&mut self, rule: RuleCode, field: impl Into<String>, message: impl Into<String>) {
        let warning = Violation::warning(rule, field, message);
        if self.strict {
            self.violations.push(warning);
        } else {
            self.warnings.push(warning);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Violation>, Vec<Violation>) {
        (self.violations, self.warnings)
    }
}
