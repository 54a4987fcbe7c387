//! # fatoora
//!
//! ZATCA (Saudi Arabia) e-invoice compliance engine: a fixed catalogue of 17
//! rules, per-series invoice hash chains, and two pipelines that stream
//! invoices through them, one sequential and one on a worker pool.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Rule failures are data ([`Violation`]s inside a [`ValidationResult`]), not
//! errors; [`FatooraError`] is reserved for inputs that cannot be processed
//! at all.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fatoora::core::*;
//! use fatoora::rules::RuleEngine;
//! use fatoora::chain::ChainTracker;
//! use rust_decimal_macros::dec;
//!
//! let invoice = InvoiceBuilder::new("INV-2024-001", NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
//!     .seller(PartyBuilder::new("ABC Trading", AddressBuilder::new("Riyadh", "12211", "SA").build())
//!         .vat_number("310122393500003").build())
//!     .buyer(PartyBuilder::new("XYZ Stores", AddressBuilder::new("Jeddah", "21442", "SA").build())
//!         .vat_number("300000000000003").build())
//!     .add_line(LineItemBuilder::new("1", "Consulting", dec!(10), dec!(150)).build())
//!     .build()
//!     .unwrap();
//!
//! let config = ValidationConfig::default()
//!     .check_signatures(false)
//!     .verify_qr(false)
//!     .reference_date(NaiveDate::from_ymd_opt(2024, 6, 16).unwrap());
//! let tracker = ChainTracker::new();
//! let result = RuleEngine::new(config).evaluate(&invoice, Some(&tracker));
//!
//! assert!(result.is_compliant());
//! assert_eq!(invoice.totals.total, dec!(1725.00));
//! assert_eq!(tracker.series_count(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice model, rule engine, chain tracker, pipelines |
//! | `xml` (default) | ZATCA UBL 2.1 parsing and generation |
//! | `json` (default) | JSON invoices and configuration |
//! | `all` | Everything |
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber.
//! Per-invoice audit events use the target
//! [`fatoora::audit`](pipeline::middleware::AUDIT_TARGET).

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod chain;

#[cfg(feature = "core")]
pub mod crypto;

#[cfg(feature = "core")]
pub mod pipeline;

#[cfg(feature = "core")]
pub mod rules;

#[cfg(feature = "core")]
pub mod source;

#[cfg(feature = "xml")]
pub mod ubl;

#[cfg(feature = "json")]
pub mod json;

// Re-export the everyday types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::chain::{ChainState, ChainTicket, ChainTracker};
#[cfg(feature = "core")]
pub use crate::core::*;
#[cfg(feature = "core")]
pub use crate::pipeline::{BatchSummary, CancellationToken, ConcurrentPipeline, SequentialPipeline};
#[cfg(feature = "core")]
pub use crate::rules::{RuleCode, RuleEngine};
#[cfg(feature = "core")]
pub use crate::source::{DirectorySource, SourceItem};
