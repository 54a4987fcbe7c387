//! Core invoice types, builders, configuration and results.
//!
//! This module provides the ZATCA invoice model the rule engine evaluates,
//! the explicit [`ValidationConfig`] passed to engines and pipelines, and the
//! immutable [`ValidationResult`] they produce.

mod builder;
mod config;
mod error;
mod result;
pub mod totals;
mod types;

pub use builder::*;
pub use config::*;
pub use error::*;
pub use result::*;
pub use types::*;
