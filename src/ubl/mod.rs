//! ZATCA UBL 2.1 invoice XML: parsing and generation.
//!
//! ZATCA issues standard invoices, credit notes and debit notes all as a UBL
//! `Invoice` document; the type code (388 / 381 / 383) tells them apart and
//! its `name` attribute carries the transaction subtype.
//!
//! The chain fields travel as `AdditionalDocumentReference`s with IDs `PIH`
//! and `QR`; the stamp's `SignatureValue` sits in the UBL extensions.
//!
//! # Example
//!
//! ```no_run
//! use fatoora::core::*;
//! use fatoora::ubl;
//!
//! let invoice: Invoice = todo!(); // build via InvoiceBuilder
//! let xml = ubl::to_ubl_xml(&invoice).unwrap();
//! let parsed = ubl::from_ubl_xml(&xml).unwrap();
//! assert_eq!(parsed.number, invoice.number);
//! ```

mod parse;
mod write;
pub(crate) mod xml_utils;

pub use parse::from_ubl_xml;
pub use write::to_ubl_xml;

/// ZATCA profile identifier for reported invoices.
pub const ZATCA_PROFILE_ID: &str = "reporting:1.0";

/// `AdditionalDocumentReference` ID of the previous invoice hash.
pub const PIH_REFERENCE_ID: &str = "PIH";

/// `AdditionalDocumentReference` ID of the QR payload.
pub const QR_REFERENCE_ID: &str = "QR";

/// Namespace URIs used by ZATCA invoices.
pub mod ubl_ns {
    pub const INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
    pub const CAC: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
    pub const CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
    pub const EXT: &str =
        "urn:oasis:names:specification:ubl:schema:xsd:CommonExtensionComponents-2";
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
}
