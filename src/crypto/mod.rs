//! Signature verification seam and QR payload codec.

pub mod qr;
mod signature;

pub use qr::{QrError, QrPayload, encode_for};
pub use signature::{MIN_SIGNATURE_BYTES, SignatureVerifier, StructuralVerifier};
