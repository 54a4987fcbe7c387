use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::core::Invoice;

/// Pluggable check of an invoice's cryptographic stamp.
///
/// Shared across worker threads, so implementations must be `Send + Sync`.
/// A rejection is reported through the `Err` reason and becomes a CRY-001
/// violation; it never aborts evaluation.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, invoice: &Invoice, signature: &str) -> Result<(), String>;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&Invoice, &str) -> Result<(), String> + Send + Sync,
{
    fn verify(&self, invoice: &Invoice, signature: &str) -> Result<(), String> {
        self(invoice, signature)
    }
}

/// Default verifier: the stamp must be base64 carrying at least
/// [`MIN_SIGNATURE_BYTES`] bytes. No key material is consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralVerifier;

/// Shortest raw stamp accepted by [`StructuralVerifier`] (a bare P-256 `r||s`).
pub const MIN_SIGNATURE_BYTES: usize = 64;

impl SignatureVerifier for StructuralVerifier {
    fn verify(&self, _invoice: &Invoice, signature: &str) -> Result<(), String> {
        let raw = STANDARD
            .decode(signature.trim())
            .map_err(|e| format!("signature is not valid base64: {e}"))?;
        if raw.len() < MIN_SIGNATURE_BYTES {
            return Err(format!(
                "signature is {} bytes, expected at least {MIN_SIGNATURE_BYTES}",
                raw.len()
            ));
        }
        Ok(())
    }
}
