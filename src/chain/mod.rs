//! Invoice hash chains: canonical hashing and the per-series tracker.

mod hash;
mod tracker;

pub use hash::{HASH_HEX_LEN, invoice_hash, is_hash_shaped};
pub use tracker::{ChainState, ChainTicket, ChainTracker};
