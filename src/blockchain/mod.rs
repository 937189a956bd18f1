// Blockchain module
//
// This module contains the ledger integrity engine:
// - Transaction structure and its canonical encoding
// - Block structure and hashing
// - Signing and verification
// - Proof of work algorithm
// - The append-only ledger

pub mod block;
pub mod chain;
pub mod crypto;
pub mod pow;
pub mod transaction;

use serde::Serialize;

// Re-export main components for easier access
pub use block::Block;
pub use chain::{validate_chain, Ledger, LedgerError};
pub use crypto::{verify_signature, CryptoError, DigitalSignature, Wallet};
pub use pow::{mining_hash, Difficulty, MiningOutcome, ProofOfWork};
pub use transaction::Transaction;

/// Compact JSON of `value`, fields in declaration order.
///
/// Only used on plain structs of strings, numbers and timestamps, for which
/// serde_json cannot fail.
pub(crate) fn canonical_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("ledger records always serialize to JSON")
}
