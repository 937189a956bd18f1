use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use super::transaction::Transaction;

/// Amount carried by the genesis transaction
pub const GENESIS_AMOUNT: f64 = 100.0;

/// Payer of the genesis transaction
pub const GENESIS_PAYER: &str = "genesis";

/// Payee of the genesis transaction
pub const GENESIS_PAYEE: &str = "satoshi";

/// Represents a block in the ledger
///
/// A block is a value: once built its fields never change, and its hash is
/// always recomputed from them rather than stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Block {
    /// Hash of the previous block, empty for the genesis block
    prev_hash: String,

    /// The transfer this block carries
    transaction: Transaction,

    /// Timestamp when the block was created
    #[schema(value_type = String, example = "2023-01-01T12:00:00Z")]
    timestamp: DateTime<Utc>,

    /// Proof of work (nonce)
    nonce: u64,
}

impl Block {
    /// Creates a new block stamped with the current time
    ///
    /// # Arguments
    ///
    /// * `prev_hash` - The hash of the previous block
    /// * `transaction` - The transaction to include in the block
    /// * `nonce` - The proof of work (nonce)
    pub fn new(prev_hash: impl Into<String>, transaction: Transaction, nonce: u64) -> Self {
        Self::with_timestamp(prev_hash, transaction, nonce, Utc::now())
    }

    /// Creates a new block with an explicit timestamp
    pub fn with_timestamp(
        prev_hash: impl Into<String>,
        transaction: Transaction,
        nonce: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Block {
            prev_hash: prev_hash.into(),
            transaction,
            timestamp,
            nonce,
        }
    }

    /// The fixed first block of every ledger
    pub fn genesis() -> Self {
        Block::new(
            "",
            Transaction::new(GENESIS_AMOUNT, GENESIS_PAYER, GENESIS_PAYEE),
            0,
        )
    }

    /// Whether this block has the genesis shape (empty prev hash, genesis transfer)
    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
            && self.transaction == Transaction::new(GENESIS_AMOUNT, GENESIS_PAYER, GENESIS_PAYEE)
    }

    pub fn prev_hash(&self) -> &str {
        &self.prev_hash
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// Calculates the hash of the block
    ///
    /// # Returns
    ///
    /// The SHA-256 hash of the block as a hexadecimal string
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(super::canonical_json(self).as_bytes());
        hex::encode(hasher.finalize())
    }
}
