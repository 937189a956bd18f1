use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::crypto::{DigitalSignature, Wallet};

/// A single value transfer between two identities.
///
/// Transactions are immutable once built: the same fields always serialize
/// to the same bytes, and both the signature and the mining hash are taken
/// over that serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Amount being transferred
    amount: f64,

    /// Payer identity (public key)
    payer: String,

    /// Payee identity (public key)
    payee: String,
}

impl Transaction {
    /// Creates a new transaction
    pub fn new(amount: f64, payer: impl Into<String>, payee: impl Into<String>) -> Self {
        Transaction {
            amount,
            payer: payer.into(),
            payee: payee.into(),
        }
    }

    /// Builds a transfer from `wallet` to `payee` and signs it.
    pub fn signed_by(wallet: &Wallet, amount: f64, payee: impl Into<String>) -> (Self, DigitalSignature) {
        let transaction = Transaction::new(amount, wallet.public_key(), payee);
        let signature = wallet.sign(transaction.serialize().as_bytes());
        (transaction, signature)
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn payer(&self) -> &str {
        &self.payer
    }

    pub fn payee(&self) -> &str {
        &self.payee
    }

    /// Canonical encoding: compact JSON with fields in declaration order
    pub fn serialize(&self) -> String {
        super::canonical_json(self)
    }
}
