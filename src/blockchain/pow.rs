use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use std::fmt;
use std::str::FromStr;

use super::crypto::{verify_signature, DigitalSignature};
use super::transaction::Transaction;

/// Required hex prefix of a mining hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Difficulty(String);

impl Difficulty {
    /// A prefix of `count` zero digits
    pub fn leading_zeros(count: usize) -> Self {
        Difficulty("0".repeat(count))
    }

    pub fn prefix(&self) -> &str {
        &self.0
    }

    /// Whether `hash` satisfies this target
    pub fn is_met_by(&self, hash: &str) -> bool {
        hash.starts_with(&self.0)
    }

    /// Expected number of trials to find a solution, 16^len
    pub fn expected_iterations(&self) -> u64 {
        u32::try_from(self.0.len())
            .ok()
            .and_then(|len| 16u64.checked_pow(len))
            .unwrap_or(u64::MAX)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::leading_zeros(5)
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // hex digests are lowercase, anything else could never match
        if let Some(c) = s.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
            return Err(format!("'{}' is not a lowercase hex digit in target '{}'", c, s));
        }

        Ok(Difficulty(s.to_string()))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash a candidate nonce is judged by: SHA-256 of the nonce's decimal form
/// followed by the serialized transaction
pub fn mining_hash(nonce: u64, transaction: &Transaction) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_string().as_bytes());
    hasher.update(transaction.serialize().as_bytes());
    hex::encode(hasher.finalize())
}

/// Terminal result of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiningOutcome {
    /// `nonce` satisfies the target and the signature is valid
    Solved { nonce: u64, iterations: u64 },

    /// The signature does not verify; no nonce can fix that
    InvalidSignature,

    /// The iteration bound ran out before a solution was found
    Exhausted { iterations: u64 },
}

/// Proof-of-work search over nonces for a single transaction
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    difficulty: Difficulty,
    max_iterations: Option<u64>,
}

impl ProofOfWork {
    /// `max_iterations` of `None` searches until a solution is found
    pub fn new(difficulty: Difficulty, max_iterations: Option<u64>) -> Self {
        ProofOfWork {
            difficulty,
            max_iterations,
        }
    }

    pub fn difficulty(&self) -> &Difficulty {
        &self.difficulty
    }

    pub fn max_iterations(&self) -> Option<u64> {
        self.max_iterations
    }

    /// Searches upward from `start_nonce` for a nonce whose mining hash meets
    /// the difficulty target.
    ///
    /// The signature binds the sender to the transaction and not to any nonce,
    /// so it is checked once before searching. A bad signature ends the search
    /// immediately.
    pub fn mine(
        &self,
        start_nonce: u64,
        transaction: &Transaction,
        sender_public_key: &str,
        signature: &DigitalSignature,
    ) -> MiningOutcome {
        let payload = transaction.serialize();
        if !verify_signature(sender_public_key, payload.as_bytes(), signature) {
            warn!("Signature does not verify for sender {}", sender_public_key);
            return MiningOutcome::InvalidSignature;
        }

        info!(
            "Mining from nonce {} for target '{}' (~{} trials expected)",
            start_nonce,
            self.difficulty,
            self.difficulty.expected_iterations()
        );

        let mut nonce = start_nonce;
        let mut iterations: u64 = 0;

        loop {
            if let Some(max) = self.max_iterations {
                if iterations >= max {
                    warn!("Proof of work exhausted after {} iterations", iterations);
                    return MiningOutcome::Exhausted { iterations };
                }
            }

            iterations += 1;
            let hash = mining_hash(nonce, transaction);

            if self.difficulty.is_met_by(&hash) {
                info!("Solved: nonce {} after {} iterations", nonce, iterations);
                debug!("Winning hash {}", hash);
                return MiningOutcome::Solved { nonce, iterations };
            }

            nonce = nonce.wrapping_add(1);
        }
    }
}
