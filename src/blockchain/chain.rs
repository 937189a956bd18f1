use chrono::Utc;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard};

use super::block::Block;
use super::crypto::DigitalSignature;
use super::pow::{mining_hash, Difficulty, MiningOutcome, ProofOfWork};
use super::transaction::Transaction;
use crate::config::LedgerConfig;

/// Starting nonces are drawn from `0..MAX_START_NONCE`
const MAX_START_NONCE: u64 = 1_000_000_000;

/// Errors that can occur during ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid amount: {0} is not a finite number")]
    InvalidAmount(f64),

    #[error("Proof of work exhausted after {iterations} iterations")]
    ProofOfWorkExhausted { iterations: u64 },

    #[error("Invalid difficulty: {0}")]
    InvalidDifficulty(String),

    #[error("Invalid chain at block {index}: {reason}")]
    InvalidChain { index: usize, reason: String },
}

/// An append-only chain of blocks, seeded with the genesis block.
///
/// Appends are serialized; readers see either the chain before an append or
/// the chain extended by exactly one block, never anything in between.
#[derive(Debug)]
pub struct Ledger {
    /// The chain of blocks
    chain: RwLock<Vec<Block>>,

    /// Held for the whole of an append, including the search
    append_lock: Mutex<()>,

    /// Source of starting nonces
    rng: Mutex<StdRng>,

    pow: ProofOfWork,
}

impl Ledger {
    /// Creates a ledger with the default configuration
    pub fn new() -> Self {
        Self::build(Difficulty::default(), LedgerConfig::default())
    }

    /// Creates a ledger from `config`, rejecting a malformed difficulty target
    pub fn with_config(config: LedgerConfig) -> Result<Self, LedgerError> {
        let difficulty = config
            .difficulty
            .parse::<Difficulty>()
            .map_err(LedgerError::InvalidDifficulty)?;

        Ok(Self::build(difficulty, config))
    }

    fn build(difficulty: Difficulty, config: LedgerConfig) -> Self {
        let rng = match config.nonce_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ledger {
            chain: RwLock::new(vec![Block::genesis()]),
            append_lock: Mutex::new(()),
            rng: Mutex::new(rng),
            pow: ProofOfWork::new(difficulty, config.max_iterations),
        }
    }

    fn read_chain(&self) -> RwLockReadGuard<'_, Vec<Block>> {
        // blocks are only pushed whole, so a poisoned chain is still consistent
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn difficulty(&self) -> &Difficulty {
        self.pow.difficulty()
    }

    /// Gets the most recent block; the genesis block on a fresh ledger
    pub fn last_block(&self) -> Block {
        let chain = self.read_chain();
        chain[chain.len() - 1].clone()
    }

    /// Height and contents of the most recent block, read under one guard
    pub fn tip(&self) -> (usize, Block) {
        let chain = self.read_chain();
        let height = chain.len() - 1;
        (height, chain[height].clone())
    }

    /// Snapshot of the entire chain
    pub fn blocks(&self) -> Vec<Block> {
        self.read_chain().clone()
    }

    pub fn len(&self) -> usize {
        self.read_chain().len()
    }

    /// Always false: the genesis block is never removed
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Mines and appends a block carrying `transaction`, starting the search at
    /// a random nonce.
    pub fn append(
        &self,
        transaction: Transaction,
        sender_public_key: &str,
        signature: &DigitalSignature,
    ) -> Result<Block, LedgerError> {
        let start_nonce = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0..MAX_START_NONCE);

        self.append_from_nonce(start_nonce, transaction, sender_public_key, signature)
    }

    /// Mines and appends a block carrying `transaction`, starting the search at
    /// `start_nonce`.
    ///
    /// On any error the chain is left exactly as it was.
    pub fn append_from_nonce(
        &self,
        start_nonce: u64,
        transaction: Transaction,
        sender_public_key: &str,
        signature: &DigitalSignature,
    ) -> Result<Block, LedgerError> {
        // non-finite amounts all encode as JSON null, so a signature over one
        // would verify any other
        if !transaction.amount().is_finite() {
            warn!("Rejected transfer with non-finite amount from {}", sender_public_key);
            return Err(LedgerError::InvalidAmount(transaction.amount()));
        }

        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let prev_hash = self.last_block().hash();
        let timestamp = Utc::now();

        info!("Mining block on top of {}", &prev_hash[..12]);

        match self.pow.mine(start_nonce, &transaction, sender_public_key, signature) {
            MiningOutcome::Solved { nonce, .. } => {
                let block = Block::with_timestamp(prev_hash, transaction, nonce, timestamp);

                let mut chain = self.chain.write().unwrap_or_else(PoisonError::into_inner);
                chain.push(block.clone());
                info!("Appended block {} (height {})", &block.hash()[..12], chain.len() - 1);

                Ok(block)
            }
            MiningOutcome::InvalidSignature => {
                warn!("Rejected transfer of {} from {}", transaction.amount(), sender_public_key);
                Err(LedgerError::InvalidSignature)
            }
            MiningOutcome::Exhausted { iterations } => {
                Err(LedgerError::ProofOfWorkExhausted { iterations })
            }
        }
    }

    /// Validates the ledger
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_chain(&self.read_chain(), self.difficulty())
    }

    /// true if the ledger is valid, false otherwise
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks a sequence of blocks: genesis first, every block linked to the hash
/// of its predecessor, and every mined block meeting `difficulty`.
pub fn validate_chain(blocks: &[Block], difficulty: &Difficulty) -> Result<(), LedgerError> {
    let genesis = blocks.first().ok_or_else(|| LedgerError::InvalidChain {
        index: 0,
        reason: "chain is empty".to_string(),
    })?;

    if !genesis.is_genesis() {
        return Err(LedgerError::InvalidChain {
            index: 0,
            reason: "first block is not the genesis block".to_string(),
        });
    }

    for (index, pair) in blocks.windows(2).enumerate() {
        let (previous, current) = (&pair[0], &pair[1]);
        let index = index + 1;

        if current.prev_hash() != previous.hash() {
            return Err(LedgerError::InvalidChain {
                index,
                reason: format!(
                    "prev_hash {} does not match hash of block {}",
                    current.prev_hash(),
                    index - 1
                ),
            });
        }

        let hash = mining_hash(current.nonce(), current.transaction());
        if !difficulty.is_met_by(&hash) {
            return Err(LedgerError::InvalidChain {
                index,
                reason: format!("mining hash {} does not meet target '{}'", hash, difficulty),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;

    fn test_ledger() -> Ledger {
        Ledger::with_config(LedgerConfig {
            difficulty: "00".to_string(),
            max_iterations: Some(1_000_000),
            nonce_seed: Some(7),
        })
        .unwrap()
    }

    #[test]
    fn test_new_ledger() {
        let ledger = Ledger::new();
        let chain = ledger.blocks();

        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].prev_hash(), "");
        assert_eq!(chain[0].transaction(), &Transaction::new(100.0, "genesis", "satoshi"));
        assert_eq!(ledger.last_block(), chain[0]);
        assert_eq!(ledger.difficulty().prefix(), "00000");
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_invalid_difficulty_config() {
        let result = Ledger::with_config(LedgerConfig {
            difficulty: "zz".to_string(),
            ..LedgerConfig::default()
        });

        assert!(matches!(result, Err(LedgerError::InvalidDifficulty(_))));
    }

    #[test]
    fn test_append_valid_transaction() {
        let ledger = test_ledger();
        let alice = Wallet::new();
        let bob = Wallet::new();
        let previous = ledger.last_block();

        let (tx, signature) = Transaction::signed_by(&alice, 50.0, bob.public_key());
        let block = ledger.append(tx.clone(), alice.public_key(), &signature).unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_block(), block);
        assert_eq!(block.prev_hash(), previous.hash());
        assert_eq!(block.transaction(), &tx);
        assert!(mining_hash(block.nonce(), &tx).starts_with("00"));
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_append_rejects_wrong_signer() {
        let ledger = test_ledger();
        let alice = Wallet::new();
        let bob = Wallet::new();

        let (tx, signature) = Transaction::signed_by(&alice, 50.0, bob.public_key());
        ledger.append(tx, alice.public_key(), &signature).unwrap();
        assert_eq!(ledger.len(), 2);

        // Bob signs a transfer out of Alice's identity with his own key
        let forged = Transaction::new(10.0, alice.public_key(), bob.public_key());
        let forged_signature = bob.sign(forged.serialize().as_bytes());
        let tip = ledger.last_block();

        let result = ledger.append(forged, alice.public_key(), &forged_signature);

        assert!(matches!(result, Err(LedgerError::InvalidSignature)));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.last_block(), tip);
    }

    #[test]
    fn test_append_rejects_tampered_transaction() {
        let ledger = test_ledger();
        let alice = Wallet::new();

        let (tx, signature) = Transaction::signed_by(&alice, 5.0, "bob");
        let tampered = Transaction::new(500.0, tx.payer(), tx.payee());

        let result = ledger.append(tampered, alice.public_key(), &signature);

        assert!(matches!(result, Err(LedgerError::InvalidSignature)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_append_rejects_signature_over_other_payload() {
        let ledger = test_ledger();
        let alice = Wallet::new();

        let tx = Transaction::new(5.0, alice.public_key(), "bob");
        let signature = alice.sign(b"something else entirely");

        let result = ledger.append(tx, alice.public_key(), &signature);

        assert!(matches!(result, Err(LedgerError::InvalidSignature)));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_append_rejects_non_finite_amounts() {
        let ledger = test_ledger();
        let alice = Wallet::new();

        let (signed, signature) = Transaction::signed_by(&alice, f64::NAN, "bob");
        let reamounted = Transaction::new(f64::INFINITY, alice.public_key(), "bob");
        assert_eq!(signed.serialize(), reamounted.serialize());

        for amount in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let tx = Transaction::new(amount, alice.public_key(), "bob");
            let result = ledger.append(tx, alice.public_key(), &signature);

            assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        }
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_tip_matches_last_block() {
        let ledger = test_ledger();
        assert_eq!(ledger.tip(), (0, ledger.last_block()));

        let alice = Wallet::new();
        let (tx, signature) = Transaction::signed_by(&alice, 3.0, "bob");
        let block = ledger.append(tx, alice.public_key(), &signature).unwrap();

        assert_eq!(ledger.tip(), (1, block));
    }

    #[test]
    fn test_append_exhausted_leaves_chain_unchanged() {
        let ledger = Ledger::with_config(LedgerConfig {
            difficulty: "0".repeat(64),
            max_iterations: Some(100),
            nonce_seed: Some(1),
        })
        .unwrap();
        let alice = Wallet::new();

        let (tx, signature) = Transaction::signed_by(&alice, 5.0, "bob");
        let result = ledger.append(tx, alice.public_key(), &signature);

        assert!(matches!(
            result,
            Err(LedgerError::ProofOfWorkExhausted { iterations: 100 })
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_append_from_explicit_nonce() {
        let ledger = test_ledger();
        let alice = Wallet::new();

        let (tx, signature) = Transaction::signed_by(&alice, 5.0, "bob");
        let block = ledger
            .append_from_nonce(500, tx, alice.public_key(), &signature)
            .unwrap();

        assert!(block.nonce() >= 500);
    }

    #[test]
    fn test_seeded_ledgers_mine_identical_nonces() {
        let first = test_ledger();
        let second = test_ledger();
        let alice = Wallet::new();

        let (tx, signature) = Transaction::signed_by(&alice, 5.0, "bob");
        let a = first.append(tx.clone(), alice.public_key(), &signature).unwrap();
        let b = second.append(tx, alice.public_key(), &signature).unwrap();

        assert_eq!(a.nonce(), b.nonce());
    }

    #[test]
    fn test_chain_grows_and_links() {
        let ledger = test_ledger();
        let satoshi = Wallet::new();
        let bob = Wallet::new();
        let alice = Wallet::new();

        for (sender, payee, amount) in [
            (&satoshi, &bob, 50.0),
            (&bob, &alice, 23.0),
            (&alice, &bob, 5.0),
        ] {
            let (tx, signature) = Transaction::signed_by(sender, amount, payee.public_key());
            ledger.append(tx, sender.public_key(), &signature).unwrap();
        }

        let chain = ledger.blocks();
        assert_eq!(chain.len(), 4);
        for pair in chain.windows(2) {
            assert_eq!(pair[1].prev_hash(), pair[0].hash());
        }
        assert!(ledger.is_valid());
    }

    #[test]
    fn test_tampering_breaks_the_chain() {
        let ledger = test_ledger();
        let alice = Wallet::new();

        for amount in [1.0, 2.0] {
            let (tx, signature) = Transaction::signed_by(&alice, amount, "bob");
            ledger.append(tx, alice.public_key(), &signature).unwrap();
        }

        let chain = ledger.blocks();
        let target = &chain[1];

        let tampered_blocks = [
            Block::with_timestamp(
                target.prev_hash(),
                Transaction::new(999.0, target.transaction().payer(), target.transaction().payee()),
                target.nonce(),
                target.timestamp(),
            ),
            Block::with_timestamp(
                target.prev_hash(),
                Transaction::new(target.transaction().amount(), "mallory", target.transaction().payee()),
                target.nonce(),
                target.timestamp(),
            ),
            Block::with_timestamp(
                target.prev_hash(),
                target.transaction().clone(),
                target.nonce() + 1,
                target.timestamp(),
            ),
            Block::with_timestamp(
                "forged",
                target.transaction().clone(),
                target.nonce(),
                target.timestamp(),
            ),
        ];

        for tampered in tampered_blocks {
            assert_ne!(tampered.hash(), target.hash());

            let mut blocks = chain.clone();
            blocks[1] = tampered;

            match validate_chain(&blocks, ledger.difficulty()) {
                Err(LedgerError::InvalidChain { index, .. }) => assert!(index == 1 || index == 2),
                other => panic!("expected an invalid chain, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_validate_rejects_missing_genesis() {
        let difficulty = Difficulty::leading_zeros(0);

        assert!(matches!(
            validate_chain(&[], &difficulty),
            Err(LedgerError::InvalidChain { index: 0, .. })
        ));

        let not_genesis = Block::new("", Transaction::new(1.0, "a", "b"), 0);
        assert!(matches!(
            validate_chain(&[not_genesis], &difficulty),
            Err(LedgerError::InvalidChain { index: 0, .. })
        ));
    }

    #[test]
    fn test_concurrent_appends_stay_linked() {
        use std::sync::Arc;
        use std::thread;

        let ledger = Arc::new(test_ledger());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    let wallet = Wallet::new();
                    let (tx, signature) = Transaction::signed_by(&wallet, i as f64, "bob");
                    ledger.append(tx, wallet.public_key(), &signature).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.len(), 5);
        assert!(ledger.is_valid());
    }
}
