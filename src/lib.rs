//! An append-only ledger of signed transfers secured by proof of work.
//!
//! Each block carries one transaction and the hash of its predecessor. A
//! transaction is only appended once its signature verifies against the
//! payer's public key and a nonce has been found whose mining hash meets the
//! ledger's difficulty target.
//!
//! ```no_run
//! use pow_ledger::blockchain::{Ledger, Transaction, Wallet};
//!
//! let ledger = Ledger::new();
//! let alice = Wallet::new();
//! let bob = Wallet::new();
//!
//! let (tx, signature) = Transaction::signed_by(&alice, 50.0, bob.public_key());
//! let block = ledger.append(tx, alice.public_key(), &signature).unwrap();
//! assert_eq!(ledger.last_block(), block);
//! ```

pub mod api;
pub mod blockchain;
pub mod config;

pub use blockchain::{Block, Ledger, LedgerError, Transaction, Wallet};
pub use config::{LedgerConfig, ServerConfig};
