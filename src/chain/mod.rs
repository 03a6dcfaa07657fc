//! Ledger integration subsystem.
//!
//! # Data Flow
//! ```text
//! funded submission (utxos + record)
//!     → transaction.rs (build, price, sort, sign, broadcast)
//!         → fees.rs (size estimate, dust rule)
//!         → sort.rs (canonical ordering)
//!         → sighash.rs (fork-id digest, P2PKH signature scripts)
//!     → wallet.rs (fee rates, keys, broadcast)
//! ```
//!
//! # Security Constraints
//! - Keys stay inside the wallet collaborator
//! - Never log private keys or sensitive data
//! - Wallet calls are not retried here

pub mod fees;
pub mod script;
pub mod sighash;
pub mod sort;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use transaction::{AssemblyError, FeePolicy, TxAssembler};
pub use types::{Address, ChainError, ChainResult, OutPoint, Transaction, TxIn, TxOut, Txid, Utxo};
pub use wallet::{FeePriority, FeeRates, LocalWallet, Wallet};
