//! On-chain record publisher.
//!
//! Submitters pay a per-record fee to a fresh receiving address; once the
//! payment is observed the record is embedded in a null-data output of a
//! transaction funded by that payment, and published records seen on the
//! ledger are reconciled with a record store.
//!
//! ```text
//! intake ──▶ registry ◀── observer ◀── ledger notifications
//!                            │
//!                            ├──▶ store (file descriptors, votes)
//!                            └──▶ assembler ──▶ wallet broadcast
//! ```

// Wire format
pub mod codec;

// Ledger
pub mod chain;

// Pipeline
pub mod intake;
pub mod payments;
pub mod service;
pub mod store;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::schema::PublisherConfig;
pub use lifecycle::Shutdown;
pub use service::{Publisher, RunningPublisher};
