//! Payment observation and pending submission tracking.
//!
//! # Data Flow
//! ```text
//! ObservedTransaction (mpsc)
//!     → observer.rs (per output: payment or record)
//!         → registry.rs (credit funding, claim funded submissions)
//!         → processor.rs (reconcile records with the store)
//!     → one spawned assembly per funded submission
//! ```

pub mod observer;
pub mod processor;
pub mod registry;
pub mod types;

pub use observer::{PassReport, PaymentObserver};
pub use processor::{process_record, RecordTransition};
pub use registry::{
    run_sweeper, FundedSubmission, PaymentOutcome, PendingRegistry, RegistryError, UserEntry,
};
pub use types::{unix_now, ObservedOutput, ObservedTransaction};
