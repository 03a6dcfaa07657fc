//! Submission intake: price a record and reserve a receiving address.

pub mod engine;
pub mod types;

pub use engine::{required_amount, SubmissionIntake};
pub use types::{PaymentRequest, SubmissionError};
