//! Lifecycle management.
//!
//! The sweep task and the notification loop subscribe to one shutdown
//! broadcast; in-flight assembly tasks are not cancelled.

pub mod shutdown;

pub use shutdown::Shutdown;
