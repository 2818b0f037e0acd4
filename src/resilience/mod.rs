//! Retry with exponential backoff for transient failures.
//!
//! The policy only decides *how* to retry. Whether an operation may be
//! replayed at all is decided by the caller from the operation's idempotency.

mod retry;

pub use retry::{RetryConfig, RetryPolicy};
