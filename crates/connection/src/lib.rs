//! Meridian Connection Manager
//!
//! Exclusive owner of the single terminal session. Every terminal call in
//! the system happens inside a `ConnectionGuard` obtained from
//! [`ConnectionManager::acquire`], which serializes concurrent callers on one
//! coarse mutex. The terminal side is assumed non-reentrant, so correctness
//! over throughput is the explicit design choice here.

pub mod error;
pub mod manager;

pub use error::ConnectionError;
pub use manager::{ConnectionGuard, ConnectionManager, ConnectionState, RetryPolicy};
