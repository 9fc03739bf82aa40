//! Meridian Sandbox Executor
//!
//! Scripts give agents a way to compose several reads and transforms in one
//! round trip. The language is deliberately tiny - assignments and calls,
//! nothing else - and every call resolves to a builtin, a registered
//! indicator, or an allowlisted gateway operation. A denylist scan rejects
//! hostile vocabulary before the parser runs, and the script's result is
//! taken from a named binding (`result`, `data`, `output` or `res`), never
//! from a dangling expression.

pub mod error;
pub mod executor;
pub mod parse;
pub mod scan;
pub mod value;

pub use error::ExecError;
pub use executor::{ExecutorConfig, SandboxExecutor, ScriptOutcome};
pub use value::Value;
