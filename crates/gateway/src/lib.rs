//! Meridian Operation Gateway
//!
//! The typed façade between untrusted, loosely-typed agent requests and the
//! terminal. A fixed capability registry declares every permitted read-only
//! operation with its parameter schema; the gateway validates and corrects a
//! request against it (and against the live symbol catalog), then dispatches
//! exactly one terminal call through the connection manager's guarded scope.
//!
//! Validation is strictly ordered and short-circuits on first failure:
//! operation -> symbol -> parameter schema -> volume constraints -> dispatch.
//! Nothing before the dispatch step touches the connection.

pub mod catalog;
pub mod coerce;
pub mod error;
pub mod invoke;
pub mod registry;

pub use catalog::SymbolCatalog;
pub use error::GatewayError;
pub use invoke::{Invocation, OperationGateway, OperationOutput, StructuredRequest};
pub use registry::{
    Capability, CapabilitySpec, ParamKind, ParamSpec, ParamValue, Registry, ResultShape,
};
