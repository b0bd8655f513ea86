//! Typed value coercion and row projection for SQL results in the Runar ecosystem.
//!
//! # Intention
//!
//! - Turn raw database and JSON values into typed Rust values through one
//!   dispatcher ([`parse`]) and back into canonical text ([`serialize`]).
//! - Project result-set rows onto record types, resolving the column mapping
//!   once per result set ([`RowShape`]).
//! - Bind typed parameters and read typed rows over SQLite ([`sqlite`]).
//!
//! # Architectural Boundaries
//!
//! - SQL text is executed by the driver, never interpreted here.
//! - No connection pooling, transactions or service wiring.
//! - Coercion is pure: no I/O, no logging, no global mutable state.

pub mod coerce;
pub mod error;
pub mod format;
pub mod record;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod value;

pub use coerce::{parse, parse_or_default, serialize, FromValue, Json, SqlEnum, ToValue};
pub use error::{Error, ErrorKind, Result};
pub use record::{init_shape, project_row, Property, Record, RowShape};
#[cfg(feature = "sqlite")]
pub use sqlite::{ConnectionExt, Params, SqlQuery};
pub use value::{Kind, Value};

#[doc(hidden)]
pub use serde_json;
