//! Foundation types for colrepo.
//!
//! colrepo persists typed values as JSON documents in a wide-column store,
//! one table per value type, keyed by a single primary key. This crate holds
//! the vocabulary every other colrepo crate shares.
//!
//! # Key Types
//!
//! - [`KeyKind`]: semantic kind of a primary key and its native column type
//! - [`RecordKey`]: implemented by the Rust types usable as keys
//! - [`CqlValue`] / [`CqlType`]: values bound to and read from statements
//! - [`TableSchema`]: table name plus key kind for one value type
//! - [`Entity`]: a value type that can be stored as a document

pub mod entity;
pub mod error;
pub mod key;
pub mod schema;
pub mod value;

pub use entity::Entity;
pub use error::TypeError;
pub use key::{KeyKind, RecordKey};
pub use schema::{validate_identifier, TableSchema, MAX_IDENTIFIER_LEN};
pub use value::{CqlType, CqlValue};
