//! Keyspace and table identifiers, and the per-type table schema.
//!
//! Valid identifiers:
//! - Must be non-empty and at most [`MAX_IDENTIFIER_LEN`] characters
//! - Must start with an ASCII letter
//! - May contain only ASCII letters, digits and `_`
//!
//! Statements are assembled by formatting these names into CQL text, so a
//! name is validated before it ever reaches a statement.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::TypeError;
use crate::key::{KeyKind, RecordKey};

/// Longest keyspace or table name the store accepts.
pub const MAX_IDENTIFIER_LEN: usize = 48;

/// Validate a keyspace or table name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use colrepo_types::validate_identifier;
///
/// assert!(validate_identifier("SampleObject").is_ok());
/// assert!(validate_identifier("ks_2").is_ok());
/// assert!(validate_identifier("").is_err());
/// assert!(validate_identifier("drop table;").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<(), TypeError> {
    let invalid = |reason: &str| TypeError::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if !first.is_ascii_alphabetic() {
        return Err(invalid("must start with an ASCII letter"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(&format!(
            "longer than {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// Storage schema for one value type: the table name and the kind of its
/// primary key. The table always has the shape `(id <key>, json text)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableSchema {
    table: String,
    key_kind: KeyKind,
}

impl TableSchema {
    /// Build an explicit schema, validating the table name.
    pub fn new(table: impl Into<String>, key_kind: KeyKind) -> Result<Self, TypeError> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self { table, key_kind })
    }

    /// Derive the schema of an entity stored under keys of type `K`.
    ///
    /// The table is named after the entity's bare type name, without
    /// pluralization; two entities sharing a name share a table.
    pub fn for_entity<K: RecordKey, V: Entity>() -> Result<Self, TypeError> {
        Self::new(V::TABLE_NAME, K::KIND)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_kind(&self) -> KeyKind {
        self.key_kind
    }
}
