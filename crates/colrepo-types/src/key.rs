use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;
use crate::value::{CqlType, CqlValue};

/// Semantic kind of a primary key.
///
/// The mapping to a native column type is total over the three supported
/// kinds; everything else is rejected before any statement is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// 128-bit identifier, stored as `uuid`.
    Identifier,
    /// UTF-8 string, stored as `varchar`.
    Text,
    /// 64-bit signed integer, stored as `bigint`.
    Integer,
}

impl KeyKind {
    /// Column type used in `CREATE TABLE` for the `id` column.
    pub fn column_type(&self) -> &'static str {
        match self {
            Self::Identifier => "uuid",
            Self::Text => "varchar",
            Self::Integer => "bigint",
        }
    }

    /// The value type a bound key of this kind must carry.
    pub fn cql_type(&self) -> CqlType {
        match self {
            Self::Identifier => CqlType::Uuid,
            Self::Text => CqlType::Text,
            Self::Integer => CqlType::BigInt,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier => write!(f, "identifier"),
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
        }
    }
}

impl FromStr for KeyKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uuid" | "guid" | "identifier" => Ok(Self::Identifier),
            "text" | "varchar" | "string" => Ok(Self::Text),
            "bigint" | "long" | "i64" | "integer" => Ok(Self::Integer),
            _ => Err(TypeError::UnsupportedKeyType(s.to_string())),
        }
    }
}

/// A Rust type usable as a record's primary key.
///
/// Implemented for [`Uuid`], [`String`] and [`i64`].
pub trait RecordKey: Clone + fmt::Debug + Send + Sync + 'static {
    /// The semantic kind of this key type.
    const KIND: KeyKind;

    /// The value bound for the `id` column.
    fn to_cql(&self) -> CqlValue;
}

impl RecordKey for Uuid {
    const KIND: KeyKind = KeyKind::Identifier;

    fn to_cql(&self) -> CqlValue {
        CqlValue::Uuid(*self)
    }
}

impl RecordKey for String {
    const KIND: KeyKind = KeyKind::Text;

    fn to_cql(&self) -> CqlValue {
        CqlValue::Text(self.clone())
    }
}

impl RecordKey for i64 {
    const KIND: KeyKind = KeyKind::Integer;

    fn to_cql(&self) -> CqlValue {
        CqlValue::BigInt(*self)
    }
}
