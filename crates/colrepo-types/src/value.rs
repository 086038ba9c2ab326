use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Native column types understood by colrepo tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CqlType {
    /// 128-bit identifier (`uuid`).
    Uuid,
    /// UTF-8 text (`text`, alias `varchar`).
    Text,
    /// 64-bit signed integer (`bigint`).
    BigInt,
}

impl CqlType {
    /// Canonical CQL spelling of this type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uuid => "uuid",
            Self::Text => "text",
            Self::BigInt => "bigint",
        }
    }
}

impl fmt::Display for CqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CqlType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uuid" => Ok(Self::Uuid),
            "text" | "varchar" => Ok(Self::Text),
            "bigint" => Ok(Self::BigInt),
            _ => Err(TypeError::UnsupportedColumnType(s.to_string())),
        }
    }
}

/// A single value bound to, or read back from, a statement.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CqlValue {
    Uuid(Uuid),
    Text(String),
    BigInt(i64),
}

impl CqlValue {
    /// The column type this value can be stored in.
    pub fn cql_type(&self) -> CqlType {
        match self {
            Self::Uuid(_) => CqlType::Uuid,
            Self::Text(_) => CqlType::Text,
            Self::BigInt(_) => CqlType::BigInt,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<i64> {
        match self {
            Self::BigInt(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for CqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::BigInt(i) => write!(f, "{i}"),
        }
    }
}

impl From<Uuid> for CqlValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<String> for CqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for CqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for CqlValue {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}
