use std::path::Path;

use colrepo_codec::{JsonCodec, SerializerMode};
use colrepo_types::validate_identifier;
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Construction parameters of a repository.
///
/// Loadable from TOML; missing fields take their defaults:
///
/// ```toml
/// contact_point = "10.0.0.5:9042"
/// keyspace = "inventory"
/// serializer = "typed"
/// indent = true
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Address of one cluster node, used for initial discovery.
    pub contact_point: String,
    /// Keyspace holding every table of this deployment.
    pub keyspace: String,
    pub serializer: SerializerMode,
    /// Write indented documents.
    pub indent: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            contact_point: "127.0.0.1:9042".into(),
            keyspace: "colrepo".into(),
            serializer: SerializerMode::Plain,
            indent: false,
        }
    }
}

impl RepositoryConfig {
    pub fn new(contact_point: impl Into<String>, keyspace: impl Into<String>) -> Self {
        Self {
            contact_point: contact_point.into(),
            keyspace: keyspace.into(),
            ..Self::default()
        }
    }

    pub fn with_contact_point(mut self, contact_point: impl Into<String>) -> Self {
        self.contact_point = contact_point.into();
        self
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = keyspace.into();
        self
    }

    pub fn with_serializer(mut self, serializer: SerializerMode) -> Self {
        self.serializer = serializer;
        self
    }

    pub fn with_indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// The document codec these settings describe.
    pub fn codec(&self) -> JsonCodec {
        JsonCodec::new(self.serializer).with_indent(self.indent)
    }

    /// Check the settings without touching the network.
    pub fn validate(&self) -> RepoResult<()> {
        if self.contact_point.trim().is_empty() {
            return Err(RepoError::Config("contact_point must not be empty".into()));
        }
        validate_identifier(&self.keyspace)?;
        Ok(())
    }

    pub fn from_toml_str(text: &str) -> RepoResult<Self> {
        toml::from_str(text).map_err(|e| RepoError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> RepoResult<String> {
        toml::to_string(self).map_err(|e| RepoError::Config(e.to_string()))
    }

    /// Read settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RepoError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}
