use colrepo_cluster::ClusterError;
use colrepo_codec::CodecError;
use colrepo_types::{KeyKind, TypeError};
use thiserror::Error;

/// Errors surfaced by the repository. Failures from the cluster and codec
/// layers are carried unchanged as the source.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("table {table} is keyed by {schema}, repository key is {repository}")]
    KeyKindMismatch {
        table: String,
        schema: KeyKind,
        repository: KeyKind,
    },

    #[error("cannot connect to cluster: {0}")]
    Connection(#[source] ClusterError),

    #[error("schema bootstrap failed on `{statement}`: {source}")]
    SchemaBootstrap {
        statement: String,
        #[source]
        source: ClusterError,
    },

    #[error("{operation} failed: {source}")]
    StatementExecution {
        operation: &'static str,
        #[source]
        source: ClusterError,
    },

    #[error("cannot encode value: {0}")]
    Serialization(#[source] CodecError),

    #[error("cannot decode stored document: {0}")]
    Deserialization(#[source] CodecError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<TypeError> for RepoError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::UnsupportedKeyType(name) => RepoError::UnsupportedKeyType(name),
            TypeError::InvalidIdentifier { name, reason } => RepoError::InvalidName { name, reason },
            other @ TypeError::UnsupportedColumnType(_) => RepoError::Config(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
