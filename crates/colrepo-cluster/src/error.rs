use colrepo_types::CqlType;

/// Errors from the cluster layer.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The contact point could not be parsed or is empty.
    #[error("invalid contact point: {0:?}")]
    InvalidContactPoint(String),

    /// No node answered at the contact point.
    #[error("cannot reach {contact_point}: {reason}")]
    Unreachable { contact_point: String, reason: String },

    /// The statement text could not be parsed.
    #[error("syntax error in {cql:?}: {reason}")]
    Syntax { cql: String, reason: String },

    /// The statement is well formed but refers to something that does not
    /// exist or is not allowed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A keyspace or table already exists and `IF NOT EXISTS` was not given.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Wrong number of bound values for a prepared statement.
    #[error("statement expects {expected} bound values, got {actual}")]
    BindArity { expected: usize, actual: usize },

    /// A bound value does not fit its column.
    #[error("column {column} expects {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: CqlType,
        actual: CqlType,
    },

    /// A row does not carry the requested column.
    #[error("column {0} is not present in the row")]
    MissingColumn(String),

    /// A row value has a different type than requested.
    #[error("column {column} is not {expected}")]
    UnexpectedColumnType { column: String, expected: CqlType },

    /// The statement failed while executing on the cluster.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Any other failure reported by the driver.
    #[error("driver error: {0}")]
    Driver(String),

    /// The cluster handle has been shut down.
    #[error("cluster has been shut down")]
    Shutdown,

    /// I/O error while setting up the driver.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;
