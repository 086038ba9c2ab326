//! The driver traits the repository consumes.
//!
//! Any backend (in-memory, ScyllaDB, Cassandra) implements these to give the
//! repository its cluster handle and sessions.

use colrepo_types::CqlValue;

use crate::error::{ClusterError, ClusterResult};
use crate::rows::RowSet;

/// Opens cluster handles.
pub trait Connector: Send + Sync {
    type Cluster: Cluster;

    /// Build a cluster handle from a single contact point used for initial
    /// node discovery.
    fn open(&self, contact_point: &str) -> ClusterResult<Self::Cluster>;
}

/// A long-lived handle to the cluster.
///
/// The handle is safe to share across threads; it is the source of new
/// sessions, not a mutable resource itself.
pub trait Cluster: Send + Sync {
    type Session: Session;

    /// Open a new, independent session. The caller owns it; dropping it
    /// closes it.
    fn connect(&self) -> ClusterResult<Self::Session>;

    /// Request a graceful shutdown and release local resources.
    ///
    /// Connecting after shutdown fails with [`ClusterError::Shutdown`].
    /// Calling it again is a no-op.
    fn shutdown(&self) -> ClusterResult<()>;
}

/// A short-lived execution context.
///
/// A session is exclusively owned by the logical operation that opened it;
/// it is not meant to be driven by several callers at once.
pub trait Session: Send {
    type Prepared: PreparedStatement;

    /// Execute an unprepared statement that takes no bound values.
    fn execute(&self, cql: &str) -> ClusterResult<RowSet>;

    /// Compile a parameterized statement.
    fn prepare(&self, cql: &str) -> ClusterResult<Self::Prepared>;

    /// Execute a prepared statement with its bound values.
    fn execute_bound(&self, statement: &BoundStatement<'_, Self::Prepared>)
        -> ClusterResult<RowSet>;
}

/// A statement compiled by the store, executed with different bound values.
pub trait PreparedStatement: Sized {
    /// The statement text this was prepared from.
    fn cql(&self) -> &str;

    /// Number of `?` bind markers.
    fn marker_count(&self) -> usize;

    /// Bind values in marker order.
    fn bind(&self, values: Vec<CqlValue>) -> ClusterResult<BoundStatement<'_, Self>> {
        if values.len() != self.marker_count() {
            return Err(ClusterError::BindArity {
                expected: self.marker_count(),
                actual: values.len(),
            });
        }
        Ok(BoundStatement {
            prepared: self,
            values,
        })
    }
}

/// A prepared statement together with the values bound to its markers.
#[derive(Debug)]
pub struct BoundStatement<'a, P> {
    prepared: &'a P,
    values: Vec<CqlValue>,
}

impl<'a, P: PreparedStatement> BoundStatement<'a, P> {
    pub fn prepared(&self) -> &'a P {
        self.prepared
    }

    pub fn values(&self) -> &[CqlValue] {
        &self.values
    }
}
