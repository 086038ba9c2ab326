//! Cluster connection layer for colrepo.
//!
//! The repository talks to a wide-column cluster through three traits:
//!
//! - [`Connector`]: opens a long-lived [`Cluster`] handle from one contact point
//! - [`Cluster`]: hands out short-lived [`Session`]s and is shut down once
//! - [`Session`]: prepares, binds and executes CQL statements
//!
//! A session is released when it is dropped, so scoping a session to a block
//! guarantees release on every exit path, including `?` returns.
//!
//! # Backends
//!
//! - [`InMemoryBackend`]: shared in-process store for tests and embedding
//! - `ScyllaConnector`: the ScyllaDB driver (also speaks to Cassandra),
//!   behind the `scylla` feature
//!
//! # Modules
//!
//! - [`cql`]: tokenizer and parser for the statement shapes colrepo issues
//! - [`rows`]: [`RowSet`] and [`Row`]
//! - [`traits`]: the driver traits and [`BoundStatement`]

pub mod cql;
pub mod error;
pub mod memory;
pub mod rows;
#[cfg(feature = "scylla")]
pub mod scylla_driver;
pub mod traits;

pub use error::{ClusterError, ClusterResult};
pub use memory::{InMemoryBackend, InMemoryCluster, InMemoryPrepared, InMemorySession};
pub use rows::{Row, RowSet};
#[cfg(feature = "scylla")]
pub use scylla_driver::{ScyllaCluster, ScyllaConnector, ScyllaPrepared, ScyllaSession};
pub use traits::{BoundStatement, Cluster, Connector, PreparedStatement, Session};
