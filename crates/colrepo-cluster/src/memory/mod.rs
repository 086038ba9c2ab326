//! In-memory cluster for tests and embedding.
//!
//! [`InMemoryBackend`] plays the part of the storage nodes: every cluster
//! handle opened from it (or from a clone of it) sees the same keyspaces,
//! tables and rows, so a repository reopened against the same backend reads
//! what an earlier one wrote. Data is lost when the last clone is dropped.
//!
//! Statements are parsed with [`crate::cql`] and executed with the store's
//! semantics: updates upsert, deletes of absent keys are silent, bound
//! values are type-checked against their columns, and full scans come back
//! in no particular order.

mod catalog;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use colrepo_types::{CqlType, CqlValue};
use tracing::debug;

use crate::cql::{self, Statement};
use crate::error::{ClusterError, ClusterResult};
use crate::rows::RowSet;
use crate::traits::{BoundStatement, Cluster, Connector, PreparedStatement, Session};

use catalog::Catalog;

struct Fault {
    fragment: String,
    message: String,
}

#[derive(Default)]
struct BackendInner {
    catalog: RwLock<Catalog>,
    unreachable: AtomicBool,
    faults: Mutex<Vec<Fault>>,
    open_count: AtomicUsize,
    sessions_opened: AtomicUsize,
    open_sessions: AtomicUsize,
    statements_executed: AtomicUsize,
}

impl BackendInner {
    fn take_fault(&self, cql: &str) -> ClusterResult<Option<String>> {
        let mut faults = self.faults.lock().map_err(poisoned)?;
        let cql = cql.to_ascii_lowercase();
        let pos = faults
            .iter()
            .position(|f| cql.contains(&f.fragment));
        Ok(pos.map(|i| faults.remove(i).message))
    }

    fn run(&self, statement: &Statement, values: &[CqlValue], cql: &str) -> ClusterResult<RowSet> {
        if let Some(message) = self.take_fault(cql)? {
            debug!(cql, "injected failure");
            return Err(ClusterError::Execution(message));
        }
        self.statements_executed.fetch_add(1, Ordering::SeqCst);
        match statement {
            Statement::Select { .. } => self.catalog.read().map_err(poisoned)?.query(statement, values),
            _ => self.catalog.write().map_err(poisoned)?.apply(statement, values),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> ClusterError {
    ClusterError::Driver(format!("lock poisoned: {e}"))
}

/// Shared in-process storage that cluster handles are opened against.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<BackendInner>,
}

impl InMemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `open` calls fail as if no node answered.
    pub fn set_reachable(&self, reachable: bool) {
        self.inner.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Fail the next executed statement whose text contains `fragment`
    /// (compared case-insensitively) with [`ClusterError::Execution`].
    pub fn fail_next_matching(&self, fragment: &str, message: &str) {
        let fault = Fault {
            fragment: fragment.to_ascii_lowercase(),
            message: message.to_string(),
        };
        match self.inner.faults.lock() {
            Ok(mut faults) => faults.push(fault),
            Err(poisoned) => poisoned.into_inner().push(fault),
        }
    }

    /// Number of `open` calls made against this backend.
    pub fn open_count(&self) -> usize {
        self.inner.open_count.load(Ordering::SeqCst)
    }

    /// Number of sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.inner.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.inner.open_sessions.load(Ordering::SeqCst)
    }

    /// Number of statements executed (failed injections excluded).
    pub fn statements_executed(&self) -> usize {
        self.inner.statements_executed.load(Ordering::SeqCst)
    }

    /// Replication options of a keyspace. Names fold to lower case, as
    /// unquoted identifiers do.
    pub fn keyspace_replication(&self, keyspace: &str) -> Option<BTreeMap<String, String>> {
        let catalog = self.inner.catalog.read().ok()?;
        catalog.replication(&keyspace.to_lowercase())
    }

    /// Column names and types of a table, in declaration order.
    pub fn table_columns(&self, keyspace: &str, table: &str) -> Option<Vec<(String, CqlType)>> {
        let catalog = self.inner.catalog.read().ok()?;
        let data = catalog.table(&keyspace.to_lowercase(), &table.to_lowercase())?;
        Some(data.columns().to_vec())
    }

    /// Primary key column of a table.
    pub fn primary_key(&self, keyspace: &str, table: &str) -> Option<String> {
        let catalog = self.inner.catalog.read().ok()?;
        let data = catalog.table(&keyspace.to_lowercase(), &table.to_lowercase())?;
        Some(data.primary_key().to_string())
    }

    /// Number of rows in a table.
    pub fn row_count(&self, keyspace: &str, table: &str) -> Option<usize> {
        let catalog = self.inner.catalog.read().ok()?;
        let data = catalog.table(&keyspace.to_lowercase(), &table.to_lowercase())?;
        Some(data.len())
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("open_count", &self.open_count())
            .field("open_sessions", &self.open_sessions())
            .finish()
    }
}

impl Connector for InMemoryBackend {
    type Cluster = InMemoryCluster;

    fn open(&self, contact_point: &str) -> ClusterResult<InMemoryCluster> {
        self.inner.open_count.fetch_add(1, Ordering::SeqCst);
        let contact_point = contact_point.trim();
        if contact_point.is_empty() {
            return Err(ClusterError::InvalidContactPoint(contact_point.to_string()));
        }
        if self.inner.unreachable.load(Ordering::SeqCst) {
            return Err(ClusterError::Unreachable {
                contact_point: contact_point.to_string(),
                reason: "no node answered".into(),
            });
        }
        debug!(contact_point, "in-memory cluster opened");
        Ok(InMemoryCluster {
            inner: Arc::clone(&self.inner),
            contact_point: contact_point.to_string(),
            shut_down: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Cluster handle onto an [`InMemoryBackend`].
pub struct InMemoryCluster {
    inner: Arc<BackendInner>,
    contact_point: String,
    shut_down: Arc<AtomicBool>,
}

impl InMemoryCluster {
    pub fn contact_point(&self) -> &str {
        &self.contact_point
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for InMemoryCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCluster")
            .field("contact_point", &self.contact_point)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

impl Cluster for InMemoryCluster {
    type Session = InMemorySession;

    fn connect(&self) -> ClusterResult<InMemorySession> {
        if self.is_shut_down() {
            return Err(ClusterError::Shutdown);
        }
        self.inner.sessions_opened.fetch_add(1, Ordering::SeqCst);
        self.inner.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(InMemorySession {
            inner: Arc::clone(&self.inner),
            shut_down: Arc::clone(&self.shut_down),
        })
    }

    fn shutdown(&self) -> ClusterResult<()> {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            debug!(contact_point = %self.contact_point, "in-memory cluster shut down");
        }
        Ok(())
    }
}

/// A session on an [`InMemoryCluster`]. Closed when dropped.
pub struct InMemorySession {
    inner: Arc<BackendInner>,
    shut_down: Arc<AtomicBool>,
}

impl InMemorySession {
    fn ensure_open(&self) -> ClusterResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            Err(ClusterError::Shutdown)
        } else {
            Ok(())
        }
    }
}

impl Drop for InMemorySession {
    fn drop(&mut self) {
        self.inner.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for InMemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySession").finish_non_exhaustive()
    }
}

impl Session for InMemorySession {
    type Prepared = InMemoryPrepared;

    fn execute(&self, cql: &str) -> ClusterResult<RowSet> {
        self.ensure_open()?;
        let statement = cql::parse(cql)?;
        if statement.marker_count() != 0 {
            return Err(ClusterError::BindArity {
                expected: statement.marker_count(),
                actual: 0,
            });
        }
        self.inner.run(&statement, &[], cql)
    }

    fn prepare(&self, cql: &str) -> ClusterResult<InMemoryPrepared> {
        self.ensure_open()?;
        let statement = cql::parse(cql)?;
        self.inner
            .catalog
            .read()
            .map_err(poisoned)?
            .validate(&statement)?;
        Ok(InMemoryPrepared {
            cql: cql.to_string(),
            statement: Arc::new(statement),
        })
    }

    fn execute_bound(&self, statement: &BoundStatement<'_, InMemoryPrepared>) -> ClusterResult<RowSet> {
        self.ensure_open()?;
        let prepared = statement.prepared();
        self.inner
            .run(&prepared.statement, statement.values(), &prepared.cql)
    }
}

/// A statement prepared on an [`InMemorySession`].
#[derive(Clone, Debug)]
pub struct InMemoryPrepared {
    cql: String,
    statement: Arc<Statement>,
}

impl PreparedStatement for InMemoryPrepared {
    fn cql(&self) -> &str {
        &self.cql
    }

    fn marker_count(&self) -> usize {
        self.statement.marker_count()
    }
}
