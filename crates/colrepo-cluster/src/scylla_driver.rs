//! ScyllaDB backend.
//!
//! The driver is asynchronous; the repository API is not. A cluster handle
//! owns a multi-thread tokio runtime and every session call blocks on it.
//! Calls must therefore not be made from inside another tokio runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ::scylla::frame::response::result::CqlValue as DriverValue;
use ::scylla::prepared_statement::PreparedStatement as DriverPrepared;
use ::scylla::QueryResult;
use ::scylla::{Session as DriverSession, SessionBuilder};
use colrepo_types::CqlValue;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info, warn};

use crate::cql;
use crate::error::{ClusterError, ClusterResult};
use crate::rows::RowSet;
use crate::traits::{BoundStatement, Cluster, Connector, PreparedStatement, Session};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

fn poisoned<E: std::fmt::Display>(e: E) -> ClusterError {
    ClusterError::Driver(format!("lock poisoned: {e}"))
}

/// Opens [`ScyllaCluster`] handles.
#[derive(Clone, Debug, Default)]
pub struct ScyllaConnector {
    worker_threads: Option<usize>,
}

impl ScyllaConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of runtime worker threads per cluster handle.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads.max(1));
        self
    }
}

impl Connector for ScyllaConnector {
    type Cluster = ScyllaCluster;

    fn open(&self, contact_point: &str) -> ClusterResult<ScyllaCluster> {
        let contact_point = contact_point.trim();
        if contact_point.is_empty() {
            return Err(ClusterError::InvalidContactPoint(contact_point.to_string()));
        }
        let node = if contact_point.contains(':') {
            contact_point.to_string()
        } else {
            format!("{contact_point}:9042")
        };

        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all().thread_name("colrepo-scylla");
        if let Some(threads) = self.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder.build()?;

        info!(%node, "connecting to scylla");
        let session = runtime
            .block_on(SessionBuilder::new().known_node(&node).build())
            .map_err(|e| ClusterError::Unreachable {
                contact_point: contact_point.to_string(),
                reason: e.to_string(),
            })?;

        Ok(ScyllaCluster {
            contact_point: contact_point.to_string(),
            session: Mutex::new(Some(Arc::new(session))),
            runtime: Mutex::new(Some(runtime)),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// A connected driver session pool plus the runtime that drives it.
///
/// The driver pools connections per node internally; [`ScyllaSession`]s
/// are lightweight views sharing that pool.
pub struct ScyllaCluster {
    contact_point: String,
    session: Mutex<Option<Arc<DriverSession>>>,
    runtime: Mutex<Option<Runtime>>,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for ScyllaCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaCluster")
            .field("contact_point", &self.contact_point)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

impl Cluster for ScyllaCluster {
    type Session = ScyllaSession;

    fn connect(&self) -> ClusterResult<ScyllaSession> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClusterError::Shutdown);
        }
        let session = self
            .session
            .lock()
            .map_err(poisoned)?
            .clone()
            .ok_or(ClusterError::Shutdown)?;
        let handle = self
            .runtime
            .lock()
            .map_err(poisoned)?
            .as_ref()
            .map(|rt| rt.handle().clone())
            .ok_or(ClusterError::Shutdown)?;
        Ok(ScyllaSession {
            session,
            handle,
            closed: Arc::clone(&self.closed),
        })
    }

    fn shutdown(&self) -> ClusterResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let session = self.session.lock().map_err(poisoned)?.take();
        let runtime = self.runtime.lock().map_err(poisoned)?.take();
        if let Some(runtime) = runtime {
            // The driver's background tasks must be dropped inside the runtime.
            runtime.block_on(async move { drop(session) });
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
        info!(contact_point = %self.contact_point, "scylla cluster shut down");
        Ok(())
    }
}

impl Drop for ScyllaCluster {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "scylla cluster shutdown on drop failed");
        }
    }
}

/// A session view on a [`ScyllaCluster`].
pub struct ScyllaSession {
    session: Arc<DriverSession>,
    handle: Handle,
    closed: Arc<AtomicBool>,
}

impl ScyllaSession {
    fn ensure_open(&self) -> ClusterResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(ClusterError::Shutdown)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for ScyllaSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScyllaSession").finish_non_exhaustive()
    }
}

impl Session for ScyllaSession {
    type Prepared = ScyllaPrepared;

    fn execute(&self, cql: &str) -> ClusterResult<RowSet> {
        self.ensure_open()?;
        debug!(cql, "execute");
        let result = self
            .handle
            .block_on(self.session.query_unpaged(cql, ()))
            .map_err(|e| ClusterError::Execution(e.to_string()))?;
        to_row_set(result)
    }

    fn prepare(&self, cql: &str) -> ClusterResult<ScyllaPrepared> {
        self.ensure_open()?;
        let statement = self
            .handle
            .block_on(self.session.prepare(cql))
            .map_err(|e| ClusterError::InvalidQuery(e.to_string()))?;
        let markers = statement.get_variable_col_specs().len();
        // Only used to name the columns of an empty result.
        let columns = cql::parse(cql)
            .map(|s| s.result_columns())
            .unwrap_or_default();
        Ok(ScyllaPrepared {
            statement,
            cql: cql.to_string(),
            markers,
            columns,
        })
    }

    fn execute_bound(&self, statement: &BoundStatement<'_, ScyllaPrepared>) -> ClusterResult<RowSet> {
        self.ensure_open()?;
        let prepared = statement.prepared();
        let values: Vec<DriverValue> = statement.values().iter().map(to_driver).collect();
        let result = self
            .handle
            .block_on(self.session.execute_unpaged(&prepared.statement, values))
            .map_err(|e| ClusterError::Execution(e.to_string()))?;
        Ok(with_known_columns(to_row_set(result)?, &prepared.columns))
    }
}

/// A statement prepared by the cluster.
#[derive(Clone, Debug)]
pub struct ScyllaPrepared {
    statement: DriverPrepared,
    cql: String,
    markers: usize,
    columns: Vec<String>,
}

impl PreparedStatement for ScyllaPrepared {
    fn cql(&self) -> &str {
        &self.cql
    }

    fn marker_count(&self) -> usize {
        self.markers
    }
}

fn to_driver(value: &CqlValue) -> DriverValue {
    match value {
        CqlValue::Uuid(u) => DriverValue::Uuid(*u),
        CqlValue::Text(s) => DriverValue::Text(s.clone()),
        CqlValue::BigInt(n) => DriverValue::BigInt(*n),
    }
}

fn from_driver(column: &str, value: DriverValue) -> ClusterResult<CqlValue> {
    match value {
        DriverValue::Text(s) | DriverValue::Ascii(s) => Ok(CqlValue::Text(s)),
        DriverValue::Uuid(u) => Ok(CqlValue::Uuid(u)),
        DriverValue::BigInt(n) => Ok(CqlValue::BigInt(n)),
        DriverValue::Int(n) => Ok(CqlValue::BigInt(i64::from(n))),
        other => Err(ClusterError::Driver(format!(
            "column {column}: unsupported value {other:?}"
        ))),
    }
}

/// An empty result may come back without column metadata; name its
/// columns from the statement text instead.
fn with_known_columns(rows: RowSet, columns: &[String]) -> RowSet {
    if rows.columns().is_empty() && !columns.is_empty() {
        RowSet::new(columns.to_vec(), Vec::new())
    } else {
        rows
    }
}

fn to_row_set(result: QueryResult) -> ClusterResult<RowSet> {
    let columns: Vec<String> = result.col_specs().iter().map(|spec| spec.name.clone()).collect();
    let mut rows = Vec::new();
    for row in result.rows_or_empty() {
        let values = row
            .columns
            .into_iter()
            .zip(&columns)
            .map(|(value, column)| value.map(|v| from_driver(column, v)).transpose())
            .collect::<ClusterResult<Vec<_>>>()?;
        rows.push(values);
    }
    Ok(RowSet::new(columns, rows))
}
