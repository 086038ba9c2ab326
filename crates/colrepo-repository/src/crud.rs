//! CRUD executor.
//!
//! Each operation prepares its statement on the given session, binds the
//! values and executes it. Failures propagate immediately; nothing is
//! retried or rolled back.

use colrepo_cluster::{PreparedStatement, RowSet, Session};
use colrepo_codec::JsonCodec;
use colrepo_types::{CqlValue, Entity, RecordKey};
use tracing::debug;

use crate::error::{RepoError, RepoResult};

/// Name of the document column.
pub const JSON_COLUMN: &str = "json";

/// The statement texts for one table, built once per repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Statements {
    save: String,
    get: String,
    delete: String,
    delete_all: String,
    get_all: String,
}

impl Statements {
    /// Both names must already be validated.
    pub fn new(keyspace: &str, table: &str) -> Self {
        let target = format!("{keyspace}.{table}");
        Self {
            save: format!("UPDATE {target} SET json = ? WHERE id = ?;"),
            get: format!("SELECT json FROM {target} WHERE id = ?;"),
            delete: format!("DELETE FROM {target} WHERE id = ?;"),
            delete_all: format!("TRUNCATE {target};"),
            get_all: format!("SELECT json FROM {target};"),
        }
    }

    pub fn save(&self) -> &str {
        &self.save
    }

    pub fn get(&self) -> &str {
        &self.get
    }

    pub fn delete(&self) -> &str {
        &self.delete
    }

    pub fn delete_all(&self) -> &str {
        &self.delete_all
    }

    pub fn get_all(&self) -> &str {
        &self.get_all
    }
}

fn run<S: Session>(
    session: &S,
    operation: &'static str,
    cql: &str,
    values: Vec<CqlValue>,
) -> RepoResult<RowSet> {
    debug!(operation, cql, "executing statement");
    let failed = |source| RepoError::StatementExecution { operation, source };
    let prepared = session.prepare(cql).map_err(failed)?;
    let bound = prepared.bind(values).map_err(failed)?;
    session.execute_bound(&bound).map_err(failed)
}

/// Decode the document column of one row.
pub(crate) fn decode_row<V: Entity>(
    codec: &JsonCodec,
    row: &colrepo_cluster::Row,
) -> RepoResult<V> {
    let document = row
        .get_text(JSON_COLUMN)
        .map_err(|source| RepoError::StatementExecution {
            operation: "read document",
            source,
        })?;
    codec.decode(document).map_err(RepoError::Deserialization)
}

/// Upsert `value` under `key`.
pub fn save<S: Session, K: RecordKey, V: Entity>(
    session: &S,
    statements: &Statements,
    codec: &JsonCodec,
    key: &K,
    value: &V,
) -> RepoResult<()> {
    let document = codec.encode(value).map_err(RepoError::Serialization)?;
    run(session, "save", statements.save(), vec![CqlValue::Text(document), key.to_cql()])?;
    Ok(())
}

/// Fetch the value stored under `key`, `None` when there is none.
pub fn get<S: Session, K: RecordKey, V: Entity>(
    session: &S,
    statements: &Statements,
    codec: &JsonCodec,
    key: &K,
) -> RepoResult<Option<V>> {
    let rows = run(session, "get", statements.get(), vec![key.to_cql()])?;
    rows.first().map(|row| decode_row(codec, row)).transpose()
}

/// Remove the row under `key`. Absent keys are not an error.
pub fn delete<S: Session, K: RecordKey>(session: &S, statements: &Statements, key: &K) -> RepoResult<()> {
    run(session, "delete", statements.delete(), vec![key.to_cql()])?;
    Ok(())
}

/// Truncate the table.
pub fn delete_all<S: Session>(session: &S, statements: &Statements) -> RepoResult<()> {
    run(session, "delete all", statements.delete_all(), Vec::new())?;
    Ok(())
}

/// Fetch every row of the table, undecoded.
pub fn fetch_all<S: Session>(session: &S, statements: &Statements) -> RepoResult<RowSet> {
    run(session, "get all", statements.get_all(), Vec::new())
}
