//! Schema bootstrap: the keyspace and the per-type table.
//!
//! Both statements use `IF NOT EXISTS`, so constructing repositories
//! repeatedly, or from several processes at once, never fails on existing
//! schema. Existing tables are never altered.

use colrepo_cluster::Session;
use colrepo_types::TableSchema;
use tracing::{debug, info};

use crate::error::{RepoError, RepoResult};

/// Replication factor of every keyspace created by this crate.
pub const REPLICATION_FACTOR: u32 = 2;

pub fn create_keyspace_cql(keyspace: &str) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH replication = \
         {{'class':'SimpleStrategy', 'replication_factor':{REPLICATION_FACTOR}}};"
    )
}

pub fn create_table_cql(keyspace: &str, schema: &TableSchema) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {keyspace}.{} (id {} PRIMARY KEY, json text);",
        schema.table(),
        schema.key_kind().column_type()
    )
}

/// Create the keyspace and the table if they do not exist yet.
///
/// Names must already be validated.
pub fn ensure_schema<S: Session>(session: &S, keyspace: &str, schema: &TableSchema) -> RepoResult<()> {
    for statement in [create_keyspace_cql(keyspace), create_table_cql(keyspace, schema)] {
        debug!(keyspace, table = schema.table(), cql = %statement, "bootstrap statement");
        if let Err(source) = session.execute(&statement) {
            return Err(RepoError::SchemaBootstrap { statement, source });
        }
    }
    info!(keyspace, table = schema.table(), key = %schema.key_kind(), "schema ready");
    Ok(())
}
