//! Keyspaces, tables and rows of the in-memory cluster, and the execution of
//! parsed statements against them.

use std::collections::{BTreeMap, HashMap};

use colrepo_types::{CqlType, CqlValue};

use crate::cql::{QualifiedName, Selection, Statement};
use crate::error::{ClusterError, ClusterResult};
use crate::rows::RowSet;

#[derive(Debug, Default)]
pub(crate) struct Catalog {
    keyspaces: HashMap<String, KeyspaceData>,
}

#[derive(Debug)]
struct KeyspaceData {
    replication: BTreeMap<String, String>,
    tables: HashMap<String, TableData>,
}

#[derive(Debug)]
pub(crate) struct TableData {
    columns: Vec<(String, CqlType)>,
    primary_key: String,
    rows: HashMap<CqlValue, HashMap<String, CqlValue>>,
}

impl TableData {
    pub(crate) fn columns(&self) -> &[(String, CqlType)] {
        &self.columns
    }

    pub(crate) fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    fn column_type(&self, column: &str) -> ClusterResult<CqlType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| *ty)
            .ok_or_else(|| ClusterError::InvalidQuery(format!("undefined column name {column}")))
    }

    fn check_key_column(&self, column: &str) -> ClusterResult<()> {
        if column == self.primary_key {
            Ok(())
        } else {
            Err(ClusterError::InvalidQuery(format!(
                "{column} is not the primary key column"
            )))
        }
    }

    fn checked(&self, column: &str, value: &CqlValue) -> ClusterResult<CqlValue> {
        let expected = self.column_type(column)?;
        if value.cql_type() != expected {
            return Err(ClusterError::TypeMismatch {
                column: column.to_string(),
                expected,
                actual: value.cql_type(),
            });
        }
        Ok(value.clone())
    }

    fn project(&self, selection: &Selection) -> ClusterResult<Vec<String>> {
        match selection {
            Selection::All => Ok(self.columns.iter().map(|(n, _)| n.clone()).collect()),
            Selection::Columns(cols) => {
                for col in cols {
                    self.column_type(col)?;
                }
                Ok(cols.clone())
            }
        }
    }

    fn row_values(
        &self,
        key: &CqlValue,
        cells: &HashMap<String, CqlValue>,
        columns: &[String],
    ) -> Vec<Option<CqlValue>> {
        columns
            .iter()
            .map(|col| {
                if *col == self.primary_key {
                    Some(key.clone())
                } else {
                    cells.get(col).cloned()
                }
            })
            .collect()
    }
}

impl Catalog {
    pub(crate) fn replication(&self, keyspace: &str) -> Option<BTreeMap<String, String>> {
        self.keyspaces.get(keyspace).map(|ks| ks.replication.clone())
    }

    pub(crate) fn table(&self, keyspace: &str, table: &str) -> Option<&TableData> {
        self.keyspaces.get(keyspace)?.tables.get(table)
    }

    fn resolve(&self, name: &QualifiedName) -> ClusterResult<&TableData> {
        let keyspace = name.keyspace.as_deref().ok_or_else(no_keyspace)?;
        let ks = self
            .keyspaces
            .get(keyspace)
            .ok_or_else(|| ClusterError::InvalidQuery(format!("keyspace {keyspace} does not exist")))?;
        ks.tables
            .get(&name.name)
            .ok_or_else(|| ClusterError::InvalidQuery(format!("unconfigured table {}", name.name)))
    }

    fn resolve_mut(&mut self, name: &QualifiedName) -> ClusterResult<&mut TableData> {
        let keyspace = name.keyspace.as_deref().ok_or_else(no_keyspace)?;
        let ks = self
            .keyspaces
            .get_mut(keyspace)
            .ok_or_else(|| ClusterError::InvalidQuery(format!("keyspace {keyspace} does not exist")))?;
        ks.tables
            .get_mut(&name.name)
            .ok_or_else(|| ClusterError::InvalidQuery(format!("unconfigured table {}", name.name)))
    }

    /// Check that a statement refers to existing objects, as the store does
    /// when a statement is prepared.
    pub(crate) fn validate(&self, statement: &Statement) -> ClusterResult<()> {
        match statement {
            Statement::CreateKeyspace { .. } | Statement::CreateTable { .. } => Ok(()),
            Statement::Update {
                table,
                assignments,
                key_column,
            } => {
                let data = self.resolve(table)?;
                data.check_key_column(key_column)?;
                for col in assignments {
                    if *col == data.primary_key {
                        return Err(ClusterError::InvalidQuery(format!(
                            "PRIMARY KEY part {col} found in SET part"
                        )));
                    }
                    data.column_type(col)?;
                }
                Ok(())
            }
            Statement::Select {
                table,
                selection,
                key_column,
            } => {
                let data = self.resolve(table)?;
                if let Some(key) = key_column {
                    data.check_key_column(key)?;
                }
                data.project(selection).map(|_| ())
            }
            Statement::Delete { table, key_column } => {
                self.resolve(table)?.check_key_column(key_column)
            }
            Statement::Truncate { table } => self.resolve(table).map(|_| ()),
        }
    }

    /// Execute a read-only statement.
    pub(crate) fn query(&self, statement: &Statement, values: &[CqlValue]) -> ClusterResult<RowSet> {
        let Statement::Select {
            table,
            selection,
            key_column,
        } = statement
        else {
            return Err(ClusterError::InvalidQuery("not a read-only statement".into()));
        };
        self.validate(statement)?;
        let data = self.resolve(table)?;
        let columns = data.project(selection)?;
        let rows = match (key_column, values) {
            (Some(key_column), [key]) => {
                let key = data.checked(key_column, key)?;
                data.rows
                    .get(&key)
                    .map(|cells| vec![data.row_values(&key, cells, &columns)])
                    .unwrap_or_default()
            }
            (None, []) => data
                .rows
                .iter()
                .map(|(key, cells)| data.row_values(key, cells, &columns))
                .collect(),
            _ => {
                return Err(ClusterError::BindArity {
                    expected: statement.marker_count(),
                    actual: values.len(),
                })
            }
        };
        Ok(RowSet::new(columns, rows))
    }

    /// Execute a statement that changes schema or data.
    pub(crate) fn apply(&mut self, statement: &Statement, values: &[CqlValue]) -> ClusterResult<RowSet> {
        if values.len() != statement.marker_count() {
            return Err(ClusterError::BindArity {
                expected: statement.marker_count(),
                actual: values.len(),
            });
        }
        match statement {
            Statement::CreateKeyspace {
                if_not_exists,
                keyspace,
                replication,
            } => self.create_keyspace(*if_not_exists, keyspace, replication),
            Statement::CreateTable {
                if_not_exists,
                table,
                columns,
                primary_key,
            } => {
                let columns = columns
                    .iter()
                    .map(|c| {
                        c.type_name
                            .parse::<CqlType>()
                            .map(|ty| (c.name.clone(), ty))
                            .map_err(|e| ClusterError::InvalidQuery(e.to_string()))
                    })
                    .collect::<ClusterResult<Vec<_>>>()?;
                self.create_table(*if_not_exists, table, columns, primary_key)
            }
            Statement::Update {
                table,
                assignments,
                key_column,
            } => {
                self.validate(statement)?;
                let data = self.resolve_mut(table)?;
                let (set_values, key) = values.split_at(assignments.len());
                let key = data.checked(key_column, &key[0])?;
                let cells = assignments
                    .iter()
                    .zip(set_values)
                    .map(|(col, value)| -> ClusterResult<(String, CqlValue)> {
                        Ok((col.clone(), data.checked(col, value)?))
                    })
                    .collect::<ClusterResult<Vec<_>>>()?;
                data.rows.entry(key).or_default().extend(cells);
                Ok(RowSet::empty())
            }
            Statement::Delete { table, key_column } => {
                self.validate(statement)?;
                let data = self.resolve_mut(table)?;
                let key = data.checked(key_column, &values[0])?;
                data.rows.remove(&key);
                Ok(RowSet::empty())
            }
            Statement::Truncate { table } => {
                self.resolve_mut(table)?.rows.clear();
                Ok(RowSet::empty())
            }
            Statement::Select { .. } => self.query(statement, values),
        }
    }

    fn create_keyspace(
        &mut self,
        if_not_exists: bool,
        keyspace: &str,
        replication: &BTreeMap<String, String>,
    ) -> ClusterResult<RowSet> {
        let class = replication
            .get("class")
            .ok_or_else(|| ClusterError::InvalidQuery("missing replication strategy class".into()))?;
        if class == "SimpleStrategy" || class.ends_with(".SimpleStrategy") {
            let factor = replication
                .get("replication_factor")
                .and_then(|f| f.parse::<u32>().ok())
                .filter(|f| *f > 0);
            if factor.is_none() {
                return Err(ClusterError::InvalidQuery(
                    "SimpleStrategy requires a positive replication_factor".into(),
                ));
            }
        }
        if self.keyspaces.contains_key(keyspace) {
            return if if_not_exists {
                Ok(RowSet::empty())
            } else {
                Err(ClusterError::AlreadyExists(format!("keyspace {keyspace}")))
            };
        }
        self.keyspaces.insert(
            keyspace.to_string(),
            KeyspaceData {
                replication: replication.clone(),
                tables: HashMap::new(),
            },
        );
        Ok(RowSet::empty())
    }

    fn create_table(
        &mut self,
        if_not_exists: bool,
        table: &QualifiedName,
        columns: Vec<(String, CqlType)>,
        primary_key: &str,
    ) -> ClusterResult<RowSet> {
        let keyspace = table.keyspace.as_deref().ok_or_else(no_keyspace)?;
        let ks = self
            .keyspaces
            .get_mut(keyspace)
            .ok_or_else(|| ClusterError::InvalidQuery(format!("keyspace {keyspace} does not exist")))?;
        if ks.tables.contains_key(&table.name) {
            return if if_not_exists {
                Ok(RowSet::empty())
            } else {
                Err(ClusterError::AlreadyExists(format!("table {table}")))
            };
        }
        for (i, (name, _)) in columns.iter().enumerate() {
            if columns[..i].iter().any(|(other, _)| other == name) {
                return Err(ClusterError::InvalidQuery(format!("multiple definitions of column {name}")));
            }
        }
        if !columns.iter().any(|(name, _)| name == primary_key) {
            return Err(ClusterError::InvalidQuery(format!(
                "unknown definition {primary_key} referenced in PRIMARY KEY"
            )));
        }
        ks.tables.insert(
            table.name.clone(),
            TableData {
                columns,
                primary_key: primary_key.to_string(),
                rows: HashMap::new(),
            },
        );
        Ok(RowSet::empty())
    }
}

fn no_keyspace() -> ClusterError {
    ClusterError::InvalidQuery("no keyspace has been specified".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cql::parse;

    fn run(catalog: &mut Catalog, cql: &str, values: &[CqlValue]) -> ClusterResult<RowSet> {
        catalog.apply(&parse(cql).unwrap(), values)
    }

    fn bootstrapped() -> Catalog {
        let mut catalog = Catalog::default();
        run(
            &mut catalog,
            "CREATE KEYSPACE IF NOT EXISTS ks WITH replication = {'class':'SimpleStrategy', 'replication_factor':2}",
            &[],
        )
        .unwrap();
        run(
            &mut catalog,
            "CREATE TABLE IF NOT EXISTS ks.t (id varchar PRIMARY KEY, json text)",
            &[],
        )
        .unwrap();
        catalog
    }

    #[test]
    fn create_is_idempotent_with_if_not_exists() {
        let mut catalog = bootstrapped();
        run(
            &mut catalog,
            "CREATE KEYSPACE IF NOT EXISTS ks WITH replication = {'class':'SimpleStrategy', 'replication_factor':3}",
            &[],
        )
        .unwrap();
        // First settings win.
        assert_eq!(catalog.replication("ks").unwrap()["replication_factor"], "2");
        run(&mut catalog, "CREATE TABLE IF NOT EXISTS ks.t (id bigint PRIMARY KEY, json text)", &[])
            .unwrap();
        assert_eq!(catalog.table("ks", "t").unwrap().columns()[0].1, CqlType::Text);
    }

    #[test]
    fn create_without_if_not_exists_fails_on_existing() {
        let mut catalog = bootstrapped();
        let err = run(&mut catalog, "CREATE TABLE ks.t (id varchar PRIMARY KEY, json text)", &[])
            .unwrap_err();
        assert!(matches!(err, ClusterError::AlreadyExists(_)));
    }

    #[test]
    fn create_table_requires_keyspace() {
        let mut catalog = Catalog::default();
        let err = run(&mut catalog, "CREATE TABLE nope.t (id uuid PRIMARY KEY, json text)", &[])
            .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidQuery(_)));
    }

    #[test]
    fn simple_strategy_requires_factor() {
        let mut catalog = Catalog::default();
        let err = run(
            &mut catalog,
            "CREATE KEYSPACE ks WITH replication = {'class':'SimpleStrategy'}",
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidQuery(_)));
    }

    #[test]
    fn unsupported_column_type_rejected() {
        let mut catalog = bootstrapped();
        let err = run(&mut catalog, "CREATE TABLE ks.f (id double PRIMARY KEY, json text)", &[])
            .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidQuery(_)));
    }

    #[test]
    fn update_upserts_and_select_reads_back() {
        let mut catalog = bootstrapped();
        let update = parse("UPDATE ks.t SET json = ? WHERE id = ?").unwrap();
        let select = parse("SELECT json FROM ks.t WHERE id = ?").unwrap();
        let key = CqlValue::from("k1");

        catalog.apply(&update, &["v1".into(), key.clone()]).unwrap();
        catalog.apply(&update, &["v2".into(), key.clone()]).unwrap();

        let rows = catalog.query(&select, &[key]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows.first().unwrap().get_text("json").unwrap(), "v2");
        assert_eq!(catalog.table("ks", "t").unwrap().len(), 1);
    }

    #[test]
    fn select_missing_key_returns_no_rows() {
        let catalog = bootstrapped();
        let select = parse("SELECT json FROM ks.t WHERE id = ?").unwrap();
        assert!(catalog.query(&select, &["absent".into()]).unwrap().is_empty());
    }

    #[test]
    fn select_star_includes_key_column() {
        let mut catalog = bootstrapped();
        run(&mut catalog, "UPDATE ks.t SET json = ? WHERE id = ?", &["{}".into(), "a".into()])
            .unwrap();
        let rows = catalog.query(&parse("SELECT * FROM ks.t").unwrap(), &[]).unwrap();
        assert_eq!(rows.columns(), &["id".to_string(), "json".to_string()]);
        assert_eq!(rows.first().unwrap().get("id"), Some(&CqlValue::from("a")));
    }

    #[test]
    fn bound_key_type_is_checked() {
        let mut catalog = bootstrapped();
        let err = run(
            &mut catalog,
            "UPDATE ks.t SET json = ? WHERE id = ?",
            &["{}".into(), CqlValue::BigInt(1)],
        )
        .unwrap_err();
        assert!(matches!(err, ClusterError::TypeMismatch { .. }));
    }

    #[test]
    fn delete_absent_key_is_silent() {
        let mut catalog = bootstrapped();
        run(&mut catalog, "DELETE FROM ks.t WHERE id = ?", &["ghost".into()]).unwrap();
    }

    #[test]
    fn truncate_clears_rows() {
        let mut catalog = bootstrapped();
        for k in ["a", "b", "c"] {
            run(&mut catalog, "UPDATE ks.t SET json = ? WHERE id = ?", &["{}".into(), k.into()])
                .unwrap();
        }
        assert_eq!(catalog.table("ks", "t").unwrap().len(), 3);
        run(&mut catalog, "TRUNCATE ks.t", &[]).unwrap();
        assert_eq!(catalog.table("ks", "t").unwrap().len(), 0);
    }

    #[test]
    fn unknown_table_rejected_on_validate() {
        let catalog = bootstrapped();
        let err = catalog
            .validate(&parse("SELECT json FROM ks.missing").unwrap())
            .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidQuery(_)));
    }

    #[test]
    fn primary_key_cannot_be_assigned() {
        let catalog = bootstrapped();
        let err = catalog
            .validate(&parse("UPDATE ks.t SET id = ? WHERE id = ?").unwrap())
            .unwrap_err();
        assert!(matches!(err, ClusterError::InvalidQuery(_)));
    }

    #[test]
    fn where_must_use_primary_key() {
        let catalog = bootstrapped();
        assert!(catalog
            .validate(&parse("DELETE FROM ks.t WHERE json = ?").unwrap())
            .is_err());
    }

    #[test]
    fn unqualified_table_rejected() {
        let catalog = bootstrapped();
        let err = catalog.validate(&parse("TRUNCATE t").unwrap()).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidQuery(_)));
    }
}
