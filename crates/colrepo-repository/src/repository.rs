use std::marker::PhantomData;
use std::sync::Arc;

use colrepo_cluster::{Cluster, Connector};
use colrepo_codec::JsonCodec;
use colrepo_types::{Entity, RecordKey, TableSchema};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RepositoryConfig;
use crate::crud::{self, Statements};
use crate::cursor::Records;
use crate::error::{RepoError, RepoResult};
use crate::log::{NullLog, RepositoryLog};
use crate::schema::ensure_schema;

/// Repository keyed by a 128-bit identifier.
pub type UuidRepository<V, C> = Repository<Uuid, V, C>;

/// Configures and opens a [`Repository`].
pub struct RepositoryBuilder<K, V> {
    config: RepositoryConfig,
    log: Arc<dyn RepositoryLog>,
    schema: Option<TableSchema>,
    _types: PhantomData<fn(K) -> V>,
}

impl<K: RecordKey, V: Entity> RepositoryBuilder<K, V> {
    pub fn new(config: RepositoryConfig) -> Self {
        Self {
            config,
            log: Arc::new(NullLog),
            schema: None,
            _types: PhantomData,
        }
    }

    /// Send lifecycle messages to `log` instead of dropping them.
    pub fn log(mut self, log: impl RepositoryLog + 'static) -> Self {
        self.log = Arc::new(log);
        self
    }

    /// Use an explicit table schema instead of the one derived from
    /// `V::TABLE_NAME` and `K::KIND`. Its key kind must match `K`.
    pub fn schema(mut self, schema: TableSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Open the cluster and bootstrap the schema.
    ///
    /// Names and the key kind are checked before any connection is made.
    /// If bootstrapping fails the cluster handle is shut down again and no
    /// repository is returned.
    pub fn open<N: Connector>(self, connector: &N) -> RepoResult<Repository<K, V, N::Cluster>> {
        self.config.validate()?;
        let schema = match self.schema {
            Some(schema) => schema,
            None => TableSchema::for_entity::<K, V>()?,
        };
        if schema.key_kind() != K::KIND {
            return Err(RepoError::KeyKindMismatch {
                table: schema.table().to_string(),
                schema: schema.key_kind(),
                repository: K::KIND,
            });
        }

        let keyspace = self.config.keyspace.clone();
        let cluster = connector
            .open(&self.config.contact_point)
            .map_err(RepoError::Connection)?;

        self.log.info("repository setup started");
        if let Err(e) = bootstrap(&cluster, &keyspace, &schema) {
            self.log.error(&format!("repository setup failed: {e}"));
            if let Err(shutdown) = cluster.shutdown() {
                warn!(error = %shutdown, "shutdown after failed setup");
            }
            return Err(e);
        }
        self.log.info("repository setup ended");

        Ok(Repository {
            statements: Statements::new(&keyspace, schema.table()),
            codec: self.config.codec(),
            cluster,
            keyspace,
            schema,
            log: self.log,
            closed: false,
            _types: PhantomData,
        })
    }
}

fn bootstrap<C: Cluster>(cluster: &C, keyspace: &str, schema: &TableSchema) -> RepoResult<()> {
    let session = cluster.connect().map_err(RepoError::Connection)?;
    ensure_schema(&session, keyspace, schema)
}

/// Typed document repository over one table.
///
/// Every value of type `V` is stored as a JSON document under a key of type
/// `K`. Each plain operation opens its own session and releases it before
/// returning, on success or failure. The `*_in` variants run on a session
/// the caller already holds, to batch several operations on one
/// connection.
///
/// The repository owns the cluster handle. [`Repository::close`] shuts it
/// down; dropping an unclosed repository does the same.
pub struct Repository<K: RecordKey, V: Entity, C: Cluster> {
    cluster: C,
    keyspace: String,
    schema: TableSchema,
    statements: Statements,
    codec: JsonCodec,
    log: Arc<dyn RepositoryLog>,
    closed: bool,
    _types: PhantomData<fn(K) -> V>,
}

impl<K: RecordKey, V: Entity, C: Cluster> Repository<K, V, C> {
    /// Open with the derived schema and no log sink.
    pub fn open<N>(config: RepositoryConfig, connector: &N) -> RepoResult<Self>
    where
        N: Connector<Cluster = C>,
    {
        RepositoryBuilder::new(config).open(connector)
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn statements(&self) -> &Statements {
        &self.statements
    }

    pub fn codec(&self) -> JsonCodec {
        self.codec
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Open a session owned by the caller. It is released when dropped.
    pub fn new_session(&self) -> RepoResult<C::Session> {
        self.cluster.connect().map_err(RepoError::Connection)
    }

    /// Run `f` on a fresh session, released when `f` returns.
    pub fn with_session<T>(&self, f: impl FnOnce(&C::Session) -> RepoResult<T>) -> RepoResult<T> {
        let session = self.new_session()?;
        f(&session)
    }

    fn logged<T>(&self, operation: &str, f: impl FnOnce() -> RepoResult<T>) -> RepoResult<T> {
        self.log.info(&format!("{operation} starting"));
        let result = f();
        match &result {
            Ok(_) => self.log.info(&format!("{operation} ending")),
            Err(e) => self.log.error(&format!("{operation} failed: {e}")),
        }
        result
    }

    // ---- Session-scoped operations ----

    /// Store `value` under `key`, replacing what was there.
    pub fn save(&self, key: &K, value: &V) -> RepoResult<()> {
        self.with_session(|session| self.save_in(session, key, value))
    }

    /// The value under `key`, or `None` if the key was never saved or has
    /// been deleted.
    pub fn get(&self, key: &K) -> RepoResult<Option<V>> {
        self.with_session(|session| self.get_in(session, key))
    }

    /// Remove `key`. Deleting an absent key succeeds.
    pub fn delete(&self, key: &K) -> RepoResult<()> {
        self.with_session(|session| self.delete_in(session, key))
    }

    /// Remove every row of the table. Irreversible.
    pub fn delete_all(&self) -> RepoResult<()> {
        self.with_session(|session| self.delete_all_in(session))
    }

    /// Every stored value, in unspecified order. Decoded before the session
    /// is released; the first undecodable document fails the whole call.
    pub fn get_all(&self) -> RepoResult<Vec<V>> {
        self.with_session(|session| {
            self.logged("get all", || {
                let rows = crud::fetch_all(session, &self.statements)?;
                Records::new(rows, self.codec).collect()
            })
        })
    }

    // ---- Caller-supplied session ----

    pub fn save_in(&self, session: &C::Session, key: &K, value: &V) -> RepoResult<()> {
        self.logged("save", || {
            crud::save(session, &self.statements, &self.codec, key, value)
        })
    }

    pub fn get_in(&self, session: &C::Session, key: &K) -> RepoResult<Option<V>> {
        self.logged("get", || crud::get(session, &self.statements, &self.codec, key))
    }

    pub fn delete_in(&self, session: &C::Session, key: &K) -> RepoResult<()> {
        self.logged("delete", || crud::delete(session, &self.statements, key))
    }

    pub fn delete_all_in(&self, session: &C::Session) -> RepoResult<()> {
        self.logged("delete all", || crud::delete_all(session, &self.statements))
    }

    /// Run the full-table query and return a cursor decoding its rows.
    /// The cursor borrows `session` and cannot outlive it.
    pub fn get_all_in<'s>(&self, session: &'s C::Session) -> RepoResult<Records<'s, V>> {
        self.logged("get all", || {
            let rows = crud::fetch_all(session, &self.statements)?;
            Ok(Records::new(rows, self.codec))
        })
    }

    // ---- Lifecycle ----

    /// Shut the cluster handle down gracefully.
    pub fn close(mut self) -> RepoResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> RepoResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.log.info("dispose starting");
        self.cluster.shutdown().map_err(RepoError::Connection)?;
        info!(keyspace = %self.keyspace, table = self.schema.table(), "repository closed");
        self.log.info("dispose ending");
        Ok(())
    }
}

impl<K: RecordKey, V: Entity, C: Cluster> Drop for Repository<K, V, C> {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "repository shutdown on drop failed");
            self.log.warn(&format!("dispose failed: {e}"));
        }
    }
}

impl<K: RecordKey, V: Entity, C: Cluster> std::fmt::Debug for Repository<K, V, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("keyspace", &self.keyspace)
            .field("schema", &self.schema)
            .field("codec", &self.codec)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use colrepo_cluster::{ClusterError, InMemoryBackend, InMemoryCluster, PreparedStatement, Session};
    use colrepo_codec::{CodecError, SerializerMode};
    use colrepo_types::{CqlValue, KeyKind};
    use proptest::prelude::*;
    use serde::{Deserialize, Serialize};

    use crate::log::testing::MemoryLog;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "PascalCase")]
    struct SampleObject {
        name: String,
        start: DateTime<Utc>,
    }

    impl Entity for SampleObject {
        const TABLE_NAME: &'static str = "SampleObject";
    }

    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    struct Item {
        id: i64,
        label: String,
        tags: Vec<String>,
    }

    impl Entity for Item {
        const TABLE_NAME: &'static str = "Item";
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "$type")]
    enum Shape {
        Circle { radius: f64 },
        Square { side: f64 },
    }

    impl Entity for Shape {
        const TABLE_NAME: &'static str = "Shape";
        const SHAPES: &'static [&'static str] = &["Circle", "Square"];

        fn shape(&self) -> &'static str {
            match self {
                Shape::Circle { .. } => "Circle",
                Shape::Square { .. } => "Square",
            }
        }
    }

    fn config() -> RepositoryConfig {
        RepositoryConfig::new("127.0.0.1", "Testing")
    }

    fn open<K: RecordKey, V: Entity>(backend: &InMemoryBackend) -> Repository<K, V, InMemoryCluster> {
        Repository::open(config(), backend).unwrap()
    }

    fn sample(name: &str) -> SampleObject {
        SampleObject {
            name: name.into(),
            start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    // ---- Construction ----

    #[test]
    fn open_bootstraps_keyspace_and_table() {
        let backend = InMemoryBackend::new();
        let repo = open::<String, SampleObject>(&backend);
        assert_eq!(repo.keyspace(), "Testing");
        assert_eq!(repo.schema().table(), "SampleObject");
        assert_eq!(repo.schema().key_kind(), KeyKind::Text);
        assert_eq!(
            backend.keyspace_replication("testing").unwrap()["replication_factor"],
            "2"
        );
        assert!(backend.table_columns("testing", "sampleobject").is_some());
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn repeated_construction_is_harmless() {
        let backend = InMemoryBackend::new();
        let first = open::<i64, Item>(&backend);
        first.save(&1, &Item { id: 1, label: "a".into(), tags: vec![] }).unwrap();
        let second = open::<i64, Item>(&backend);
        assert_eq!(second.get(&1).unwrap().unwrap().label, "a");
    }

    #[test]
    fn key_kind_strings_outside_the_supported_set_are_rejected() {
        for name in ["double", "float", "decimal", "timestamp", ""] {
            let err = name.parse::<KeyKind>().map_err(RepoError::from).unwrap_err();
            assert!(matches!(err, RepoError::UnsupportedKeyType(ref t) if t == name));
        }
        assert_eq!("GUID".parse::<KeyKind>().unwrap(), KeyKind::Identifier);
        assert_eq!("varchar".parse::<KeyKind>().unwrap(), KeyKind::Text);
        assert_eq!("long".parse::<KeyKind>().unwrap(), KeyKind::Integer);
    }

    #[test]
    fn key_kind_mismatch_fails_before_connecting() {
        let backend = InMemoryBackend::new();
        let schema = TableSchema::new("Item", KeyKind::Text).unwrap();
        let err = RepositoryBuilder::<i64, Item>::new(config())
            .schema(schema)
            .open(&backend)
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::KeyKindMismatch {
                schema: KeyKind::Text,
                repository: KeyKind::Integer,
                ..
            }
        ));
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn invalid_keyspace_fails_before_connecting() {
        let backend = InMemoryBackend::new();
        let err = Repository::<i64, Item, _>::open(config().with_keyspace("drop table x;"), &backend)
            .unwrap_err();
        assert!(matches!(err, RepoError::InvalidName { .. }));
        assert_eq!(backend.open_count(), 0);
    }

    #[test]
    fn unreachable_cluster_is_connection_error() {
        let backend = InMemoryBackend::new();
        backend.set_reachable(false);
        let err = Repository::<i64, Item, _>::open(config(), &backend).unwrap_err();
        assert!(matches!(err, RepoError::Connection(ClusterError::Unreachable { .. })));
    }

    #[test]
    fn bootstrap_failure_returns_no_repository() {
        let backend = InMemoryBackend::new();
        backend.fail_next_matching("CREATE TABLE", "no space left");
        let log = Arc::new(MemoryLog::default());
        let err = RepositoryBuilder::<i64, Item>::new(config())
            .log(log.clone())
            .open(&backend)
            .unwrap_err();
        assert!(matches!(err, RepoError::SchemaBootstrap { .. }));
        assert_eq!(backend.open_sessions(), 0);
        assert!(log.messages("error")[0].starts_with("repository setup failed"));
    }

    // ---- CRUD ----

    #[test]
    fn get_missing_key_is_none() {
        let backend = InMemoryBackend::new();
        let repo = open::<String, SampleObject>(&backend);
        repo.delete_all().unwrap();
        assert_eq!(repo.get(&"nobody".to_string()).unwrap(), None);
    }

    #[test]
    fn save_then_get_each_key_kind() {
        let backend = InMemoryBackend::new();

        let by_uuid: UuidRepository<SampleObject, _> = open(&backend);
        let id = Uuid::new_v4();
        by_uuid.save(&id, &sample("uuid")).unwrap();
        assert_eq!(by_uuid.get(&id).unwrap(), Some(sample("uuid")));

        let by_text = open::<String, Item>(&backend);
        let item = Item { id: 3, label: "three".into(), tags: vec!["x".into()] };
        by_text.save(&"k3".to_string(), &item).unwrap();
        assert_eq!(by_text.get(&"k3".to_string()).unwrap(), Some(item));

        // Item is already keyed by text on the first backend.
        let other = InMemoryBackend::new();
        let by_int = open::<i64, Item>(&other);
        let item = Item { id: -9, label: "neg".into(), tags: vec![] };
        by_int.save(&-9, &item).unwrap();
        assert_eq!(by_int.get(&-9).unwrap(), Some(item));
    }

    #[test]
    fn save_overwrites() {
        let backend = InMemoryBackend::new();
        let repo = open::<String, SampleObject>(&backend);
        let key = "k".to_string();
        repo.save(&key, &sample("v1")).unwrap();
        repo.save(&key, &sample("v2")).unwrap();
        assert_eq!(repo.get(&key).unwrap(), Some(sample("v2")));
        assert_eq!(repo.get_all().unwrap().len(), 1);
    }

    #[test]
    fn delete_absent_key_succeeds() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        repo.delete(&404).unwrap();
        assert_eq!(repo.get(&404).unwrap(), None);

        repo.save(&1, &Item { id: 1, label: "one".into(), tags: vec![] }).unwrap();
        repo.delete(&1).unwrap();
        repo.delete(&1).unwrap();
        assert_eq!(repo.get(&1).unwrap(), None);
    }

    #[test]
    fn empty_table_enumerates_nothing() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        repo.save(&1, &Item { id: 1, label: "x".into(), tags: vec![] }).unwrap();
        repo.delete_all().unwrap();
        assert!(repo.get_all().unwrap().is_empty());

        let session = repo.new_session().unwrap();
        assert_eq!(repo.get_all_in(&session).unwrap().count(), 0);
    }

    #[test]
    fn reopened_repository_reads_saved_value() {
        let backend = InMemoryBackend::new();
        let key = "abc-1".to_string();
        {
            let repo = open::<String, SampleObject>(&backend);
            repo.save(&key, &sample("Testing42")).unwrap();
            repo.close().unwrap();
        }

        let repo = open::<String, SampleObject>(&backend);
        let value = repo.get(&key).unwrap().expect("value should be stored");
        assert_eq!(value.name, "Testing42");
        assert_eq!(value.start, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn typed_mode_round_trips_polymorphic_values() {
        let backend = InMemoryBackend::new();
        let repo: Repository<i64, Shape, _> =
            Repository::open(config().with_serializer(SerializerMode::Typed), &backend).unwrap();
        repo.save(&1, &Shape::Circle { radius: 1.5 }).unwrap();
        repo.save(&2, &Shape::Square { side: 2.0 }).unwrap();

        assert_eq!(repo.get(&1).unwrap(), Some(Shape::Circle { radius: 1.5 }));
        assert_eq!(repo.get(&2).unwrap(), Some(Shape::Square { side: 2.0 }));
    }

    #[test]
    fn typed_document_of_other_type_is_rejected() {
        let backend = InMemoryBackend::new();
        let typed = config().with_serializer(SerializerMode::Typed);
        let items: Repository<i64, Item, _> = Repository::open(typed.clone(), &backend).unwrap();
        items.save(&1, &Item { id: 1, label: "i".into(), tags: vec![] }).unwrap();

        let shapes = RepositoryBuilder::<i64, Shape>::new(typed)
            .schema(TableSchema::new("Item", KeyKind::Integer).unwrap())
            .open(&backend)
            .unwrap();
        let err = shapes.get(&1).unwrap_err();
        assert!(matches!(
            err,
            RepoError::Deserialization(CodecError::UnregisteredShape { .. })
        ));
    }

    #[test]
    fn malformed_document_is_deserialization_error() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        repo.with_session(|session| {
            let update = session.prepare(repo.statements().save()).unwrap();
            let bound = update
                .bind(vec![CqlValue::Text("{not json".into()), CqlValue::BigInt(5)])
                .unwrap();
            session.execute_bound(&bound).unwrap();
            Ok(())
        })
        .unwrap();

        assert!(matches!(repo.get(&5), Err(RepoError::Deserialization(_))));
        assert!(matches!(repo.get_all(), Err(RepoError::Deserialization(_))));
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn statement_failure_propagates_and_releases_session() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        backend.fail_next_matching("UPDATE", "write timeout");

        let err = repo
            .save(&1, &Item { id: 1, label: "x".into(), tags: vec![] })
            .unwrap_err();
        assert!(matches!(
            err,
            RepoError::StatementExecution { operation: "save", source: ClusterError::Execution(_) }
        ));
        assert_eq!(backend.open_sessions(), 0);
        assert_eq!(repo.get(&1).unwrap(), None);
    }

    #[test]
    fn undecodable_get_all_is_logged_as_failure() {
        let backend = InMemoryBackend::new();
        let log = Arc::new(MemoryLog::default());
        let repo = RepositoryBuilder::<i64, Item>::new(config())
            .log(log.clone())
            .open(&backend)
            .unwrap();
        repo.with_session(|session| {
            let update = session.prepare(repo.statements().save()).unwrap();
            let bound = update
                .bind(vec![CqlValue::Text("{not json".into()), CqlValue::BigInt(1)])
                .unwrap();
            session.execute_bound(&bound).unwrap();
            Ok(())
        })
        .unwrap();

        assert!(matches!(repo.get_all(), Err(RepoError::Deserialization(_))));
        assert!(!log.messages("info").contains(&"get all ending".to_string()));
        let errors = log.messages("error");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("get all failed"));
    }

    // ---- Sessions ----

    #[test]
    fn each_operation_uses_its_own_session() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        let before = backend.sessions_opened();
        repo.delete(&1).unwrap();
        repo.get(&1).unwrap();
        assert_eq!(backend.sessions_opened(), before + 2);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn with_session_batches_on_one_session() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        let before = backend.sessions_opened();

        let count = repo
            .with_session(|session| {
                for i in 0..3 {
                    repo.save_in(session, &i, &Item { id: i, label: i.to_string(), tags: vec![] })?;
                }
                repo.delete_in(session, &0)?;
                assert_eq!(backend.open_sessions(), 1);
                Ok(repo.get_all_in(session)?.count())
            })
            .unwrap();

        assert_eq!(count, 2);
        assert_eq!(backend.sessions_opened(), before + 1);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn cursor_decodes_lazily() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        let session = repo.new_session().unwrap();
        for i in 0..4 {
            repo.save_in(&session, &i, &Item { id: i, label: format!("n{i}"), tags: vec![] })
                .unwrap();
        }
        let mut records = repo.get_all_in(&session).unwrap();
        assert_eq!(records.len(), 4);
        records.next().unwrap().unwrap();
        assert_eq!(records.len(), 3);
        drop(records);
        drop(session);
        assert_eq!(backend.open_sessions(), 0);
    }

    #[test]
    fn concurrent_saves_share_the_cluster() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        std::thread::scope(|scope| {
            for t in 0..4i64 {
                let repo = &repo;
                scope.spawn(move || {
                    for i in 0..10 {
                        let id = t * 100 + i;
                        repo.save(&id, &Item { id, label: String::new(), tags: vec![] }).unwrap();
                    }
                });
            }
        });
        assert_eq!(repo.get_all().unwrap().len(), 40);
        assert_eq!(backend.open_sessions(), 0);
    }

    // ---- Lifecycle ----

    #[test]
    fn close_shuts_the_cluster_down() {
        let backend = InMemoryBackend::new();
        let repo = open::<i64, Item>(&backend);
        let session = repo.new_session().unwrap();
        repo.close().unwrap();
        assert!(matches!(
            session.execute("TRUNCATE Testing.Item"),
            Err(ClusterError::Shutdown)
        ));
    }

    #[test]
    fn drop_shuts_the_cluster_down() {
        let backend = InMemoryBackend::new();
        let log = Arc::new(MemoryLog::default());
        let repo = RepositoryBuilder::<i64, Item>::new(config())
            .log(log.clone())
            .open(&backend)
            .unwrap();
        let session = repo.new_session().unwrap();
        drop(repo);
        assert!(matches!(
            session.execute("TRUNCATE Testing.Item"),
            Err(ClusterError::Shutdown)
        ));
        assert!(log.messages("info").contains(&"dispose ending".to_string()));
    }

    #[test]
    fn log_sink_sees_lifecycle() {
        let backend = InMemoryBackend::new();
        let log = Arc::new(MemoryLog::default());
        let repo = RepositoryBuilder::<i64, Item>::new(config())
            .log(log.clone())
            .open(&backend)
            .unwrap();
        repo.get(&1).unwrap();
        backend.fail_next_matching("DELETE", "unavailable");
        repo.delete(&1).unwrap_err();
        repo.close().unwrap();

        assert_eq!(
            log.messages("info"),
            vec![
                "repository setup started",
                "repository setup ended",
                "get starting",
                "get ending",
                "delete starting",
                "dispose starting",
                "dispose ending",
            ]
        );
        let errors = log.messages("error");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("delete failed"));
    }

    // ---- Properties ----

    fn item_strategy() -> impl Strategy<Value = (String, Vec<String>)> {
        ("[a-zA-Z0-9 ]{0,16}", prop::collection::vec("\\PC{0,8}", 0..4))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_save_get_round_trip(key in "\\PC{0,24}", id in any::<i64>(), (label, tags) in item_strategy()) {
            let backend = InMemoryBackend::new();
            let repo = open::<String, Item>(&backend);
            let item = Item { id, label, tags };
            repo.save(&key, &item).unwrap();
            prop_assert_eq!(repo.get(&key).unwrap(), Some(item));
        }

        #[test]
        fn prop_get_all_returns_every_saved_value(
            entries in prop::collection::btree_map(any::<i64>(), item_strategy(), 0..24)
        ) {
            let backend = InMemoryBackend::new();
            let repo = open::<i64, Item>(&backend);
            repo.delete_all().unwrap();

            let mut expected: Vec<Item> = entries
                .into_iter()
                .map(|(id, (label, tags))| Item { id, label, tags })
                .collect();
            for item in &expected {
                repo.save(&item.id, item).unwrap();
            }

            let mut all = repo.get_all().unwrap();
            all.sort();
            expected.sort();
            prop_assert_eq!(all, expected);
        }
    }
}
