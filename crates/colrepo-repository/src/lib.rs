//! Typed document repository over a wide-column store.
//!
//! A [`Repository<K, V, C>`](Repository) persists values of type `V` as JSON
//! documents in a table `(id <key>, json text)` named after `V`, inside one
//! keyspace. The key type `K` decides the key column: [`Uuid`](uuid::Uuid)
//! maps to `uuid`, `String` to `varchar`, `i64` to `bigint`.
//!
//! Opening a repository creates the keyspace (SimpleStrategy, replication
//! factor 2) and the table if they are missing. Every operation then
//! prepares, binds and executes one statement on a session that is released
//! before the call returns.
//!
//! ```
//! use colrepo_cluster::InMemoryBackend;
//! use colrepo_repository::{Repository, RepositoryConfig};
//! use colrepo_types::Entity;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Customer {
//!     name: String,
//! }
//!
//! impl Entity for Customer {
//!     const TABLE_NAME: &'static str = "Customer";
//! }
//!
//! let backend = InMemoryBackend::new();
//! let repo: Repository<String, Customer, _> =
//!     Repository::open(RepositoryConfig::new("127.0.0.1", "shop"), &backend)?;
//!
//! repo.save(&"c-1".to_string(), &Customer { name: "Ada".into() })?;
//! assert_eq!(repo.get(&"c-1".to_string())?, Some(Customer { name: "Ada".into() }));
//! assert_eq!(repo.get(&"c-2".to_string())?, None);
//! repo.close()?;
//! # Ok::<(), colrepo_repository::RepoError>(())
//! ```
//!
//! # Modules
//!
//! - [`config`]: [`RepositoryConfig`], loadable from TOML
//! - [`schema`]: keyspace and table bootstrap
//! - [`crud`]: statement texts and the executor functions
//! - [`cursor`]: [`Records`], the session-bound row cursor
//! - [`log`]: the [`RepositoryLog`] sink

pub mod config;
pub mod crud;
pub mod cursor;
pub mod error;
pub mod log;
pub mod repository;
pub mod schema;

pub use config::RepositoryConfig;
pub use crud::Statements;
pub use cursor::Records;
pub use error::{RepoError, RepoResult};
pub use log::{NullLog, RepositoryLog, TracingLog};
pub use repository::{Repository, RepositoryBuilder, UuidRepository};
pub use schema::REPLICATION_FACTOR;

pub use colrepo_codec::{JsonCodec, SerializerMode};
pub use colrepo_types::{Entity, KeyKind, RecordKey, TableSchema};
