use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "colrepo",
    about = "Store and read JSON documents in Cassandra/ScyllaDB tables",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML file with repository settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Address of one cluster node
    #[arg(long, global = true)]
    pub contact_point: Option<String>,

    #[arg(long, global = true)]
    pub keyspace: Option<String>,

    /// Write documents with a `$type` discriminator
    #[arg(long, global = true)]
    pub typed: bool,

    /// Write indented documents
    #[arg(long, global = true)]
    pub indent: bool,

    /// Store to connect to; `scylla` is the default when compiled in
    #[arg(long, global = true, value_enum, default_value_t = Backend::default())]
    pub backend: Backend,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// In-process store for trying commands out; nothing survives the invocation
    Memory,
    /// ScyllaDB or Cassandra cluster
    Scylla,
}

impl Default for Backend {
    #[cfg(feature = "scylla")]
    fn default() -> Self {
        Self::Scylla
    }

    #[cfg(not(feature = "scylla"))]
    fn default() -> Self {
        Self::Memory
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the keyspace and table if missing
    Init(TableArgs),
    /// Store a document under a key
    Put(PutArgs),
    /// Print the document stored under a key
    Get(KeyArgs),
    /// Delete the document stored under a key
    Delete(KeyArgs),
    /// Print every document in the table
    List(TableArgs),
    /// Remove every document from the table
    Truncate(TableArgs),
}

impl Command {
    pub fn table(&self) -> &TableArgs {
        match self {
            Command::Init(args) | Command::List(args) | Command::Truncate(args) => args,
            Command::Put(args) => &args.key.table,
            Command::Get(args) | Command::Delete(args) => &args.table,
        }
    }
}

#[derive(Args, Clone, Debug)]
pub struct TableArgs {
    #[arg(long)]
    pub table: String,
    /// uuid, text or bigint
    #[arg(long, default_value = "uuid")]
    pub key_type: String,
}

#[derive(Args)]
pub struct KeyArgs {
    #[command(flatten)]
    pub table: TableArgs,
    pub key: String,
}

#[derive(Args)]
pub struct PutArgs {
    #[command(flatten)]
    pub key: KeyArgs,
    /// JSON document; read from --file or stdin when omitted
    pub document: Option<String>,
    #[arg(long, conflicts_with = "document")]
    pub file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["colrepo", "init", "--table", "Order"]).unwrap();
        assert!(matches!(cli.command, Command::Init(_)));
        assert_eq!(cli.command.table().table, "Order");
        assert_eq!(cli.command.table().key_type, "uuid");
        assert_eq!(cli.backend, Backend::default());
    }

    #[cfg(feature = "scylla")]
    #[test]
    fn scylla_is_default_backend_when_compiled_in() {
        let cli = Cli::try_parse_from(["colrepo", "list", "--table", "Order"]).unwrap();
        assert_eq!(cli.backend, Backend::Scylla);
    }

    #[cfg(not(feature = "scylla"))]
    #[test]
    fn memory_is_default_backend_without_driver() {
        let cli = Cli::try_parse_from(["colrepo", "list", "--table", "Order"]).unwrap();
        assert_eq!(cli.backend, Backend::Memory);
    }

    #[test]
    fn memory_backend_selectable_explicitly() {
        let cli =
            Cli::try_parse_from(["colrepo", "--backend", "memory", "list", "--table", "Order"])
                .unwrap();
        assert_eq!(cli.backend, Backend::Memory);
    }

    #[test]
    fn parse_put_with_globals() {
        let cli = Cli::try_parse_from([
            "colrepo",
            "--keyspace",
            "shop",
            "put",
            "--table",
            "Order",
            "--key-type",
            "text",
            "o-1",
            r#"{"total":3}"#,
            "--typed",
        ])
        .unwrap();
        assert_eq!(cli.keyspace.as_deref(), Some("shop"));
        assert!(cli.typed);
        if let Command::Put(args) = cli.command {
            assert_eq!(args.key.key, "o-1");
            assert_eq!(args.key.table.key_type, "text");
            assert_eq!(args.document.as_deref(), Some(r#"{"total":3}"#));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn put_document_conflicts_with_file() {
        let result = Cli::try_parse_from([
            "colrepo", "put", "--table", "T", "k", "{}", "--file", "doc.json",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_backend() {
        let cli = Cli::try_parse_from(["colrepo", "list", "--table", "T", "--backend", "scylla"]).unwrap();
        assert_eq!(cli.backend, Backend::Scylla);
        assert!(Cli::try_parse_from(["colrepo", "list", "--table", "T", "--backend", "redis"]).is_err());
    }

    #[test]
    fn table_is_required() {
        assert!(Cli::try_parse_from(["colrepo", "get", "k"]).is_err());
    }
}
