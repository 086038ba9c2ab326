use std::fmt::Display;
use std::io::{Read, Write};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use colrepo_cluster::{Cluster, Connector, InMemoryBackend};
use colrepo_repository::{
    Entity, KeyKind, RecordKey, Repository, RepositoryBuilder, RepositoryConfig, SerializerMode,
    TableSchema, TracingLog,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cli::*;

/// Any JSON document. The table comes from the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDocument(pub serde_json::Value);

impl Entity for RawDocument {
    const TABLE_NAME: &'static str = "RawDocument";

    fn accepts_shape(_tag: &str) -> bool {
        true
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let table = cli.command.table();
    let kind: KeyKind = table.key_type.parse()?;
    let schema = TableSchema::new(table.table.clone(), kind)?;
    let mut out = std::io::stdout().lock();

    match cli.backend {
        Backend::Memory => dispatch(&InMemoryBackend::new(), config, schema, cli.command, &mut out),
        #[cfg(feature = "scylla")]
        Backend::Scylla => dispatch(
            &colrepo_cluster::ScyllaConnector::new(),
            config,
            schema,
            cli.command,
            &mut out,
        ),
        #[cfg(not(feature = "scylla"))]
        Backend::Scylla => bail!("colrepo was built without the `scylla` feature"),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<RepositoryConfig> {
    let mut config = match &cli.config {
        Some(path) => RepositoryConfig::load(path)?,
        None => RepositoryConfig::default(),
    };
    if let Some(contact_point) = &cli.contact_point {
        config = config.with_contact_point(contact_point.clone());
    }
    if let Some(keyspace) = &cli.keyspace {
        config = config.with_keyspace(keyspace.clone());
    }
    if cli.typed {
        config = config.with_serializer(SerializerMode::Typed);
    }
    if cli.indent {
        config = config.with_indent(true);
    }
    config.validate()?;
    Ok(config)
}

pub fn dispatch<N: Connector>(
    connector: &N,
    config: RepositoryConfig,
    schema: TableSchema,
    command: Command,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match schema.key_kind() {
        KeyKind::Identifier => run::<Uuid, N>(connector, config, schema, command, out),
        KeyKind::Text => run::<String, N>(connector, config, schema, command, out),
        KeyKind::Integer => run::<i64, N>(connector, config, schema, command, out),
    }
}

fn parse_key<K>(key: &str) -> anyhow::Result<K>
where
    K: RecordKey + FromStr,
    K::Err: Display,
{
    key.parse::<K>()
        .map_err(|e| anyhow!("invalid {} key {key:?}: {e}", K::KIND.column_type()))
}

fn read_document(args: &PutArgs) -> anyhow::Result<RawDocument> {
    let text = match (&args.document, &args.file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let value = serde_json::from_str(&text).context("document is not valid JSON")?;
    Ok(RawDocument(value))
}

/// A command with its key and document already parsed.
enum Action<K> {
    Init,
    Put(K, String, RawDocument),
    Get(K, String),
    Delete(K, String),
    List,
    Truncate,
}

impl<K> Action<K>
where
    K: RecordKey + FromStr,
    K::Err: Display,
{
    fn parse(command: Command) -> anyhow::Result<Self> {
        Ok(match command {
            Command::Init(_) => Action::Init,
            Command::Put(args) => {
                let key = parse_key(&args.key.key)?;
                let document = read_document(&args)?;
                Action::Put(key, args.key.key, document)
            }
            Command::Get(args) => Action::Get(parse_key(&args.key)?, args.key),
            Command::Delete(args) => Action::Delete(parse_key(&args.key)?, args.key),
            Command::List(_) => Action::List,
            Command::Truncate(_) => Action::Truncate,
        })
    }
}

fn run<K, N>(
    connector: &N,
    config: RepositoryConfig,
    schema: TableSchema,
    command: Command,
    out: &mut impl Write,
) -> anyhow::Result<()>
where
    K: RecordKey + FromStr,
    K::Err: Display,
    N: Connector,
{
    // Everything the command line can get wrong is checked before connecting.
    let action = Action::<K>::parse(command)?;

    let repo = RepositoryBuilder::<K, RawDocument>::new(config)
        .schema(schema)
        .log(TracingLog)
        .open(connector)?;
    let target = format!("{}.{}", repo.keyspace(), repo.schema().table());
    let result = execute(&repo, action, &target, out);
    repo.close()?;
    result
}

fn execute<K: RecordKey, C: Cluster>(
    repo: &Repository<K, RawDocument, C>,
    action: Action<K>,
    target: &str,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    match action {
        Action::Init => {
            writeln!(out, "{} Table {} ready", "✓".green().bold(), target.bold())?;
        }
        Action::Put(key, shown, document) => {
            repo.save(&key, &document)?;
            writeln!(out, "{} Saved {} in {}", "✓".green().bold(), shown.yellow(), target)?;
        }
        Action::Get(key, shown) => match repo.get(&key)? {
            Some(document) => writeln!(out, "{}", serde_json::to_string_pretty(&document)?)?,
            None => bail!("no document under {shown} in {target}"),
        },
        Action::Delete(key, shown) => {
            repo.delete(&key)?;
            writeln!(out, "{} Deleted {} from {}", "✓".green().bold(), shown.yellow(), target)?;
        }
        Action::List => {
            let documents = repo.get_all()?;
            for document in &documents {
                writeln!(out, "{}", serde_json::to_string(document)?)?;
            }
            writeln!(out, "{} document(s) in {}", documents.len().to_string().bold(), target)?;
        }
        Action::Truncate => {
            repo.delete_all()?;
            writeln!(out, "{} Truncated {}", "✓".green().bold(), target.bold())?;
        }
    }
    Ok(())
}
