//! Tokenizer and parser for the CQL statement shapes colrepo issues.
//!
//! Supported statements:
//!
//! ```text
//! CREATE KEYSPACE [IF NOT EXISTS] ks WITH replication = { 'k': 'v' | n, ... }
//! CREATE TABLE [IF NOT EXISTS] ks.t (col type [PRIMARY KEY], ... [, PRIMARY KEY (col)])
//! UPDATE ks.t SET col = ? [, col = ?] WHERE key = ?
//! SELECT * | col [, col] FROM ks.t [WHERE key = ?]
//! DELETE FROM ks.t WHERE key = ?
//! TRUNCATE [TABLE] ks.t
//! ```
//!
//! Values in DML are always bind markers. Unquoted identifiers fold to lower
//! case; double-quoted identifiers keep their case. A trailing `;` is allowed.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ClusterError, ClusterResult};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    QuotedIdent(String),
    Str(String),
    Number(String),
    Marker,
    Symbol(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) | Token::Number(s) => write!(f, "{s}"),
            Token::QuotedIdent(s) => write!(f, "\"{s}\""),
            Token::Str(s) => write!(f, "'{s}'"),
            Token::Marker => write!(f, "?"),
            Token::Symbol(c) => write!(f, "{c}"),
        }
    }
}

const SYMBOLS: &[char] = &['(', ')', '{', '}', ',', ':', ';', '.', '=', '*'];

fn tokenize(cql: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = cql.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if ch == '?' {
            chars.next();
            tokens.push(Token::Marker);
        } else if SYMBOLS.contains(&ch) {
            chars.next();
            tokens.push(Token::Symbol(ch));
        } else if ch == '\'' || ch == '"' {
            chars.next();
            let mut text = String::new();
            loop {
                match chars.next() {
                    // A doubled quote is an escaped quote.
                    Some(c) if c == ch => {
                        if chars.peek() == Some(&ch) {
                            chars.next();
                            text.push(ch);
                        } else {
                            break;
                        }
                    }
                    Some(c) => text.push(c),
                    None => return Err("unterminated quoted text".into()),
                }
            }
            tokens.push(if ch == '\'' {
                Token::Str(text)
            } else {
                Token::QuotedIdent(text)
            });
        } else if ch.is_ascii_digit() || ch == '-' {
            let mut text = String::new();
            text.push(ch);
            chars.next();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Number(text));
        } else if ch.is_alphabetic() || ch == '_' {
            let mut text = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    text.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(text));
        } else {
            return Err(format!("unexpected character {ch:?}"));
        }
    }
    Ok(tokens)
}

/// A possibly keyspace-qualified table or keyspace name, already folded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QualifiedName {
    pub keyspace: Option<String>,
    pub name: String,
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.keyspace {
            Some(ks) => write!(f, "{ks}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A column declared in `CREATE TABLE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    /// Type name as written; resolved by the backend.
    pub type_name: String,
}

/// Columns projected by a `SELECT`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    All,
    Columns(Vec<String>),
}

/// A parsed statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    CreateKeyspace {
        if_not_exists: bool,
        keyspace: String,
        replication: BTreeMap<String, String>,
    },
    CreateTable {
        if_not_exists: bool,
        table: QualifiedName,
        columns: Vec<ColumnDef>,
        primary_key: String,
    },
    Update {
        table: QualifiedName,
        assignments: Vec<String>,
        key_column: String,
    },
    Select {
        table: QualifiedName,
        selection: Selection,
        key_column: Option<String>,
    },
    Delete {
        table: QualifiedName,
        key_column: String,
    },
    Truncate {
        table: QualifiedName,
    },
}

impl Statement {
    /// Number of bind markers, in binding order: assignments, then key.
    pub fn marker_count(&self) -> usize {
        match self {
            Statement::CreateKeyspace { .. }
            | Statement::CreateTable { .. }
            | Statement::Truncate { .. } => 0,
            Statement::Update { assignments, .. } => assignments.len() + 1,
            Statement::Select { key_column, .. } => usize::from(key_column.is_some()),
            Statement::Delete { .. } => 1,
        }
    }

    /// Names of the result columns, empty when they are not known from the
    /// text alone (`SELECT *`) or the statement returns no rows.
    pub fn result_columns(&self) -> Vec<String> {
        match self {
            Statement::Select {
                selection: Selection::Columns(cols),
                ..
            } => cols.clone(),
            _ => Vec::new(),
        }
    }
}

/// Parse one statement.
pub fn parse(cql: &str) -> ClusterResult<Statement> {
    let syntax = |reason: String| ClusterError::Syntax {
        cql: cql.to_string(),
        reason,
    };
    let tokens = tokenize(cql).map_err(syntax)?;
    let mut parser = Parser { tokens, pos: 0 };
    let statement = parser.statement().map_err(syntax)?;
    parser.eat_symbol(';');
    if let Some(extra) = parser.peek() {
        return Err(syntax(format!("unexpected trailing input at {extra}")));
    }
    Ok(statement)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type ParseResult<T> = Result<T, String>;

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(s)) if s.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.expected(keyword))
        }
    }

    fn eat_symbol(&mut self, symbol: char) -> bool {
        if self.peek() == Some(&Token::Symbol(symbol)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn symbol(&mut self, symbol: char) -> ParseResult<()> {
        if self.eat_symbol(symbol) {
            Ok(())
        } else {
            Err(self.expected(&symbol.to_string()))
        }
    }

    fn marker(&mut self) -> ParseResult<()> {
        match self.next() {
            Some(Token::Marker) => Ok(()),
            Some(other) => Err(format!("only bind markers are supported as values, found {other}")),
            None => Err("expected ? but reached end of statement".into()),
        }
    }

    fn expected(&self, what: &str) -> String {
        match self.peek() {
            Some(token) => format!("expected {what}, found {token}"),
            None => format!("expected {what} but reached end of statement"),
        }
    }

    fn name(&mut self) -> ParseResult<String> {
        match self.next() {
            Some(Token::Ident(s)) => Ok(s.to_lowercase()),
            Some(Token::QuotedIdent(s)) => Ok(s),
            Some(other) => Err(format!("expected identifier, found {other}")),
            None => Err("expected identifier but reached end of statement".into()),
        }
    }

    fn qualified_name(&mut self) -> ParseResult<QualifiedName> {
        let first = self.name()?;
        if self.eat_symbol('.') {
            let name = self.name()?;
            Ok(QualifiedName {
                keyspace: Some(first),
                name,
            })
        } else {
            Ok(QualifiedName {
                keyspace: None,
                name: first,
            })
        }
    }

    fn if_not_exists(&mut self) -> ParseResult<bool> {
        if self.eat_keyword("IF") {
            self.keyword("NOT")?;
            self.keyword("EXISTS")?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn statement(&mut self) -> ParseResult<Statement> {
        if self.eat_keyword("CREATE") {
            if self.eat_keyword("KEYSPACE") {
                self.create_keyspace()
            } else if self.eat_keyword("TABLE") {
                self.create_table()
            } else {
                Err(self.expected("KEYSPACE or TABLE"))
            }
        } else if self.eat_keyword("UPDATE") {
            self.update()
        } else if self.eat_keyword("SELECT") {
            self.select()
        } else if self.eat_keyword("DELETE") {
            self.delete()
        } else if self.eat_keyword("TRUNCATE") {
            self.eat_keyword("TABLE");
            Ok(Statement::Truncate {
                table: self.qualified_name()?,
            })
        } else {
            Err(self.expected("a statement"))
        }
    }

    fn create_keyspace(&mut self) -> ParseResult<Statement> {
        let if_not_exists = self.if_not_exists()?;
        let keyspace = self.name()?;
        self.keyword("WITH")?;
        self.keyword("REPLICATION")?;
        self.symbol('=')?;
        let replication = self.map_literal()?;
        Ok(Statement::CreateKeyspace {
            if_not_exists,
            keyspace,
            replication,
        })
    }

    fn map_literal(&mut self) -> ParseResult<BTreeMap<String, String>> {
        self.symbol('{')?;
        let mut map = BTreeMap::new();
        if self.eat_symbol('}') {
            return Ok(map);
        }
        loop {
            let key = match self.next() {
                Some(Token::Str(s)) => s,
                Some(other) => return Err(format!("expected quoted map key, found {other}")),
                None => return Err("unterminated map literal".into()),
            };
            self.symbol(':')?;
            let value = match self.next() {
                Some(Token::Str(s)) | Some(Token::Number(s)) => s,
                Some(Token::Ident(s)) => s,
                Some(other) => return Err(format!("unexpected map value {other}")),
                None => return Err("unterminated map literal".into()),
            };
            map.insert(key, value);
            if self.eat_symbol('}') {
                return Ok(map);
            }
            self.symbol(',')?;
        }
    }

    fn create_table(&mut self) -> ParseResult<Statement> {
        let if_not_exists = self.if_not_exists()?;
        let table = self.qualified_name()?;
        self.symbol('(')?;
        let mut columns = Vec::new();
        let mut primary_keys = Vec::new();
        loop {
            if self.eat_keyword("PRIMARY") {
                self.keyword("KEY")?;
                self.symbol('(')?;
                primary_keys.push(self.name()?);
                self.symbol(')')?;
            } else {
                let name = self.name()?;
                let type_name = self.name()?;
                if self.eat_keyword("PRIMARY") {
                    self.keyword("KEY")?;
                    primary_keys.push(name.clone());
                }
                columns.push(ColumnDef { name, type_name });
            }
            if self.eat_symbol(')') {
                break;
            }
            self.symbol(',')?;
        }
        let primary_key = match primary_keys.as_slice() {
            [one] => one.clone(),
            [] => return Err("table has no PRIMARY KEY".into()),
            _ => return Err("exactly one PRIMARY KEY column is supported".into()),
        };
        Ok(Statement::CreateTable {
            if_not_exists,
            table,
            columns,
            primary_key,
        })
    }

    fn where_key(&mut self) -> ParseResult<String> {
        self.keyword("WHERE")?;
        let column = self.name()?;
        self.symbol('=')?;
        self.marker()?;
        Ok(column)
    }

    fn update(&mut self) -> ParseResult<Statement> {
        let table = self.qualified_name()?;
        self.keyword("SET")?;
        let mut assignments = Vec::new();
        loop {
            assignments.push(self.name()?);
            self.symbol('=')?;
            self.marker()?;
            if !self.eat_symbol(',') {
                break;
            }
        }
        let key_column = self.where_key()?;
        Ok(Statement::Update {
            table,
            assignments,
            key_column,
        })
    }

    fn select(&mut self) -> ParseResult<Statement> {
        let selection = if self.eat_symbol('*') {
            Selection::All
        } else {
            let mut cols = vec![self.name()?];
            while self.eat_symbol(',') {
                cols.push(self.name()?);
            }
            Selection::Columns(cols)
        };
        self.keyword("FROM")?;
        let table = self.qualified_name()?;
        let key_column = if self.is_keyword("WHERE") {
            Some(self.where_key()?)
        } else {
            None
        };
        Ok(Statement::Select {
            table,
            selection,
            key_column,
        })
    }

    fn delete(&mut self) -> ParseResult<Statement> {
        self.keyword("FROM")?;
        let table = self.qualified_name()?;
        let key_column = self.where_key()?;
        Ok(Statement::Delete { table, key_column })
    }
}
