//! Line-oriented command layer used by the interactive shell.

use crate::{
    executor::query::Query,
    storage::database::Database,
    types::{ColumnId, ColumnValue, error::DatabaseError, record::Record},
};

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("No table selected; run `use <table>` first")]
    NoTableSelected,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexAction {
    Create,
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create {
        name: String,
        num_columns: usize,
        key_column: ColumnId,
    },
    Use(String),
    Drop(String),
    Tables,
    Insert(Vec<ColumnValue>),
    Select {
        key: ColumnValue,
        key_column: Option<ColumnId>,
        relative_version: i64,
    },
    Update {
        key: ColumnValue,
        columns: Vec<Option<ColumnValue>>,
    },
    Delete(ColumnValue),
    Sum {
        begin: ColumnValue,
        end: ColumnValue,
        column: ColumnId,
        relative_version: i64,
    },
    Increment {
        key: ColumnValue,
        column: ColumnId,
    },
    Index {
        action: IndexAction,
        column: ColumnId,
    },
    Stats,
    Merge,
}

fn parse_num<T: std::str::FromStr>(token: Option<&str>, what: &str) -> Result<T, ShellError> {
    let token = token.ok_or_else(|| ShellError::Parse(format!("missing {what}")))?;
    token
        .parse()
        .map_err(|_| ShellError::Parse(format!("invalid {what}: '{token}'")))
}

fn parse_opt_num<T: std::str::FromStr>(token: Option<&str>, what: &str) -> Result<Option<T>, ShellError> {
    match token {
        Some(_) => parse_num(token, what).map(Some),
        None => Ok(None),
    }
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, ShellError> {
        let mut tokens = input.split_whitespace();
        let verb = tokens
            .next()
            .ok_or_else(|| ShellError::Parse("empty command".to_string()))?
            .to_lowercase();

        let command = match verb.as_str() {
            "create" => Command::Create {
                name: tokens
                    .next()
                    .ok_or_else(|| ShellError::Parse("missing table name".to_string()))?
                    .to_string(),
                num_columns: parse_num(tokens.next(), "column count")?,
                key_column: parse_num(tokens.next(), "key column")?,
            },
            "use" | "drop" => {
                let name = tokens
                    .next()
                    .ok_or_else(|| ShellError::Parse("missing table name".to_string()))?
                    .to_string();
                if verb == "use" {
                    Command::Use(name)
                } else {
                    Command::Drop(name)
                }
            }
            "tables" => Command::Tables,
            "insert" => {
                let values = tokens
                    .map(|t| parse_num(Some(t), "value"))
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Insert(values)
            }
            "select" => Command::Select {
                key: parse_num(tokens.next(), "key")?,
                key_column: parse_opt_num(tokens.next(), "key column")?,
                relative_version: 0,
            },
            "version" => Command::Select {
                key: parse_num(tokens.next(), "key")?,
                relative_version: parse_num(tokens.next(), "relative version")?,
                key_column: parse_opt_num(tokens.next(), "key column")?,
            },
            "update" => {
                let key = parse_num(tokens.next(), "key")?;
                let columns = tokens
                    .map(|t| match t {
                        "_" => Ok(None),
                        _ => parse_num(Some(t), "value").map(Some),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Command::Update { key, columns }
            }
            "delete" => Command::Delete(parse_num(tokens.next(), "key")?),
            "sum" => Command::Sum {
                begin: parse_num(tokens.next(), "range start")?,
                end: parse_num(tokens.next(), "range end")?,
                column: parse_num(tokens.next(), "column")?,
                relative_version: parse_opt_num(tokens.next(), "relative version")?.unwrap_or(0),
            },
            "increment" | "inc" => Command::Increment {
                key: parse_num(tokens.next(), "key")?,
                column: parse_num(tokens.next(), "column")?,
            },
            "index" => {
                let action = match tokens.next() {
                    Some("create") => IndexAction::Create,
                    Some("drop") => IndexAction::Drop,
                    other => {
                        return Err(ShellError::Parse(format!(
                            "expected 'create' or 'drop', got {other:?}"
                        )));
                    }
                };
                Command::Index {
                    action,
                    column: parse_num(tokens.next(), "column")?,
                }
            }
            "stats" => Command::Stats,
            "merge" => Command::Merge,
            other => return Err(ShellError::Parse(format!("unknown command '{other}'"))),
        };
        Ok(command)
    }
}

fn format_record(record: &Record) -> String {
    let values: Vec<String> = record
        .columns
        .iter()
        .map(|v| v.map_or_else(|| "-".to_string(), |v| v.to_string()))
        .collect();
    format!("rid={} [{}]", record.rid, values.join(", "))
}

/// Holds the catalog and the currently selected table.
#[derive(Debug, Default)]
pub struct Shell {
    database: Database,
    current: Option<(String, Query)>,
}

impl Shell {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            current: None,
        }
    }

    pub fn current_table(&self) -> Option<&str> {
        self.current.as_ref().map(|(name, _)| name.as_str())
    }

    fn query(&self) -> Result<&Query, ShellError> {
        self.current
            .as_ref()
            .map(|(_, query)| query)
            .ok_or(ShellError::NoTableSelected)
    }

    pub fn execute(&mut self, command: Command) -> Result<String, ShellError> {
        match command {
            Command::Create {
                name,
                num_columns,
                key_column,
            } => {
                let table = self.database.create_table(&name, num_columns, key_column)?;
                self.current = Some((name.clone(), Query::new(table)));
                Ok(format!("Created table '{name}' ({num_columns} columns, key {key_column})"))
            }
            Command::Use(name) => {
                let table = self.database.get_table(&name)?;
                self.current = Some((name.clone(), Query::new(table)));
                Ok(format!("Using table '{name}'"))
            }
            Command::Drop(name) => {
                self.database.drop_table(&name)?;
                if self.current_table() == Some(name.as_str()) {
                    self.current = None;
                }
                Ok(format!("Dropped table '{name}'"))
            }
            Command::Tables => Ok(self.database.table_names().join("\n")),
            Command::Insert(values) => {
                let rid = self.query()?.insert(&values)?;
                Ok(format!("Inserted rid {rid}"))
            }
            Command::Select {
                key,
                key_column,
                relative_version,
            } => {
                let query = self.query()?;
                let (key_column, projection) = {
                    let table = query.table().read();
                    (
                        key_column.unwrap_or(table.key_column()),
                        vec![true; table.num_columns()],
                    )
                };
                let records =
                    query.select_version(key, key_column, &projection, relative_version)?;
                if records.is_empty() {
                    return Ok("(no rows)".to_string());
                }
                Ok(records.iter().map(format_record).collect::<Vec<_>>().join("\n"))
            }
            Command::Update { key, columns } => {
                self.query()?.update(key, &columns)?;
                Ok(format!("Updated key {key}"))
            }
            Command::Delete(key) => {
                self.query()?.delete(key)?;
                Ok(format!("Deleted key {key}"))
            }
            Command::Sum {
                begin,
                end,
                column,
                relative_version,
            } => {
                let total = self
                    .query()?
                    .sum_version(begin, end, column, relative_version)?;
                Ok(total.to_string())
            }
            Command::Increment { key, column } => {
                self.query()?.increment(key, column)?;
                Ok(format!("Incremented column {column} of key {key}"))
            }
            Command::Index { action, column } => {
                let query = self.query()?;
                match action {
                    IndexAction::Create => query.create_index(column)?,
                    IndexAction::Drop => query.drop_index(column)?,
                }
                Ok(format!("Index on column {column}: {action:?}"))
            }
            Command::Stats => {
                let stats = self.query()?.table().read().stats();
                Ok(format!(
                    "live rows: {}, allocated rids: {}, updated rows: {}, base pages: {}, tail pages: {}, tail records: {}",
                    stats.live_rows,
                    stats.allocated_rids,
                    stats.updated_rows,
                    stats.base_pages,
                    stats.tail_pages,
                    stats.tail_records
                ))
            }
            Command::Merge => {
                let stats = self.query()?.table().write().merge();
                Ok(format!("Merge hook ran over {} tail records", stats.tail_records))
            }
        }
    }
}
