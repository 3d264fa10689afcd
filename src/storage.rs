use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::database::Database;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::table::ColumnDef;
use crate::value::Value;

/// Serializes a database to the line-oriented snapshot format:
///
/// ```text
/// DATABASE <name>
/// TABLES <count>
/// TABLE "<name>"
/// COLUMNS <n>
/// "<column name>" <INTEGER|FLOAT|TEXT>
/// ROWS <n>
/// <TAG> <value> <TAG> <value> …
/// ```
///
/// TEXT values are double-quoted with `"` and `\` backslash-escaped, so
/// [deserialize] restores every text value exactly. Tables are emitted in
/// name order to keep snapshots deterministic.
pub fn serialize(database: &Database) -> String {
    let mut out = String::new();
    let mut names = database.list_tables();
    names.sort_unstable();

    let _ = writeln!(out, "DATABASE {}", database.name());
    let _ = writeln!(out, "TABLES {}", names.len());

    for name in names {
        // the name came from the database's own listing
        let Ok(table) = database.table(name) else {
            continue;
        };
        let _ = writeln!(out, "TABLE {}", quote(name));
        let _ = writeln!(out, "COLUMNS {}", table.columns().len());
        for column in table.columns() {
            let _ = writeln!(out, "{} {}", quote(&column.name), column.data_type);
        }
        let _ = writeln!(out, "ROWS {}", table.row_count());
        for row in table.rows() {
            let mut line = String::new();
            for value in row {
                if !line.is_empty() {
                    line.push(' ');
                }
                match value {
                    Value::Integer(i) => {
                        let _ = write!(line, "INTEGER {}", i);
                    }
                    Value::Float(v) => {
                        let _ = write!(line, "FLOAT {}", v);
                    }
                    Value::Text(s) => {
                        let _ = write!(line, "TEXT {}", quote(s));
                    }
                }
            }
            let _ = writeln!(out, "{}", line);
        }
    }

    out
}

/// Strict inverse of [serialize].
///
/// # Errors
/// Any malformed count, unknown type or tag token, unterminated quoted
/// string, or value that does not match its column's declared type raises
/// a storage error carrying the 1-based line within the snapshot.
pub fn deserialize(text: &str) -> Result<Database> {
    let mut reader = Reader::new(text);

    let name = reader.expect_field("DATABASE")?.to_string();
    let table_count: usize = reader.expect_count("TABLES")?;

    let mut database = Database::new(name);
    for _ in 0..table_count {
        read_table(&mut reader, &mut database)?;
    }

    if let Some(line) = reader.peek_nonempty() {
        return Err(reader.error(format!("trailing content {:?} after the last table", line)));
    }

    Ok(database)
}

/// Writes a snapshot to disk. The `.db` extension is the convention for
/// snapshot files.
pub fn save(database: &Database, path: &Path) -> Result<()> {
    fs::write(path, serialize(database))?;
    info!(database = database.name(), path = %path.display(), "saved snapshot");
    Ok(())
}

/// Restores a database from a snapshot file.
pub fn load(path: &Path) -> Result<Database> {
    let text = fs::read_to_string(path)?;
    let database = deserialize(&text)?;
    info!(database = database.name(), path = %path.display(), "loaded snapshot");
    Ok(database)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn read_table(reader: &mut Reader, database: &mut Database) -> Result<()> {
    let header = reader.expect_field("TABLE")?.to_string();
    let (table_name, rest) = parse_quoted(&header).map_err(|m| reader.error(m))?;
    if !rest.trim().is_empty() {
        return Err(reader.error(format!("unexpected content {:?} after the table name", rest)));
    }

    let column_count: usize = reader.expect_count("COLUMNS")?;
    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let line = reader.next_line()?.to_string();
        let (name, rest) = parse_quoted(&line).map_err(|m| reader.error(m))?;
        let data_type = match rest.trim() {
            "INTEGER" => DataType::Integer,
            "FLOAT" => DataType::Float,
            "TEXT" => DataType::Text,
            other => return Err(reader.error(format!("unknown type token {:?}", other))),
        };
        columns.push(ColumnDef { name, data_type });
    }

    database
        .create_table(table_name.clone(), columns)
        .map_err(|e| reader.error(e.to_string()))?;

    let row_count: usize = reader.expect_count("ROWS")?;
    for _ in 0..row_count {
        let line = reader.next_line()?.to_string();
        let values = parse_row(&line).map_err(|m| reader.error(m))?;
        database
            .table_mut(&table_name)
            .and_then(|table| table.insert(values))
            .map_err(|e| reader.error(e.to_string()))?;
    }

    Ok(())
}

/// Parses one `<TAG> <value> …` row line.
fn parse_row(line: &str) -> std::result::Result<Vec<Value>, String> {
    let mut values = Vec::new();
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        let (tag, after_tag) = match rest.split_once(' ') {
            Some(split) => split,
            None => return Err(format!("tag {:?} has no value", rest)),
        };
        rest = after_tag.trim_start();
        match tag {
            "INTEGER" => {
                let (token, after) = split_token(rest);
                let parsed = token
                    .parse::<i64>()
                    .map_err(|_| format!("malformed INTEGER value {:?}", token))?;
                values.push(Value::Integer(parsed));
                rest = after.trim_start();
            }
            "FLOAT" => {
                let (token, after) = split_token(rest);
                let parsed = token
                    .parse::<f64>()
                    .map_err(|_| format!("malformed FLOAT value {:?}", token))?;
                values.push(Value::Float(parsed));
                rest = after.trim_start();
            }
            "TEXT" => {
                let (content, after) = parse_quoted(rest)?;
                values.push(Value::Text(content.into()));
                rest = after.trim_start();
            }
            other => return Err(format!("unknown value tag {:?}", other)),
        }
    }

    Ok(values)
}

fn split_token(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest),
        None => (s, ""),
    }
}

/// Parses a leading double-quoted string with backslash escapes, returning
/// the content and the remaining input.
fn parse_quoted(s: &str) -> std::result::Result<(String, &str), String> {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, '"')) => {}
        _ => return Err(format!("expected a double-quoted string, found {:?}", s)),
    }

    let mut content = String::new();
    let mut escaped = false;
    for (index, c) in chars {
        if escaped {
            content.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Ok((content, &s[index + c.len_utf8()..]));
        } else {
            content.push(c);
        }
    }

    Err("unterminated quoted string".into())
}

/// Line cursor over the snapshot text, tracking the 1-based line number
/// for error reporting.
struct Reader<'a> {
    lines: Vec<&'a str>,
    position: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            position: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Storage {
            message: message.into(),
            line: self.position,
        }
    }

    fn next_line(&mut self) -> Result<&'a str> {
        // skip blank lines between records
        while self.position < self.lines.len() {
            let line = self.lines[self.position];
            self.position += 1;
            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
        Err(Error::Storage {
            message: "unexpected end of snapshot".into(),
            line: self.lines.len(),
        })
    }

    fn peek_nonempty(&self) -> Option<&'a str> {
        self.lines[self.position..]
            .iter()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
    }

    /// Reads a `<KEYWORD> <rest>` line and returns the rest.
    fn expect_field(&mut self, keyword: &str) -> Result<&'a str> {
        let line = self.next_line()?;
        match line.split_once(' ') {
            Some((head, rest)) if head == keyword => Ok(rest.trim()),
            _ => Err(self.error(format!("expected a {} line, found {:?}", keyword, line))),
        }
    }

    fn expect_count(&mut self, keyword: &str) -> Result<usize> {
        let field = self.expect_field(keyword)?;
        field
            .parse::<usize>()
            .map_err(|_| self.error(format!("malformed {} count {:?}", keyword, field)))
    }
}
