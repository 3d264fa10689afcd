use std::collections::HashMap;

use tracing::debug;

use crate::ast::{
    Comparison, InnerJoin, LogicOp, Operand, QualifiedColumn, Statement, WhereClause,
};
use crate::error::{Error, Result};
use crate::table::{ColumnDef, Table};
use crate::value::Value;

/// Represents the result of a successful SELECT or INNER JOIN query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// The names of the columns included in the result set. For joins
    /// these are qualified `table.column` names.
    pub columns: Vec<String>,
    /// The actual data, returned as a vector of rows, where each row is a
    /// vector of [Value].
    pub rows: Vec<Vec<Value>>,
}

/// A named collection of tables.
#[derive(Debug)]
pub struct Database {
    name: String,
    tables: HashMap<String, Table>,
}

impl Database {
    /// Creates a new, empty database instance.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a new table in the database.
    ///
    /// # Errors
    /// Returns an error if a table with the same name already exists.
    pub fn create_table(&mut self, name: String, columns: Vec<ColumnDef>) -> Result<()> {
        if self.tables.contains_key(&name) {
            return Err(Error::Database {
                message: format!("table {:?} already exists in database {:?}", name, self.name),
            });
        }
        let table = Table::new(name.clone(), columns)?;
        self.tables.insert(name, table);
        Ok(())
    }

    /// Removes a table from the database by its name.
    ///
    /// # Errors
    /// Returns an error if the table does not exist.
    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        match self.tables.remove(name) {
            Some(_) => Ok(()),
            None => Err(Error::Database {
                message: format!("table {:?} does not exist in database {:?}", name, self.name),
            }),
        }
    }

    /// Retrieves a reference to a table by name.
    pub fn table(&self, name: &str) -> Result<&Table> {
        self.tables.get(name).ok_or_else(|| Error::Database {
            message: format!("table {:?} does not exist in database {:?}", name, self.name),
        })
    }

    /// Retrieves a mutable reference to a table by name.
    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        let db_name = self.name.clone();
        self.tables.get_mut(name).ok_or_else(|| Error::Database {
            message: format!("table {:?} does not exist in database {:?}", name, db_name),
        })
    }

    /// Returns a list of all table names currently stored in the database.
    pub fn list_tables(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Executes a multi-table INNER JOIN.
    ///
    /// The first table drives the join. Every `INNER JOIN … ON` clause
    /// nested-loops the rows accumulated so far against the next table's
    /// full row set, keeping only the concatenations whose ON comparison
    /// holds (strict inner join, no padding). The optional WHERE then
    /// filters the concatenated rows, and the requested `table.column`
    /// list is projected in request order.
    ///
    /// Complexity is the product of the participating table sizes; there
    /// is no join index at this engine's scale.
    pub fn inner_join(&self, stmt: &InnerJoin) -> Result<QueryResult> {
        let driving = self.table(&stmt.table)?;

        // Offsets of every qualified column within the concatenated row.
        let mut layout: HashMap<String, usize> = HashMap::new();
        for (position, column) in driving.columns().iter().enumerate() {
            layout.insert(format!("{}.{}", stmt.table, column.name), position);
        }
        let mut width = driving.columns().len();

        let mut rows: Vec<Vec<Value>> = driving.rows().to_vec();

        for join in &stmt.joins {
            let next = self.table(&join.table)?;
            let base = width;
            for (position, column) in next.columns().iter().enumerate() {
                layout.insert(format!("{}.{}", join.table, column.name), base + position);
            }
            width += next.columns().len();

            let left = Self::join_offset(&layout, &join.left)?;
            let right = Self::join_offset(&layout, &join.right)?;

            let mut joined = Vec::new();
            for row in &rows {
                for next_row in next.rows() {
                    let left_value = side_value(row, next_row, base, left);
                    let right_value = side_value(row, next_row, base, right);
                    if left_value.compare(join.op, right_value)? {
                        let mut combined = row.clone();
                        combined.extend_from_slice(next_row);
                        joined.push(combined);
                    }
                }
            }
            rows = joined;
        }

        if let Some(clause) = &stmt.where_clause {
            let mut filtered = Vec::with_capacity(rows.len());
            for row in rows {
                if Self::eval_join_where(clause, &row, &layout)? {
                    filtered.push(row);
                }
            }
            rows = filtered;
        }

        let mut positions = Vec::with_capacity(stmt.columns.len());
        for column in &stmt.columns {
            positions.push(Self::join_offset(&layout, column)?);
        }

        let result_rows = rows
            .iter()
            .map(|row| positions.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(QueryResult {
            columns: stmt.columns.iter().map(|c| c.to_string()).collect(),
            rows: result_rows,
        })
    }

    fn join_offset(layout: &HashMap<String, usize>, column: &QualifiedColumn) -> Result<usize> {
        layout
            .get(&column.to_string())
            .copied()
            .ok_or_else(|| Error::Table {
                message: format!("column {} does not appear in the join", column),
            })
    }

    /// WHERE evaluation over a concatenated join row. Every column
    /// reference must be qualified, since the same column name can occur
    /// in several joined tables.
    fn eval_join_where(
        clause: &WhereClause,
        row: &[Value],
        layout: &HashMap<String, usize>,
    ) -> Result<bool> {
        let first = Self::eval_join_comparison(&clause.first, row, layout)?;
        match &clause.rest {
            None => Ok(first),
            Some((logic, second)) => {
                let second = Self::eval_join_comparison(second, row, layout)?;
                Ok(match logic {
                    LogicOp::And => first && second,
                    LogicOp::Or => first || second,
                })
            }
        }
    }

    fn eval_join_comparison(
        comparison: &Comparison,
        row: &[Value],
        layout: &HashMap<String, usize>,
    ) -> Result<bool> {
        let left = &row[Self::join_ref_offset(layout, &comparison.left.table, &comparison.left.column)?];
        match &comparison.right {
            Operand::Literal(value) => left.compare(comparison.op, value),
            Operand::Column(column) => {
                let right = &row[Self::join_ref_offset(layout, &column.table, &column.column)?];
                left.compare(comparison.op, right)
            }
        }
    }

    fn join_ref_offset(
        layout: &HashMap<String, usize>,
        table: &Option<String>,
        column: &str,
    ) -> Result<usize> {
        let Some(table) = table else {
            return Err(Error::Table {
                message: format!(
                    "column reference {:?} in a join must be qualified as table.column",
                    column
                ),
            });
        };
        layout
            .get(&format!("{}.{}", table, column))
            .copied()
            .ok_or_else(|| Error::Table {
                message: format!("column {}.{} does not appear in the join", table, column),
            })
    }
}

/// Reads an offset of the candidate concatenated row before it is
/// materialized: offsets below `base` fall into the accumulated left row,
/// the rest into the row of the table being joined.
fn side_value<'a>(row: &'a [Value], next_row: &'a [Value], base: usize, offset: usize) -> &'a Value {
    if offset < base {
        &row[offset]
    } else {
        &next_row[offset - base]
    }
}

/// The statement dispatcher: a set of named databases plus the currently
/// selected one.
///
/// A plain owned value, created and held by the driver for the duration of
/// one script run. Two modes are supported: [Engine::new] starts with no
/// database selected (scripts must CREATE/USE DATABASE first), while
/// [Engine::with_default] provides an implicitly selected default database.
#[derive(Default)]
pub struct Engine {
    databases: HashMap<String, Database>,
    current: Option<String>,
}

impl Engine {
    /// Multi-database mode: executing a table statement before any
    /// CREATE DATABASE or USE DATABASE is a "no database selected" error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-database mode with an implicitly created and selected
    /// default database.
    pub fn with_default(name: &str) -> Self {
        let mut engine = Self::new();
        engine
            .databases
            .insert(name.to_string(), Database::new(name));
        engine.current = Some(name.to_string());
        engine
    }

    /// Creates a new database and selects it, so a following USE is not
    /// required.
    pub fn create_database(&mut self, name: &str) -> Result<()> {
        if self.databases.contains_key(name) {
            return Err(Error::Database {
                message: format!("database {:?} already exists", name),
            });
        }
        debug!(database = name, "creating database");
        self.databases.insert(name.to_string(), Database::new(name));
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Selects an existing database as the target of table statements.
    pub fn use_database(&mut self, name: &str) -> Result<()> {
        if !self.databases.contains_key(name) {
            return Err(Error::Database {
                message: format!("database {:?} does not exist", name),
            });
        }
        debug!(database = name, "switching database");
        self.current = Some(name.to_string());
        Ok(())
    }

    /// Registers an already-built database (e.g. one restored from a
    /// snapshot) and selects it.
    pub fn attach(&mut self, database: Database) -> Result<()> {
        let name = database.name().to_string();
        if self.databases.contains_key(&name) {
            return Err(Error::Database {
                message: format!("database {:?} already exists", name),
            });
        }
        self.current = Some(name.clone());
        self.databases.insert(name, database);
        Ok(())
    }

    /// The currently selected database.
    pub fn current(&self) -> Result<&Database> {
        self.current
            .as_deref()
            .and_then(|name| self.databases.get(name))
            .ok_or_else(|| Error::Database {
                message: "no database selected".into(),
            })
    }

    fn current_mut(&mut self) -> Result<&mut Database> {
        let name = self.current.clone().ok_or_else(|| Error::Database {
            message: "no database selected".into(),
        })?;
        self.databases.get_mut(&name).ok_or_else(|| Error::Database {
            message: "no database selected".into(),
        })
    }

    /// Executes one parsed statement against the selected database.
    ///
    /// SELECT and INNER JOIN return `Some(QueryResult)` for the caller's
    /// writer; every other statement returns `None`. Errors propagate to
    /// the caller untouched; continuing with the next statement is the
    /// driver's policy, not the engine's.
    pub fn execute(&mut self, statement: Statement) -> Result<Option<QueryResult>> {
        match statement {
            Statement::CreateDatabase(stmt) => {
                self.create_database(&stmt.name)?;
                Ok(None)
            }
            Statement::UseDatabase(stmt) => {
                self.use_database(&stmt.name)?;
                Ok(None)
            }
            Statement::CreateTable(stmt) => {
                debug!(table = %stmt.name, "creating table");
                self.current_mut()?.create_table(stmt.name, stmt.columns)?;
                Ok(None)
            }
            Statement::DropTable(stmt) => {
                debug!(table = %stmt.name, "dropping table");
                self.current_mut()?.drop_table(&stmt.name)?;
                Ok(None)
            }
            Statement::Insert(stmt) => {
                self.current_mut()?
                    .table_mut(&stmt.table)?
                    .insert(stmt.values)?;
                Ok(None)
            }
            Statement::Select(stmt) => {
                let result = self
                    .current()?
                    .table(&stmt.table)?
                    .select(&stmt.columns, stmt.where_clause.as_ref())?;
                Ok(Some(result))
            }
            Statement::Update(stmt) => {
                self.current_mut()?
                    .table_mut(&stmt.table)?
                    .update(&stmt.assignments, stmt.where_clause.as_ref())?;
                Ok(None)
            }
            Statement::Delete(stmt) => {
                self.current_mut()?
                    .table_mut(&stmt.table)?
                    .delete(stmt.where_clause.as_ref())?;
                Ok(None)
            }
            Statement::InnerJoin(stmt) => {
                let result = self.current()?.inner_join(&stmt)?;
                Ok(Some(result))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use crate::tokenizer::Lexer;

    fn exec(engine: &mut Engine, sql: &str) -> Result<Option<QueryResult>> {
        let tokens = Lexer::new(sql, 1).tokenize()?;
        let statement = Parser::new(tokens)
            .parse()?
            .expect("test statements are never empty");
        engine.execute(statement)
    }

    fn query(engine: &mut Engine, sql: &str) -> QueryResult {
        exec(engine, sql).unwrap().expect("expected a result set")
    }

    fn engine_with_users() -> Engine {
        let mut engine = Engine::with_default("main");
        exec(&mut engine, "CREATE TABLE users (id INTEGER, name TEXT)").unwrap();
        exec(&mut engine, "INSERT INTO users VALUES (1, 'a')").unwrap();
        exec(&mut engine, "INSERT INTO users VALUES (2, 'b')").unwrap();
        exec(&mut engine, "INSERT INTO users VALUES (3, 'c')").unwrap();
        engine
    }

    #[test]
    fn test_create_and_drop_table() {
        let mut engine = Engine::with_default("main");

        exec(&mut engine, "CREATE TABLE users (id INTEGER)").unwrap();
        assert!(engine.current().unwrap().table("users").is_ok());

        exec(&mut engine, "DROP TABLE users").unwrap();
        assert!(engine.current().unwrap().table("users").is_err());
    }

    #[test]
    fn test_duplicate_table_error() {
        let mut engine = Engine::with_default("main");

        exec(&mut engine, "CREATE TABLE users (id INTEGER)").unwrap();
        assert!(exec(&mut engine, "CREATE TABLE users (id INTEGER)").is_err());
    }

    #[test]
    fn test_drop_nonexistent_table() {
        let mut engine = Engine::with_default("main");
        assert!(exec(&mut engine, "DROP TABLE unknown").is_err());
    }

    #[test]
    fn test_list_tables() {
        let mut engine = Engine::with_default("main");
        exec(&mut engine, "CREATE TABLE users (id INTEGER)").unwrap();
        exec(&mut engine, "CREATE TABLE posts (id INTEGER)").unwrap();

        let mut tables = engine.current().unwrap().list_tables();
        tables.sort_unstable();
        assert_eq!(tables, vec!["posts", "users"]);
    }

    #[test]
    fn test_insert_and_select_star() {
        let mut engine = engine_with_users();
        let result = query(&mut engine, "SELECT * FROM users");

        assert_eq!(result.columns, vec!["id", "name"]);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(
            result.rows[0],
            vec![Value::Integer(1), Value::Text("a".into())]
        );
        assert_eq!(
            result.rows[1],
            vec![Value::Integer(2), Value::Text("b".into())]
        );
    }

    #[test]
    fn test_select_with_where_and_or() {
        let mut engine = engine_with_users();

        let result = query(&mut engine, "SELECT name FROM users WHERE id > 1 AND id < 3");
        assert_eq!(result.rows, vec![vec![Value::Text("b".into())]]);

        let result = query(&mut engine, "SELECT name FROM users WHERE id = 1 OR id = 3");
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_select_no_match_is_empty_not_error() {
        let mut engine = engine_with_users();
        let result = query(&mut engine, "SELECT * FROM users WHERE id > 99");
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_insert_swapped_types_rejected() {
        let mut engine = engine_with_users();

        let result = exec(&mut engine, "INSERT INTO users VALUES ('oops', 1)");
        assert!(matches!(result, Err(Error::Table { .. })));

        let rows = query(&mut engine, "SELECT * FROM users").rows;
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_where_text_against_integer_is_table_error() {
        let mut engine = engine_with_users();
        let result = exec(&mut engine, "SELECT * FROM users WHERE name = 5");
        assert!(matches!(result, Err(Error::Table { .. })));
    }

    #[test]
    fn test_update_with_arithmetic() {
        let mut engine = engine_with_users();
        exec(&mut engine, "UPDATE users SET id = id * 10 + 1 WHERE id > 1").unwrap();

        let result = query(&mut engine, "SELECT id FROM users");
        assert_eq!(
            result.rows,
            vec![
                vec![Value::Integer(1)],
                vec![Value::Integer(21)],
                vec![Value::Integer(31)],
            ]
        );
    }

    #[test]
    fn test_identity_update_round_trips() {
        let mut engine = engine_with_users();
        exec(&mut engine, "UPDATE users SET name = name WHERE id = 1").unwrap();

        let result = query(&mut engine, "SELECT * FROM users");
        assert_eq!(
            result.rows[0],
            vec![Value::Integer(1), Value::Text("a".into())]
        );
    }

    #[test]
    fn test_delete_greater_than() {
        let mut engine = engine_with_users();
        exec(&mut engine, "DELETE FROM users WHERE id > 1").unwrap();

        let result = query(&mut engine, "SELECT * FROM users");
        assert_eq!(
            result.rows,
            vec![vec![Value::Integer(1), Value::Text("a".into())]]
        );
    }

    #[test]
    fn test_inner_join_single_match() {
        let mut engine = Engine::with_default("main");
        exec(&mut engine, "CREATE TABLE A (id INTEGER, v TEXT)").unwrap();
        exec(&mut engine, "INSERT INTO A VALUES (1, 'x')").unwrap();
        exec(&mut engine, "INSERT INTO A VALUES (2, 'y')").unwrap();
        exec(&mut engine, "CREATE TABLE B (aid INTEGER, w TEXT)").unwrap();
        exec(&mut engine, "INSERT INTO B VALUES (1, 'p')").unwrap();
        exec(&mut engine, "INSERT INTO B VALUES (3, 'q')").unwrap();

        let result = query(
            &mut engine,
            "SELECT A.id, B.w FROM A INNER JOIN B ON A.id = B.aid",
        );

        assert_eq!(result.columns, vec!["A.id", "B.w"]);
        assert_eq!(
            result.rows,
            vec![vec![Value::Integer(1), Value::Text("p".into())]]
        );
    }

    #[test]
    fn test_inner_join_three_tables_with_where() {
        let mut engine = Engine::with_default("main");
        exec(&mut engine, "CREATE TABLE a (x INTEGER)").unwrap();
        exec(&mut engine, "CREATE TABLE b (x INTEGER)").unwrap();
        exec(&mut engine, "CREATE TABLE c (x INTEGER, tag TEXT)").unwrap();
        for i in 1..=3 {
            exec(&mut engine, &format!("INSERT INTO a VALUES ({})", i)).unwrap();
            exec(&mut engine, &format!("INSERT INTO b VALUES ({})", i)).unwrap();
            exec(&mut engine, &format!("INSERT INTO c VALUES ({}, 't{}')", i, i)).unwrap();
        }

        let result = query(
            &mut engine,
            "SELECT c.tag FROM a \
             INNER JOIN b ON a.x = b.x \
             INNER JOIN c ON b.x = c.x \
             WHERE a.x > 1 AND c.tag != 't3'",
        );

        assert_eq!(result.rows, vec![vec![Value::Text("t2".into())]]);
    }

    #[test]
    fn test_inner_join_no_match_is_empty() {
        let mut engine = Engine::with_default("main");
        exec(&mut engine, "CREATE TABLE l (id INTEGER)").unwrap();
        exec(&mut engine, "CREATE TABLE r (id INTEGER)").unwrap();
        exec(&mut engine, "INSERT INTO l VALUES (1)").unwrap();
        exec(&mut engine, "INSERT INTO r VALUES (2)").unwrap();

        let result = query(&mut engine, "SELECT l.id FROM l INNER JOIN r ON l.id = r.id");
        assert!(result.rows.is_empty());
    }

    #[test]
    fn test_join_unknown_qualified_column() {
        let mut engine = Engine::with_default("main");
        exec(&mut engine, "CREATE TABLE l (id INTEGER)").unwrap();
        exec(&mut engine, "CREATE TABLE r (id INTEGER)").unwrap();

        let result = exec(
            &mut engine,
            "SELECT l.missing FROM l INNER JOIN r ON l.id = r.id",
        );
        assert!(matches!(result, Err(Error::Table { .. })));
    }

    #[test]
    fn test_no_database_selected() {
        let mut engine = Engine::new();
        let result = exec(&mut engine, "CREATE TABLE t (id INTEGER)");
        match result {
            Err(Error::Database { message }) => assert!(message.contains("no database selected")),
            other => panic!("expected a database error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_database_selects_it() {
        let mut engine = Engine::new();
        exec(&mut engine, "CREATE DATABASE shop").unwrap();
        exec(&mut engine, "CREATE TABLE t (id INTEGER)").unwrap();
        assert_eq!(engine.current().unwrap().name(), "shop");
    }

    #[test]
    fn test_use_database_switches() {
        let mut engine = Engine::new();
        exec(&mut engine, "CREATE DATABASE one").unwrap();
        exec(&mut engine, "CREATE TABLE t (id INTEGER)").unwrap();
        exec(&mut engine, "CREATE DATABASE two").unwrap();
        assert!(exec(&mut engine, "INSERT INTO t VALUES (1)").is_err());

        exec(&mut engine, "USE DATABASE one").unwrap();
        exec(&mut engine, "INSERT INTO t VALUES (1)").unwrap();
    }

    #[test]
    fn test_unknown_database_error() {
        let mut engine = Engine::new();
        assert!(exec(&mut engine, "USE DATABASE nope").is_err());
    }

    #[test]
    fn test_duplicate_database_error() {
        let mut engine = Engine::new();
        exec(&mut engine, "CREATE DATABASE shop").unwrap();
        assert!(exec(&mut engine, "CREATE DATABASE shop").is_err());
    }
}
