use std::collections::HashMap;

use crate::ast::{
    Assignment, ColumnRef, Comparison, LogicOp, Operand, SelectColumns, SetExpr, WhereClause,
};
use crate::database::QueryResult;
use crate::data_type::DataType;
use crate::error::{Error, Result};
use crate::value::Value;

/// Column definition in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
}

/// A strictly-typed row store.
///
/// Invariant: every stored row has exactly one value per schema column and
/// each value's tag matches the column's declared type; `column_index` maps
/// every column name to its position and stays bijective with `columns`.
/// Rows keep insertion order; DELETE removes entries without reordering
/// the survivors.
#[derive(Debug)]
pub struct Table {
    pub name: String,
    columns: Vec<ColumnDef>,
    rows: Vec<Vec<Value>>,
    column_index: HashMap<String, usize>,
}

impl Table {
    /// Creates an empty table.
    ///
    /// # Errors
    /// Returns an error if two columns share a name, which would make the
    /// name-to-position map ambiguous.
    pub fn new(name: String, columns: Vec<ColumnDef>) -> Result<Self> {
        let mut column_index = HashMap::with_capacity(columns.len());
        for (position, column) in columns.iter().enumerate() {
            if column_index.insert(column.name.clone(), position).is_some() {
                return Err(Error::Table {
                    message: format!(
                        "duplicate column {:?} in table {:?}",
                        column.name, name
                    ),
                });
            }
        }
        Ok(Self {
            name,
            columns,
            rows: Vec::new(),
            column_index,
        })
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Resolves a column name to its position in the schema.
    pub fn column_position(&self, name: &str) -> Result<usize> {
        self.column_index.get(name).copied().ok_or_else(|| Error::Table {
            message: format!("column {:?} does not exist in table {:?}", name, self.name),
        })
    }

    /// Resolves a possibly qualified reference against this table. A
    /// qualifier is accepted only when it names this table.
    fn resolve_ref(&self, column: &ColumnRef) -> Result<usize> {
        if let Some(table) = &column.table {
            if table != &self.name {
                return Err(Error::Table {
                    message: format!(
                        "column {} does not belong to table {:?}",
                        column, self.name
                    ),
                });
            }
        }
        self.column_position(&column.column)
    }

    /// Appends a new row.
    ///
    /// Succeeds only if the value count matches the column count and every
    /// value's tag matches the declared type at its position; on failure
    /// the table is unchanged.
    pub fn insert(&mut self, values: Vec<Value>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::Table {
                message: format!(
                    "table {:?} has {} columns but {} values were supplied",
                    self.name,
                    self.columns.len(),
                    values.len()
                ),
            });
        }
        for (value, column) in values.iter().zip(&self.columns) {
            if value.data_type() != column.data_type {
                return Err(Error::Table {
                    message: format!(
                        "column {:?} of table {:?} holds {} but value {:?} has type {}",
                        column.name,
                        self.name,
                        column.data_type,
                        value,
                        value.data_type()
                    ),
                });
            }
        }
        self.rows.push(values);
        Ok(())
    }

    /// Evaluates a WHERE predicate against one row. Both sides of an
    /// AND/OR are always evaluated, so a type error on either side
    /// surfaces no matter what the other side decides.
    fn eval_where(&self, clause: &WhereClause, row: &[Value]) -> Result<bool> {
        let first = self.eval_comparison(&clause.first, row)?;
        match &clause.rest {
            None => Ok(first),
            Some((logic, second)) => {
                let second = self.eval_comparison(second, row)?;
                Ok(match logic {
                    LogicOp::And => first && second,
                    LogicOp::Or => first || second,
                })
            }
        }
    }

    fn eval_comparison(&self, comparison: &Comparison, row: &[Value]) -> Result<bool> {
        let left = &row[self.resolve_ref(&comparison.left)?];
        match &comparison.right {
            Operand::Literal(value) => left.compare(comparison.op, value),
            Operand::Column(column) => {
                let right = &row[self.resolve_ref(column)?];
                left.compare(comparison.op, right)
            }
        }
    }

    /// True when the row passes the predicate; a missing predicate
    /// matches every row.
    fn matches(&self, where_clause: Option<&WhereClause>, row: &[Value]) -> Result<bool> {
        match where_clause {
            Some(clause) => self.eval_where(clause, row),
            None => Ok(true),
        }
    }

    /// Filters and projects rows.
    ///
    /// Projection columns are resolved before any row is visited, so an
    /// unknown column fails without producing a partial result. Row order
    /// is insertion order.
    pub fn select(
        &self,
        columns: &SelectColumns,
        where_clause: Option<&WhereClause>,
    ) -> Result<QueryResult> {
        let (header, positions): (Vec<String>, Vec<usize>) = match columns {
            SelectColumns::All => self
                .columns
                .iter()
                .enumerate()
                .map(|(position, column)| (column.name.clone(), position))
                .unzip(),
            SelectColumns::Named(names) => {
                let mut positions = Vec::with_capacity(names.len());
                for name in names {
                    positions.push(self.column_position(name)?);
                }
                (names.clone(), positions)
            }
        };

        let mut result_rows = Vec::new();
        for row in &self.rows {
            if self.matches(where_clause, row)? {
                result_rows.push(positions.iter().map(|&i| row[i].clone()).collect());
            }
        }

        Ok(QueryResult {
            columns: header,
            rows: result_rows,
        })
    }

    /// Evaluates a SET expression over one row's pre-update values.
    fn eval_set_expr(&self, expr: &SetExpr, row: &[Value]) -> Result<Value> {
        match expr {
            SetExpr::Literal(value) => Ok(value.clone()),
            SetExpr::Column(name) => Ok(row[self.column_position(name)?].clone()),
            SetExpr::Binary { left, op, right } => {
                let left = self.eval_set_expr(left, row)?;
                let right = self.eval_set_expr(right, row)?;
                left.arithmetic(*op, &right)
            }
        }
    }

    /// Applies SET assignments to every row matching the predicate.
    ///
    /// For each row, every assignment is evaluated against the row's
    /// pre-update values and type-checked against its target column before
    /// anything is written back, so a failing assignment leaves the row
    /// exactly as it was.
    pub fn update(
        &mut self,
        assignments: &[Assignment],
        where_clause: Option<&WhereClause>,
    ) -> Result<()> {
        let mut targets = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            targets.push(self.column_position(&assignment.column)?);
        }

        for row_index in 0..self.rows.len() {
            let row = &self.rows[row_index];
            if !self.matches(where_clause, row)? {
                continue;
            }

            let mut updates = Vec::with_capacity(assignments.len());
            for (assignment, &target) in assignments.iter().zip(&targets) {
                let value = self.eval_set_expr(&assignment.expr, row)?;
                let declared = self.columns[target].data_type;
                if value.data_type() != declared {
                    return Err(Error::Table {
                        message: format!(
                            "UPDATE would store a {} value {:?} into column {:?} of type {}",
                            value.data_type(),
                            value,
                            assignment.column,
                            declared
                        ),
                    });
                }
                updates.push((target, value));
            }

            let row = &mut self.rows[row_index];
            for (target, value) in updates {
                row[target] = value;
            }
        }
        Ok(())
    }

    /// Removes every row matching the predicate. With no predicate the
    /// table is cleared. Matching nothing is not an error.
    pub fn delete(&mut self, where_clause: Option<&WhereClause>) -> Result<()> {
        let Some(clause) = where_clause else {
            self.rows.clear();
            return Ok(());
        };

        let mut keep = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            keep.push(!self.eval_where(clause, row)?);
        }
        let mut keep = keep.into_iter();
        self.rows.retain(|_| keep.next().unwrap_or(false));
        Ok(())
    }
}
