use std::fmt;

use crate::table::ColumnDef;
use crate::value::Value;

/// One parsed SQL statement.
///
/// The engine dispatches on this sum type exhaustively, so an unhandled
/// statement kind cannot exist at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    CreateDatabase(CreateDatabase),
    UseDatabase(UseDatabase),
    CreateTable(CreateTable),
    DropTable(DropTable),
    Insert(Insert),
    Select(Select),
    Update(Update),
    Delete(Delete),
    InnerJoin(InnerJoin),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabase {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseDatabase {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: String,
    pub values: Vec<Value>,
}

/// The projection of a SELECT: either `*` or an explicit column list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectColumns {
    All,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub columns: SelectColumns,
    pub table: String,
    pub where_clause: Option<WhereClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: String,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<WhereClause>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: String,
    pub where_clause: Option<WhereClause>,
}

/// A column reference, optionally qualified by a table name (`users.id`).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// The right-hand side of a comparison: a literal or another column.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Column(ColumnRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: ColumnRef,
    pub op: CompareOp,
    pub right: Operand,
}

/// A WHERE predicate: one comparison, optionally joined with a second one
/// by a single AND/OR. The grammar deliberately stops there; chaining a
/// third comparison is a parse error.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub first: Comparison,
    pub rest: Option<(LogicOp, Comparison)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
        };
        write!(f, "{}", s)
    }
}

/// Arithmetic expression on the right-hand side of a SET assignment.
/// Operands are literals or (unqualified) column references of the
/// updated table; the columns are read from the row's pre-update values.
#[derive(Debug, Clone, PartialEq)]
pub enum SetExpr {
    Literal(Value),
    Column(String),
    Binary {
        left: Box<SetExpr>,
        op: ArithOp,
        right: Box<SetExpr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub expr: SetExpr,
}

/// A fully qualified `table.column` reference as required by INNER JOIN.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedColumn {
    pub table: String,
    pub column: String,
}

impl fmt::Display for QualifiedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// One `INNER JOIN <table> ON <left> <op> <right>` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    pub table: String,
    pub left: QualifiedColumn,
    pub op: CompareOp,
    pub right: QualifiedColumn,
}

/// A multi-table SELECT. The first table drives the nested-loop join;
/// join clauses are applied in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct InnerJoin {
    pub columns: Vec<QualifiedColumn>,
    pub table: String,
    pub joins: Vec<JoinClause>,
    pub where_clause: Option<WhereClause>,
}
