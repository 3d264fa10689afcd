use std::sync::Arc;

use crate::ast::*;
use crate::error::{Error, Result};
use crate::table::ColumnDef;
use crate::tokenizer::{Token, TokenKind};
use crate::value::Value;
use crate::DataType;

/// Recursive-descent parser over one statement's token sequence.
///
/// The grammar is LL(1) everywhere except the SELECT dispatch, which scans
/// the remaining tokens for INNER to decide between a plain SELECT and an
/// INNER JOIN statement.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses one statement. Returns `Ok(None)` if the input holds nothing
    /// but semicolons, otherwise exactly one [Statement].
    pub fn parse(&mut self) -> Result<Option<Statement>> {
        while self.check(TokenKind::Semicolon) {
            self.advance();
        }
        if self.is_at_end() {
            return Ok(None);
        }

        let statement = match self.current().kind {
            TokenKind::Create => self.parse_create()?,
            TokenKind::Use => self.parse_use_database()?,
            TokenKind::Drop => self.parse_drop_table()?,
            TokenKind::Insert => self.parse_insert()?,
            TokenKind::Select => {
                if self.contains_ahead(TokenKind::Inner) {
                    self.parse_inner_join()?
                } else {
                    self.parse_select()?
                }
            }
            TokenKind::Update => self.parse_update()?,
            TokenKind::Delete => self.parse_delete()?,
            _ => return Err(self.unexpected("a statement keyword")),
        };

        // semicolon is optional at the end of a split statement
        while self.check(TokenKind::Semicolon) {
            self.advance();
        }
        if !self.is_at_end() {
            return Err(self.unexpected("end of statement"));
        }

        Ok(Some(statement))
    }

    // --- cursor helpers ---

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    /// Advances over the current token if it has the given kind.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Scans the not-yet-consumed tokens for a kind. Used only for the
    /// SELECT / INNER JOIN dispatch.
    fn contains_ahead(&self, kind: TokenKind) -> bool {
        self.tokens[self.position..].iter().any(|t| t.kind == kind)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        let found = match token.kind {
            TokenKind::Eof => "end of statement".to_string(),
            _ => format!("{:?}", token.text),
        };
        Error::Parse {
            message: format!("expected {}, found {}", expected, found),
            line: token.line,
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &str) -> Result<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_identifier(&mut self, expected: &str) -> Result<String> {
        if self.check(TokenKind::Identifier) {
            let name = self.current().text.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_data_type(&mut self) -> Result<DataType> {
        let data_type = match self.current().kind {
            TokenKind::Integer => DataType::Integer,
            TokenKind::Float => DataType::Float,
            TokenKind::Text => DataType::Text,
            _ => return Err(self.unexpected("a column type (INTEGER, FLOAT or TEXT)")),
        };
        self.advance();
        Ok(data_type)
    }

    /// Converts the current literal token into a [Value] and advances.
    fn expect_literal(&mut self) -> Result<Value> {
        let token = self.current();
        let value = match token.kind {
            TokenKind::IntegerLiteral => {
                let parsed = token.text.parse::<i64>().map_err(|_| Error::Parse {
                    message: format!("integer literal {:?} is out of range", token.text),
                    line: token.line,
                })?;
                Value::Integer(parsed)
            }
            TokenKind::FloatLiteral => {
                let parsed = token.text.parse::<f64>().map_err(|_| Error::Parse {
                    message: format!("malformed float literal {:?}", token.text),
                    line: token.line,
                })?;
                Value::Float(parsed)
            }
            TokenKind::StringLiteral => Value::Text(Arc::from(token.text.as_str())),
            _ => return Err(self.unexpected("a literal value")),
        };
        self.advance();
        Ok(value)
    }

    // --- statements ---

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Create, "CREATE")?;
        match self.current().kind {
            TokenKind::Database => {
                self.advance();
                let name = self.expect_identifier("a database name")?;
                Ok(Statement::CreateDatabase(CreateDatabase { name }))
            }
            TokenKind::Table => {
                self.advance();
                self.parse_create_table()
            }
            _ => Err(self.unexpected("DATABASE or TABLE after CREATE")),
        }
    }

    fn parse_use_database(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Use, "USE")?;
        self.expect(TokenKind::Database, "DATABASE after USE")?;
        let name = self.expect_identifier("a database name")?;
        Ok(Statement::UseDatabase(UseDatabase { name }))
    }

    fn parse_create_table(&mut self) -> Result<Statement> {
        let name = self.expect_identifier("a table name")?;
        self.expect(TokenKind::LeftParen, "'(' before the column list")?;

        let mut columns = vec![];
        loop {
            columns.push(self.parse_column_def()?);
            match self.current().kind {
                TokenKind::RightParen => {
                    self.advance();
                    break;
                }
                TokenKind::Comma => {
                    self.advance();
                    continue;
                }
                _ => return Err(self.unexpected("',' or ')' in the column list")),
            }
        }

        Ok(Statement::CreateTable(CreateTable { name, columns }))
    }

    fn parse_column_def(&mut self) -> Result<ColumnDef> {
        let name = self.expect_identifier("a column name")?;
        let data_type = self.expect_data_type()?;
        Ok(ColumnDef { name, data_type })
    }

    fn parse_drop_table(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Drop, "DROP")?;
        self.expect(TokenKind::Table, "TABLE after DROP")?;
        let name = self.expect_identifier("a table name")?;
        Ok(Statement::DropTable(DropTable { name }))
    }

    fn parse_insert(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Insert, "INSERT")?;
        self.expect(TokenKind::Into, "INTO after INSERT")?;
        let table = self.expect_identifier("a table name")?;
        self.expect(TokenKind::Values, "VALUES")?;
        self.expect(TokenKind::LeftParen, "'(' before the value list")?;

        let mut values = vec![];
        loop {
            values.push(self.expect_literal()?);
            match self.current().kind {
                TokenKind::RightParen => {
                    self.advance();
                    break;
                }
                TokenKind::Comma => {
                    self.advance();
                    continue;
                }
                _ => return Err(self.unexpected("',' or ')' in the value list")),
            }
        }

        Ok(Statement::Insert(Insert { table, values }))
    }

    fn parse_select(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Select, "SELECT")?;

        let columns = if self.eat(TokenKind::Star) {
            SelectColumns::All
        } else {
            let mut names = vec![self.expect_identifier("a column name or '*'")?];
            while self.eat(TokenKind::Comma) {
                names.push(self.expect_identifier("a column name")?);
            }
            SelectColumns::Named(names)
        };

        self.expect(TokenKind::From, "FROM")?;
        let table = self.expect_identifier("a table name")?;
        let where_clause = self.parse_where_opt()?;

        Ok(Statement::Select(Select {
            columns,
            table,
            where_clause,
        }))
    }

    fn parse_update(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Update, "UPDATE")?;
        let table = self.expect_identifier("a table name")?;
        self.expect(TokenKind::Set, "SET")?;

        let mut assignments = vec![self.parse_assignment()?];
        while self.eat(TokenKind::Comma) {
            assignments.push(self.parse_assignment()?);
        }

        let where_clause = self.parse_where_opt()?;

        Ok(Statement::Update(Update {
            table,
            assignments,
            where_clause,
        }))
    }

    fn parse_assignment(&mut self) -> Result<Assignment> {
        let column = self.expect_identifier("a column name")?;
        self.expect(TokenKind::Equal, "'=' in the SET assignment")?;
        let expr = self.parse_additive()?;
        Ok(Assignment { column, expr })
    }

    // additive -> multiplicative (('+' | '-') multiplicative)*
    fn parse_additive(&mut self) -> Result<SetExpr> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => ArithOp::Add,
                TokenKind::Minus => ArithOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            node = SetExpr::Binary {
                left: Box::new(node),
                op,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    // multiplicative -> primary ('*' primary)*
    fn parse_multiplicative(&mut self) -> Result<SetExpr> {
        let mut node = self.parse_primary()?;
        while self.eat(TokenKind::Star) {
            let right = self.parse_primary()?;
            node = SetExpr::Binary {
                left: Box::new(node),
                op: ArithOp::Mul,
                right: Box::new(right),
            };
        }
        Ok(node)
    }

    // primary -> literal | column | '(' additive ')'
    fn parse_primary(&mut self) -> Result<SetExpr> {
        match self.current().kind {
            TokenKind::IntegerLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral => {
                Ok(SetExpr::Literal(self.expect_literal()?))
            }
            TokenKind::Identifier => {
                let column = self.expect_identifier("a column name")?;
                Ok(SetExpr::Column(column))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_additive()?;
                self.expect(TokenKind::RightParen, "')' closing the expression")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("a literal, column name or '('")),
        }
    }

    fn parse_delete(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Delete, "DELETE")?;
        self.expect(TokenKind::From, "FROM after DELETE")?;
        let table = self.expect_identifier("a table name")?;
        let where_clause = self.parse_where_opt()?;

        Ok(Statement::Delete(Delete {
            table,
            where_clause,
        }))
    }

    fn parse_inner_join(&mut self) -> Result<Statement> {
        self.expect(TokenKind::Select, "SELECT")?;

        let mut columns = vec![self.parse_qualified_column()?];
        while self.eat(TokenKind::Comma) {
            columns.push(self.parse_qualified_column()?);
        }

        self.expect(TokenKind::From, "FROM")?;
        let table = self.expect_identifier("a table name")?;

        let mut joins = vec![];
        while self.eat(TokenKind::Inner) {
            self.expect(TokenKind::Join, "JOIN after INNER")?;
            let join_table = self.expect_identifier("a table name")?;
            self.expect(TokenKind::On, "ON")?;
            let left = self.parse_qualified_column()?;
            let op = self.parse_compare_op()?;
            let right = self.parse_qualified_column()?;
            joins.push(JoinClause {
                table: join_table,
                left,
                op,
                right,
            });
        }

        let where_clause = self.parse_where_opt()?;

        Ok(Statement::InnerJoin(InnerJoin {
            columns,
            table,
            joins,
            where_clause,
        }))
    }

    fn parse_qualified_column(&mut self) -> Result<QualifiedColumn> {
        let table = self.expect_identifier("a table name")?;
        self.expect(TokenKind::Dot, "'.' in a qualified table.column name")?;
        let column = self.expect_identifier("a column name")?;
        Ok(QualifiedColumn { table, column })
    }

    // --- WHERE ---

    fn parse_where_opt(&mut self) -> Result<Option<WhereClause>> {
        if !self.eat(TokenKind::Where) {
            return Ok(None);
        }

        let first = self.parse_comparison()?;
        let rest = match self.current().kind {
            TokenKind::And => {
                self.advance();
                Some((LogicOp::And, self.parse_comparison()?))
            }
            TokenKind::Or => {
                self.advance();
                Some((LogicOp::Or, self.parse_comparison()?))
            }
            _ => None,
        };

        // The grammar stops at two comparisons joined by one logic operator.
        if self.check(TokenKind::And) || self.check(TokenKind::Or) {
            return Err(self.unexpected(
                "end of the WHERE clause (at most two comparisons joined by one AND/OR)",
            ));
        }

        Ok(Some(WhereClause { first, rest }))
    }

    fn parse_comparison(&mut self) -> Result<Comparison> {
        let left = self.parse_column_ref()?;
        let op = self.parse_compare_op()?;
        let right = match self.current().kind {
            TokenKind::IntegerLiteral | TokenKind::FloatLiteral | TokenKind::StringLiteral => {
                Operand::Literal(self.expect_literal()?)
            }
            TokenKind::Identifier => Operand::Column(self.parse_column_ref()?),
            _ => return Err(self.unexpected("a literal or column name")),
        };
        Ok(Comparison { left, op, right })
    }

    fn parse_column_ref(&mut self) -> Result<ColumnRef> {
        let first = self.expect_identifier("a column name")?;
        if self.eat(TokenKind::Dot) {
            let column = self.expect_identifier("a column name after '.'")?;
            Ok(ColumnRef {
                table: Some(first),
                column,
            })
        } else {
            Ok(ColumnRef {
                table: None,
                column: first,
            })
        }
    }

    fn parse_compare_op(&mut self) -> Result<CompareOp> {
        let op = match self.current().kind {
            TokenKind::Equal => CompareOp::Eq,
            TokenKind::NotEqual => CompareOp::NotEq,
            TokenKind::Less => CompareOp::Less,
            TokenKind::LessEq => CompareOp::LessEq,
            TokenKind::Greater => CompareOp::Greater,
            TokenKind::GreaterEq => CompareOp::GreaterEq,
            _ => return Err(self.unexpected("a comparison operator")),
        };
        self.advance();
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Lexer;

    fn parse(sql: &str) -> Result<Option<Statement>> {
        let tokens = Lexer::new(sql, 1).tokenize()?;
        Parser::new(tokens).parse()
    }

    fn parse_one(sql: &str) -> Statement {
        parse(sql).unwrap().expect("expected a statement")
    }

    #[test]
    fn test_parse_create_table() {
        match parse_one("CREATE TABLE users (id INTEGER, name TEXT, score FLOAT);") {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.name, "users");
                assert_eq!(ct.columns.len(), 3);
                assert_eq!(ct.columns[0].name, "id");
                assert_eq!(ct.columns[0].data_type, DataType::Integer);
                assert_eq!(ct.columns[1].name, "name");
                assert_eq!(ct.columns[1].data_type, DataType::Text);
                assert_eq!(ct.columns[2].data_type, DataType::Float);
            }
            other => panic!("expected CreateTable, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create_and_use_database() {
        assert_eq!(
            parse_one("CREATE DATABASE shop;"),
            Statement::CreateDatabase(CreateDatabase {
                name: "shop".into()
            })
        );
        assert_eq!(
            parse_one("USE DATABASE shop;"),
            Statement::UseDatabase(UseDatabase {
                name: "shop".into()
            })
        );
    }

    #[test]
    fn test_parse_drop_table() {
        assert_eq!(
            parse_one("DROP TABLE users;"),
            Statement::DropTable(DropTable {
                name: "users".into()
            })
        );
    }

    #[test]
    fn test_parse_insert() {
        match parse_one("INSERT INTO users VALUES (1, 'Alice', -2.5);") {
            Statement::Insert(insert) => {
                assert_eq!(insert.table, "users");
                assert_eq!(
                    insert.values,
                    vec![
                        Value::Integer(1),
                        Value::Text("Alice".into()),
                        Value::Float(-2.5),
                    ]
                );
            }
            other => panic!("expected Insert, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_rejects_non_literal_values() {
        assert!(parse("INSERT INTO users VALUES (id);").is_err());
        assert!(parse("INSERT INTO users VALUES ();").is_err());
    }

    #[test]
    fn test_parse_select_star() {
        match parse_one("SELECT * FROM users;") {
            Statement::Select(select) => {
                assert_eq!(select.columns, SelectColumns::All);
                assert_eq!(select.table, "users");
                assert!(select.where_clause.is_none());
            }
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_select_columns_and_where() {
        match parse_one("SELECT id, name FROM users WHERE age > 18 AND name != 'Bob';") {
            Statement::Select(select) => {
                assert_eq!(
                    select.columns,
                    SelectColumns::Named(vec!["id".into(), "name".into()])
                );
                let where_clause = select.where_clause.unwrap();
                assert_eq!(where_clause.first.left.column, "age");
                assert_eq!(where_clause.first.op, CompareOp::Greater);
                let (logic, second) = where_clause.rest.unwrap();
                assert_eq!(logic, LogicOp::And);
                assert_eq!(second.op, CompareOp::NotEq);
                assert_eq!(second.right, Operand::Literal(Value::Text("Bob".into())));
            }
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[test]
    fn test_where_column_to_column_comparison() {
        match parse_one("SELECT id FROM users WHERE age >= limit_age;") {
            Statement::Select(select) => {
                let where_clause = select.where_clause.unwrap();
                assert_eq!(
                    where_clause.first.right,
                    Operand::Column(ColumnRef {
                        table: None,
                        column: "limit_age".into()
                    })
                );
            }
            other => panic!("expected Select, got {:?}", other),
        }
    }

    #[test]
    fn test_where_rejects_third_comparison() {
        let err = parse("SELECT id FROM t WHERE a = 1 AND b = 2 OR c = 3;").unwrap_err();
        match err {
            Error::Parse { message, .. } => assert!(message.contains("at most two")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_expression_precedence() {
        match parse_one("UPDATE t SET a = a + 2 * 3 WHERE a > 0;") {
            Statement::Update(update) => {
                assert_eq!(update.assignments.len(), 1);
                let expr = &update.assignments[0].expr;
                // a + (2 * 3)
                match expr {
                    SetExpr::Binary { left, op, right } => {
                        assert_eq!(*op, ArithOp::Add);
                        assert_eq!(**left, SetExpr::Column("a".into()));
                        match &**right {
                            SetExpr::Binary { op, .. } => assert_eq!(*op, ArithOp::Mul),
                            other => panic!("expected Mul node, got {:?}", other),
                        }
                    }
                    other => panic!("expected Binary node, got {:?}", other),
                }
            }
            other => panic!("expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_parenthesized_expression() {
        match parse_one("UPDATE t SET a = (a + 1) * 2, b = 7;") {
            Statement::Update(update) => {
                assert_eq!(update.assignments.len(), 2);
                match &update.assignments[0].expr {
                    SetExpr::Binary { op, .. } => assert_eq!(*op, ArithOp::Mul),
                    other => panic!("expected Mul at the root, got {:?}", other),
                }
                assert_eq!(
                    update.assignments[1].expr,
                    SetExpr::Literal(Value::Integer(7))
                );
            }
            other => panic!("expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_update_column_minus_literal_is_subtraction() {
        // no whitespace around the minus: still col - 1, not the literal -1
        match parse_one("UPDATE t SET a = a-1;") {
            Statement::Update(update) => match &update.assignments[0].expr {
                SetExpr::Binary { left, op, right } => {
                    assert_eq!(*op, ArithOp::Sub);
                    assert_eq!(**left, SetExpr::Column("a".into()));
                    assert_eq!(**right, SetExpr::Literal(Value::Integer(1)));
                }
                other => panic!("expected Sub node, got {:?}", other),
            },
            other => panic!("expected Update, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_delete() {
        match parse_one("DELETE FROM users WHERE id > 1;") {
            Statement::Delete(delete) => {
                assert_eq!(delete.table, "users");
                assert!(delete.where_clause.is_some());
            }
            other => panic!("expected Delete, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_inner_join() {
        let sql = "SELECT A.id, B.w FROM A \
                   INNER JOIN B ON A.id = B.aid \
                   INNER JOIN C ON B.aid < C.ref \
                   WHERE A.id > 0 OR B.w = 'p';";
        match parse_one(sql) {
            Statement::InnerJoin(join) => {
                assert_eq!(join.table, "A");
                assert_eq!(join.columns.len(), 2);
                assert_eq!(join.columns[1].table, "B");
                assert_eq!(join.columns[1].column, "w");
                assert_eq!(join.joins.len(), 2);
                assert_eq!(join.joins[0].table, "B");
                assert_eq!(join.joins[0].op, CompareOp::Eq);
                assert_eq!(join.joins[1].op, CompareOp::Less);
                let where_clause = join.where_clause.unwrap();
                assert_eq!(where_clause.first.left.table.as_deref(), Some("A"));
            }
            other => panic!("expected InnerJoin, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_statement_is_none() {
        assert!(parse(";").unwrap().is_none());
        assert!(parse("   ").unwrap().is_none());
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        assert!(parse("DROP TABLE users users;").is_err());
    }

    #[test]
    fn test_error_carries_line() {
        let err = parse("CREATE TABLE t (\nid BANANA);").unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("column type"));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_paren_reports_expected() {
        let err = parse("INSERT INTO t VALUES 1, 2;").unwrap_err();
        match err {
            Error::Parse { message, .. } => assert!(message.contains("'('")),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
