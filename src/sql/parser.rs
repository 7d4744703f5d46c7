//! # SQL Parser
//!
//! Recursive-descent parser with Pratt-style precedence climbing for
//! expressions. It parses exactly one statement; splitting a script into
//! statements is done beforehand by [`super::lexer::split_statements`].
//!
//! ## Grammar
//!
//! ```text
//! statement  := create | drop | insert | select | txn | prepare | execute
//!             | deallocate | checkpoint
//! create     := CREATE TABLE [IF NOT EXISTS] name '(' name type {',' name type} ')'
//! drop       := DROP TABLE [IF EXISTS] name
//! insert     := INSERT INTO name ['(' name {',' name} ')'] VALUES row {',' row}
//! select     := SELECT item {',' item} [FROM name] [WHERE expr]
//!               [ORDER BY expr [COLLATE name] [ASC|DESC] {',' ...}] [LIMIT expr]
//! txn        := BEGIN [TRANSACTION] | COMMIT [TRANSACTION] | END [TRANSACTION]
//!             | ROLLBACK [TRANSACTION]
//! prepare    := PREPARE name AS statement
//! execute    := EXECUTE name ['(' [expr {',' expr}] ')']
//! deallocate := DEALLOCATE [PREPARE] name
//! checkpoint := [FORCE] CHECKPOINT
//! ```
//!
//! ## Operator Precedence (binding power)
//!
//! | Operators | Left bp |
//! |-----------|---------|
//! | `OR` | 2 |
//! | `AND` | 4 |
//! | `NOT` (prefix) | 5 |
//! | `= <> < <= > >=`, `IS [NOT] NULL` | 6 |
//! | `\|\|` | 8 |
//! | `+ -` | 10 |
//! | `* / %` | 12 |
//! | unary `-` | 14 |
//! | `::type` | 16 |
//!
//! ## Errors
//!
//! Errors are `eyre` reports naming what was expected, what was found and
//! where: "expected keyword Table, found Ident(\"tabel\") at line 1 column 14".

use super::ast::{
    BinaryOp, ColumnSpec, CompareOp, CreateTableStmt, Expr, InsertStmt, OrderByItem,
    PrepareStmt, SelectItem, SelectStmt, Statement, UnaryOp,
};
use super::lexer::Lexer;
use super::token::{Keyword, Parameter, Token};
use crate::types::{ArithmeticOp, DataType, OwnedValue};
use eyre::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamStyle {
    None,
    Positional,
    Anonymous,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    param_style: ParamStyle,
    anonymous_count: u32,
}

/// Parses `sql` as a single statement. Trailing semicolons are allowed.
pub fn parse_statement(sql: &str) -> Result<Statement> {
    let mut parser = Parser::new(sql);
    let stmt = parser.parse_statement()?;
    while parser.consume_token(&Token::Semicolon) {}
    if !parser.is_at_end() {
        bail!(
            "unexpected {:?} after end of statement at line {} column {}",
            parser.current,
            parser.lexer.line(),
            parser.lexer.column()
        );
    }
    Ok(stmt)
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            param_style: ParamStyle::None,
            anonymous_count: 0,
        }
    }

    pub fn is_at_end(&self) -> bool {
        matches!(self.current, Token::Eof)
    }

    pub fn peek(&self) -> &Token<'a> {
        &self.current
    }

    pub fn advance(&mut self) -> Token<'a> {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current, Token::Keyword(k) if *k == keyword)
    }

    pub fn consume_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.consume_keyword(keyword) {
            Ok(())
        } else {
            bail!(
                "expected keyword {:?}, found {:?} at line {} column {}",
                keyword,
                self.current,
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    pub fn check_token(&self, expected: &Token<'_>) -> bool {
        std::mem::discriminant(&self.current) == std::mem::discriminant(expected)
    }

    pub fn consume_token(&mut self, expected: &Token<'_>) -> bool {
        if self.check_token(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect_token(&mut self, expected: &Token<'_>) -> Result<()> {
        if self.consume_token(expected) {
            Ok(())
        } else {
            bail!(
                "expected {:?}, found {:?} at line {} column {}",
                expected,
                self.current,
                self.lexer.line(),
                self.lexer.column()
            )
        }
    }

    fn unexpected<T>(&self, what: &str) -> Result<T> {
        if let Token::Error(msg) = self.current {
            bail!(
                "{} at line {} column {}",
                msg,
                self.lexer.line(),
                self.lexer.column()
            );
        }
        bail!(
            "expected {}, found {:?} at line {} column {}",
            what,
            self.current,
            self.lexer.line(),
            self.lexer.column()
        )
    }

    pub fn parse_statement(&mut self) -> Result<Statement> {
        match self.peek() {
            Token::Keyword(Keyword::Select) => Ok(Statement::Select(self.parse_select()?)),
            Token::Keyword(Keyword::Insert) => Ok(Statement::Insert(self.parse_insert()?)),
            Token::Keyword(Keyword::Create) => Ok(Statement::CreateTable(self.parse_create()?)),
            Token::Keyword(Keyword::Drop) => self.parse_drop(),
            Token::Keyword(Keyword::Begin) => {
                self.advance();
                self.consume_keyword(Keyword::Transaction);
                Ok(Statement::Begin)
            }
            Token::Keyword(Keyword::Commit) | Token::Keyword(Keyword::End) => {
                self.advance();
                self.consume_keyword(Keyword::Transaction);
                Ok(Statement::Commit)
            }
            Token::Keyword(Keyword::Rollback) => {
                self.advance();
                self.consume_keyword(Keyword::Transaction);
                Ok(Statement::Rollback)
            }
            Token::Keyword(Keyword::Prepare) => self.parse_prepare(),
            Token::Keyword(Keyword::Execute) => self.parse_execute(),
            Token::Keyword(Keyword::Deallocate) => {
                self.advance();
                self.consume_keyword(Keyword::Prepare);
                let name = self.parse_identifier()?;
                Ok(Statement::Deallocate { name })
            }
            Token::Keyword(Keyword::Checkpoint) => {
                self.advance();
                Ok(Statement::Checkpoint { force: false })
            }
            Token::Keyword(Keyword::Force) => {
                self.advance();
                self.expect_keyword(Keyword::Checkpoint)?;
                Ok(Statement::Checkpoint { force: true })
            }
            _ => self.unexpected("start of statement"),
        }
    }

    fn parse_identifier(&mut self) -> Result<String> {
        match self.current {
            Token::Ident(name) => {
                self.advance();
                Ok(name.to_string())
            }
            Token::QuotedIdent(name) => {
                self.advance();
                Ok(name.replace("\"\"", "\""))
            }
            _ => self.unexpected("identifier"),
        }
    }

    fn parse_data_type(&mut self) -> Result<DataType> {
        let Token::Ident(name) = self.current else {
            return self.unexpected("type name");
        };
        let Some(data_type) = DataType::from_sql_name(name) else {
            bail!(
                "unknown type '{}' at line {} column {}",
                name,
                self.lexer.line(),
                self.lexer.column()
            );
        };
        self.advance();
        if data_type == DataType::Varchar && self.consume_token(&Token::LParen) {
            if !matches!(self.current, Token::Integer(_)) {
                return self.unexpected("VARCHAR length");
            }
            self.advance();
            self.expect_token(&Token::RParen)?;
        }
        Ok(data_type)
    }

    fn parse_create(&mut self) -> Result<CreateTableStmt> {
        self.expect_keyword(Keyword::Create)?;
        self.expect_keyword(Keyword::Table)?;
        let if_not_exists = if self.consume_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };
        let name = self.parse_identifier()?;

        self.expect_token(&Token::LParen)?;
        let mut columns = Vec::new();
        loop {
            let col_name = self.parse_identifier()?;
            let data_type = self.parse_data_type()?;
            if columns.iter().any(|c: &ColumnSpec| c.name.eq_ignore_ascii_case(&col_name)) {
                bail!("column '{}' specified more than once", col_name);
            }
            columns.push(ColumnSpec {
                name: col_name,
                data_type,
            });
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        self.expect_token(&Token::RParen)?;

        Ok(CreateTableStmt {
            name,
            if_not_exists,
            columns,
        })
    }

    fn parse_drop(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Drop)?;
        self.expect_keyword(Keyword::Table)?;
        let if_exists = if self.consume_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };
        let name = self.parse_identifier()?;
        Ok(Statement::DropTable { name, if_exists })
    }

    fn parse_insert(&mut self) -> Result<InsertStmt> {
        self.expect_keyword(Keyword::Insert)?;
        self.expect_keyword(Keyword::Into)?;
        let table = self.parse_identifier()?;

        let columns = if self.consume_token(&Token::LParen) {
            let mut cols = vec![self.parse_identifier()?];
            while self.consume_token(&Token::Comma) {
                cols.push(self.parse_identifier()?);
            }
            self.expect_token(&Token::RParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect_keyword(Keyword::Values)?;
        let mut rows = Vec::new();
        loop {
            self.expect_token(&Token::LParen)?;
            rows.push(self.parse_expr_list()?);
            self.expect_token(&Token::RParen)?;
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }

        Ok(InsertStmt {
            table,
            columns,
            rows,
        })
    }

    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.expect_keyword(Keyword::Select)?;

        let mut items = Vec::new();
        loop {
            if self.consume_token(&Token::Star) {
                items.push(SelectItem::Wildcard);
            } else {
                let expr = self.parse_expr(0)?;
                let alias = if self.consume_keyword(Keyword::As) {
                    Some(self.parse_identifier()?)
                } else if matches!(self.current, Token::Ident(_) | Token::QuotedIdent(_)) {
                    Some(self.parse_identifier()?)
                } else {
                    None
                };
                items.push(SelectItem::Expr { expr, alias });
            }
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }

        let from = if self.consume_keyword(Keyword::From) {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        let filter = if self.consume_keyword(Keyword::Where) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        let mut order_by = Vec::new();
        if self.consume_keyword(Keyword::Order) {
            self.expect_keyword(Keyword::By)?;
            loop {
                let expr = self.parse_expr(0)?;
                let collation = if self.consume_keyword(Keyword::Collate) {
                    Some(self.parse_identifier()?)
                } else {
                    None
                };
                let descending = if self.consume_keyword(Keyword::Desc) {
                    true
                } else {
                    self.consume_keyword(Keyword::Asc);
                    false
                };
                order_by.push(OrderByItem {
                    expr,
                    collation,
                    descending,
                });
                if !self.consume_token(&Token::Comma) {
                    break;
                }
            }
        }

        let limit = if self.consume_keyword(Keyword::Limit) {
            Some(self.parse_expr(0)?)
        } else {
            None
        };

        Ok(SelectStmt {
            items,
            from,
            filter,
            order_by,
            limit,
        })
    }

    fn parse_prepare(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Prepare)?;
        let name = self.parse_identifier()?;
        self.expect_keyword(Keyword::As)?;

        let body_start = self.lexer.token_start();
        let outer = (self.param_style, self.anonymous_count);
        self.param_style = ParamStyle::None;
        self.anonymous_count = 0;
        let body = self.parse_statement()?;
        (self.param_style, self.anonymous_count) = outer;

        if matches!(body, Statement::Prepare(_)) {
            bail!("PREPARE cannot prepare another PREPARE statement");
        }
        let body_end = if self.is_at_end() {
            self.lexer.input().len()
        } else {
            self.lexer.token_start()
        };
        let body_sql = self.lexer.input()[body_start..body_end].trim().to_string();

        Ok(Statement::Prepare(PrepareStmt {
            name,
            body: Box::new(body),
            body_sql,
        }))
    }

    fn parse_execute(&mut self) -> Result<Statement> {
        self.expect_keyword(Keyword::Execute)?;
        let name = self.parse_identifier()?;
        let mut args = Vec::new();
        if self.consume_token(&Token::LParen) {
            if !self.check_token(&Token::RParen) {
                args = self.parse_expr_list()?;
            }
            self.expect_token(&Token::RParen)?;
        }
        Ok(Statement::Execute { name, args })
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr(0)?];
        while self.consume_token(&Token::Comma) {
            exprs.push(self.parse_expr(0)?);
        }
        Ok(exprs)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<Expr> {
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = match self.peek() {
                Token::Keyword(Keyword::Or) => Some((BinaryOp::Or, 2, 3)),
                Token::Keyword(Keyword::And) => Some((BinaryOp::And, 4, 5)),
                Token::Eq => Some((BinaryOp::Compare(CompareOp::Eq), 6, 7)),
                Token::NotEq => Some((BinaryOp::Compare(CompareOp::NotEq), 6, 7)),
                Token::Lt => Some((BinaryOp::Compare(CompareOp::Lt), 6, 7)),
                Token::LtEq => Some((BinaryOp::Compare(CompareOp::LtEq), 6, 7)),
                Token::Gt => Some((BinaryOp::Compare(CompareOp::Gt), 6, 7)),
                Token::GtEq => Some((BinaryOp::Compare(CompareOp::GtEq), 6, 7)),
                Token::Concat => Some((BinaryOp::Concat, 8, 9)),
                Token::Plus => Some((BinaryOp::Arithmetic(ArithmeticOp::Add), 10, 11)),
                Token::Minus => Some((BinaryOp::Arithmetic(ArithmeticOp::Sub), 10, 11)),
                Token::Star => Some((BinaryOp::Arithmetic(ArithmeticOp::Mul), 12, 13)),
                Token::Slash => Some((BinaryOp::Arithmetic(ArithmeticOp::Div), 12, 13)),
                Token::Percent => Some((BinaryOp::Arithmetic(ArithmeticOp::Mod), 12, 13)),
                _ => None,
            };

            if let Some((op, l_bp, r_bp)) = op {
                if l_bp < min_bp {
                    break;
                }
                self.advance();
                let rhs = self.parse_expr(r_bp)?;
                lhs = Expr::Binary {
                    left: Box::new(lhs),
                    op,
                    right: Box::new(rhs),
                };
                continue;
            }

            if self.check_keyword(Keyword::Is) {
                if 6 < min_bp {
                    break;
                }
                self.advance();
                let negated = self.consume_keyword(Keyword::Not);
                self.expect_keyword(Keyword::Null)?;
                lhs = Expr::IsNull {
                    expr: Box::new(lhs),
                    negated,
                };
                continue;
            }

            if self.check_token(&Token::DoubleColon) {
                if 16 < min_bp {
                    break;
                }
                self.advance();
                let data_type = self.parse_data_type()?;
                lhs = Expr::Cast {
                    expr: Box::new(lhs),
                    data_type,
                };
                continue;
            }

            break;
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr> {
        match self.current {
            Token::Integer(text) => {
                self.advance();
                match text.parse::<i64>() {
                    Ok(v) => Ok(Expr::Literal(OwnedValue::Int(v))),
                    Err(_) => bail!("integer literal {} is out of range", text),
                }
            }
            Token::Float(text) => {
                self.advance();
                match text.parse::<f64>() {
                    Ok(v) => Ok(Expr::Literal(OwnedValue::Float(v))),
                    Err(_) => bail!("invalid numeric literal {}", text),
                }
            }
            Token::String(text) => {
                self.advance();
                Ok(Expr::Literal(OwnedValue::Text(text.replace("''", "'"))))
            }
            Token::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expr::Literal(OwnedValue::Bool(true)))
            }
            Token::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expr::Literal(OwnedValue::Bool(false)))
            }
            Token::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expr::Literal(OwnedValue::Null))
            }
            Token::Parameter(param) => {
                self.advance();
                self.number_parameter(param).map(Expr::Parameter)
            }
            Token::Minus => {
                self.advance();
                let expr = self.parse_expr(14)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(expr),
                })
            }
            Token::Keyword(Keyword::Not) => {
                self.advance();
                let expr = self.parse_expr(5)?;
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(expr),
                })
            }
            Token::Keyword(Keyword::Cast) => {
                self.advance();
                self.expect_token(&Token::LParen)?;
                let expr = self.parse_expr(0)?;
                self.expect_keyword(Keyword::As)?;
                let data_type = self.parse_data_type()?;
                self.expect_token(&Token::RParen)?;
                Ok(Expr::Cast {
                    expr: Box::new(expr),
                    data_type,
                })
            }
            Token::LParen => {
                self.advance();
                let expr = self.parse_expr(0)?;
                self.expect_token(&Token::RParen)?;
                Ok(expr)
            }
            Token::Ident(_) | Token::QuotedIdent(_) => {
                let is_plain = matches!(self.current, Token::Ident(_));
                let name = self.parse_identifier()?;
                if is_plain && self.check_token(&Token::LParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(Expr::Column(name))
                }
            }
            _ => self.unexpected("expression"),
        }
    }

    fn parse_function_call(&mut self, name: String) -> Result<Expr> {
        self.expect_token(&Token::LParen)?;
        if self.consume_token(&Token::Star) {
            self.expect_token(&Token::RParen)?;
            return Ok(Expr::Function {
                name,
                args: Vec::new(),
                star: true,
            });
        }
        let args = if self.check_token(&Token::RParen) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        self.expect_token(&Token::RParen)?;
        Ok(Expr::Function {
            name,
            args,
            star: false,
        })
    }

    fn number_parameter(&mut self, param: Parameter) -> Result<u32> {
        let style = match param {
            Parameter::Positional(_) => ParamStyle::Positional,
            Parameter::Anonymous => ParamStyle::Anonymous,
        };
        if self.param_style != ParamStyle::None && self.param_style != style {
            bail!("cannot mix positional ($n) and anonymous (?) parameters in one statement");
        }
        self.param_style = style;
        Ok(match param {
            Parameter::Positional(n) => n,
            Parameter::Anonymous => {
                self.anonymous_count += 1;
                self.anonymous_count
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_count_with_two_parameters() {
        let stmt = parse_statement("SELECT COUNT(*) FROM a WHERE i>$1 AND i<$2").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected SELECT");
        };
        assert_eq!(select.from.as_deref(), Some("a"));
        assert!(matches!(
            select.items[0],
            SelectItem::Expr {
                expr: Expr::Function { star: true, .. },
                ..
            }
        ));
        let Some(Expr::Binary { op, .. }) = select.filter else {
            panic!("expected binary filter");
        };
        assert_eq!(op, BinaryOp::And);
    }

    #[test]
    fn anonymous_parameters_are_numbered_in_order() {
        let stmt = parse_statement("SELECT ?, ? + 1").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected SELECT");
        };
        assert_eq!(
            select.items[0],
            SelectItem::Expr {
                expr: Expr::Parameter(1),
                alias: None
            }
        );
        let SelectItem::Expr {
            expr: Expr::Binary { left, .. },
            ..
        } = &select.items[1]
        else {
            panic!("expected binary");
        };
        assert_eq!(**left, Expr::Parameter(2));
    }

    #[test]
    fn mixing_parameter_styles_is_rejected() {
        let err = parse_statement("SELECT $1, ?").unwrap_err();
        assert!(err.to_string().contains("cannot mix"));
    }

    #[test]
    fn precedence_of_and_over_or() {
        let stmt = parse_statement("SELECT 1 OR 2 AND 3").unwrap();
        let Statement::Select(select) = stmt else {
            panic!("expected SELECT");
        };
        let SelectItem::Expr {
            expr: Expr::Binary { op, right, .. },
            ..
        } = &select.items[0]
        else {
            panic!("expected binary");
        };
        assert_eq!(*op, BinaryOp::Or);
        assert!(matches!(**right, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn cast_forms() {
        let a = parse_statement("SELECT $1::INTEGER").unwrap();
        let b = parse_statement("SELECT CAST($1 AS int)").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn create_table_with_if_not_exists() {
        let stmt = parse_statement("CREATE TABLE IF NOT EXISTS a (i TINYINT, s VARCHAR(10))").unwrap();
        let Statement::CreateTable(create) = stmt else {
            panic!("expected CREATE TABLE");
        };
        assert!(create.if_not_exists);
        assert_eq!(create.columns[0].data_type, DataType::Int1);
        assert_eq!(create.columns[1].data_type, DataType::Varchar);
    }

    #[test]
    fn duplicate_column_is_rejected() {
        assert!(parse_statement("CREATE TABLE a (i INT, I INT)").is_err());
    }

    #[test]
    fn prepare_keeps_body_text() {
        let stmt = parse_statement("PREPARE s1 AS SELECT * FROM a WHERE i = $1;").unwrap();
        let Statement::Prepare(prepare) = stmt else {
            panic!("expected PREPARE");
        };
        assert_eq!(prepare.name, "s1");
        assert_eq!(prepare.body_sql, "SELECT * FROM a WHERE i = $1");
    }

    #[test]
    fn execute_with_and_without_arguments() {
        assert_eq!(
            parse_statement("EXECUTE s1(12, 'x')").unwrap(),
            Statement::Execute {
                name: "s1".into(),
                args: vec![
                    Expr::Literal(OwnedValue::Int(12)),
                    Expr::Literal(OwnedValue::Text("x".into()))
                ]
            }
        );
        assert_eq!(
            parse_statement("EXECUTE s1").unwrap(),
            Statement::Execute {
                name: "s1".into(),
                args: vec![]
            }
        );
    }

    #[test]
    fn transaction_control_variants() {
        assert_eq!(parse_statement("BEGIN TRANSACTION").unwrap(), Statement::Begin);
        assert_eq!(parse_statement("end").unwrap(), Statement::Commit);
        assert_eq!(
            parse_statement("FORCE CHECKPOINT").unwrap(),
            Statement::Checkpoint { force: true }
        );
        assert_eq!(
            parse_statement("DEALLOCATE PREPARE s1").unwrap(),
            Statement::Deallocate { name: "s1".into() }
        );
    }

    #[test]
    fn syntax_error_reports_location() {
        let err = parse_statement("CREATE TABEL a (i INT)").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("expected keyword Table"), "{}", msg);
        assert!(msg.contains("line 1"), "{}", msg);
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse_statement("SELECT 1 2").is_err());
    }
}
