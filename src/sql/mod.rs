//! # SQL Processing Module
//!
//! Text in, results out. A statement goes through four stages:
//!
//! ```text
//! &str ──lexer──> Token ──parser──> Statement ──binder──> BoundPlan ──executor──> ExecuteResult
//! ```
//!
//! ## Module Structure
//!
//! - `token`: Token and keyword definitions
//! - `lexer`: Zero-copy SQL tokenizer and statement splitter
//! - `ast`: Owned syntax tree
//! - `parser`: Recursive descent parser with Pratt expressions
//! - `binder`: Name resolution, parameter typing, dependency collection
//! - `executor`: Evaluation of DDL, INSERT and SELECT inside a transaction
//! - `functions`: Scalar functions, collations and extensions
//!
//! ## Supported SQL
//!
//! - DDL: CREATE TABLE [IF NOT EXISTS], DROP TABLE [IF EXISTS]
//! - DML: INSERT INTO ... VALUES, SELECT with WHERE / ORDER BY [COLLATE] /
//!   LIMIT and the COUNT / SUM / MIN / MAX aggregates
//! - Transactions: BEGIN, COMMIT, ROLLBACK
//! - Prepared statements: PREPARE name AS ..., EXECUTE name(...), DEALLOCATE
//! - CHECKPOINT, FORCE CHECKPOINT

pub mod ast;
pub mod binder;
pub mod executor;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod token;

pub use binder::{Binder, BoundPlan, BoundStatement};
pub use executor::Executor;
pub use lexer::{split_statements, Lexer};
pub use parser::parse_statement;
pub use token::{Keyword, Token};
