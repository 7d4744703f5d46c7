//! # Binder
//!
//! Turns a parsed [`Statement`] into a [`BoundPlan`]: names are resolved
//! against the catalog as seen by one snapshot, columns become positions,
//! and every catalog entry the plan touches is recorded as a dependency.
//!
//! ```text
//! Statement ──bind(catalog, snapshot)──> BoundPlan {
//!                                           statement:       BoundStatement,
//!                                           parameter_types: [Option<DataType>],
//!                                           dependencies:    [EntryRef],
//!                                        }
//! ```
//!
//! ## Dependencies
//!
//! Tables read or written, scalar functions called and collations used in
//! `ORDER BY` are all catalog entries. The plan keeps an [`EntryRef`] to
//! each; a prepared statement checks them for invalidation before every
//! execution. DDL (`CREATE TABLE`, `DROP TABLE`) resolves its target at
//! execution time and carries no dependency.
//!
//! ## Parameter Type Inference
//!
//! | Position of `$n` | Inferred type |
//! |------------------|---------------|
//! | `$n::T`, `CAST($n AS T)` | `T` |
//! | operand of comparison or arithmetic | type of the other operand |
//! | `INSERT ... VALUES` | target column type |
//! | function argument | declared argument type |
//! | `LIMIT $n` | BIGINT |
//! | operand of `AND` / `OR` / `NOT` | BOOLEAN |
//! | anywhere else | none, any value accepted |
//!
//! The first inference wins when a parameter appears more than once.

use super::ast::{
    BinaryOp, CreateTableStmt, Expr, InsertStmt, SelectItem, SelectStmt, Statement, UnaryOp,
};
use crate::config::MAX_PARAMETERS;
use crate::error::{DbError, Result};
use crate::mvcc::Snapshot;
use crate::schema::{Catalog, ColumnDef, EntryKind, EntryRef, TableDef};
use crate::types::{DataType, OwnedValue};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum BoundExpr {
    Constant(OwnedValue),
    Column(usize),
    /// 0-based parameter slot.
    Parameter(usize),
    Unary {
        op: UnaryOp,
        expr: Box<BoundExpr>,
    },
    Binary {
        left: Box<BoundExpr>,
        op: BinaryOp,
        right: Box<BoundExpr>,
    },
    IsNull {
        expr: Box<BoundExpr>,
        negated: bool,
    },
    Cast {
        expr: Box<BoundExpr>,
        data_type: DataType,
    },
    Function {
        function: EntryRef,
        args: Vec<BoundExpr>,
    },
}

#[derive(Debug, Clone)]
pub enum AggregateExpr {
    CountStar,
    Count(BoundExpr),
    Sum(BoundExpr),
    Min(BoundExpr),
    Max(BoundExpr),
    /// Non-aggregate item in an aggregate select list; evaluated once.
    Constant(BoundExpr),
}

#[derive(Debug, Clone)]
pub enum Projection {
    Rows(Vec<BoundExpr>),
    Aggregates(Vec<AggregateExpr>),
}

#[derive(Debug, Clone)]
pub struct BoundOrder {
    pub expr: BoundExpr,
    pub collation: Option<EntryRef>,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct BoundSelect {
    pub table: Option<EntryRef>,
    pub columns: Vec<String>,
    pub filter: Option<BoundExpr>,
    pub projection: Projection,
    pub order_by: Vec<BoundOrder>,
    pub limit: Option<BoundExpr>,
}

#[derive(Debug, Clone)]
pub enum BoundStatement {
    CreateTable {
        name: String,
        columns: Vec<ColumnDef>,
        if_not_exists: bool,
    },
    DropTable {
        name: String,
        if_exists: bool,
    },
    Insert {
        table: EntryRef,
        rows: Vec<Vec<BoundExpr>>,
    },
    Select(BoundSelect),
    Begin,
    Commit,
    Rollback,
    Prepare {
        name: String,
        body_sql: String,
    },
    Execute {
        name: String,
        args: Vec<BoundExpr>,
    },
    Deallocate {
        name: String,
    },
    Checkpoint {
        force: bool,
    },
}

impl BoundStatement {
    /// Statements that change catalog or table contents.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            BoundStatement::CreateTable { .. }
                | BoundStatement::DropTable { .. }
                | BoundStatement::Insert { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BoundStatement::CreateTable { .. } => "CREATE TABLE",
            BoundStatement::DropTable { .. } => "DROP TABLE",
            BoundStatement::Insert { .. } => "INSERT",
            BoundStatement::Select(_) => "SELECT",
            BoundStatement::Begin => "BEGIN",
            BoundStatement::Commit => "COMMIT",
            BoundStatement::Rollback => "ROLLBACK",
            BoundStatement::Prepare { .. } => "PREPARE",
            BoundStatement::Execute { .. } => "EXECUTE",
            BoundStatement::Deallocate { .. } => "DEALLOCATE",
            BoundStatement::Checkpoint { .. } => "CHECKPOINT",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoundPlan {
    pub statement: BoundStatement,
    pub parameter_types: Vec<Option<DataType>>,
    pub dependencies: Vec<EntryRef>,
}

const AGGREGATES: [&str; 4] = ["count", "sum", "min", "max"];

fn is_aggregate(name: &str) -> bool {
    AGGREGATES.iter().any(|a| a.eq_ignore_ascii_case(name))
}

pub struct Binder<'a> {
    catalog: &'a Catalog,
    snapshot: Snapshot,
    parameter_types: Vec<Option<DataType>>,
    dependencies: Vec<EntryRef>,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a Catalog, snapshot: Snapshot) -> Self {
        Self {
            catalog,
            snapshot,
            parameter_types: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn bind(mut self, statement: Statement) -> Result<BoundPlan> {
        let statement = match statement {
            Statement::CreateTable(create) => self.bind_create(create)?,
            Statement::DropTable { name, if_exists } => {
                BoundStatement::DropTable { name, if_exists }
            }
            Statement::Insert(insert) => self.bind_insert(insert)?,
            Statement::Select(select) => BoundStatement::Select(self.bind_select(select)?),
            Statement::Begin => BoundStatement::Begin,
            Statement::Commit => BoundStatement::Commit,
            Statement::Rollback => BoundStatement::Rollback,
            Statement::Prepare(prepare) => {
                if matches!(
                    *prepare.body,
                    Statement::Prepare(_) | Statement::Execute { .. } | Statement::Deallocate { .. }
                ) {
                    return Err(DbError::Bind(format!(
                        "cannot prepare a {} statement",
                        prepare.body.kind()
                    )));
                }
                BoundStatement::Prepare {
                    name: prepare.name,
                    body_sql: prepare.body_sql,
                }
            }
            Statement::Execute { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.bind_expr(arg, None))
                    .collect::<Result<Vec<_>>>()?;
                BoundStatement::Execute { name, args }
            }
            Statement::Deallocate { name } => BoundStatement::Deallocate { name },
            Statement::Checkpoint { force } => BoundStatement::Checkpoint { force },
        };

        Ok(BoundPlan {
            statement,
            parameter_types: self.parameter_types,
            dependencies: self.dependencies,
        })
    }

    fn depend_on(&mut self, entry: &EntryRef) {
        if !self.dependencies.iter().any(|d| Arc::ptr_eq(d, entry)) {
            self.dependencies.push(Arc::clone(entry));
        }
    }

    fn resolve(&mut self, kind: EntryKind, name: &str) -> Result<EntryRef> {
        let entry = self.catalog.resolve(kind, name, &self.snapshot)?;
        self.depend_on(&entry);
        Ok(entry)
    }

    fn note_parameter(&mut self, slot: usize, data_type: Option<DataType>) {
        if self.parameter_types.len() <= slot {
            self.parameter_types.resize(slot + 1, None);
        }
        if self.parameter_types[slot].is_none() {
            self.parameter_types[slot] = data_type;
        }
    }

    /// Records `hint` as the type of `expr` if it is a bare parameter.
    fn hint(&mut self, expr: &BoundExpr, hint: Option<DataType>) {
        if let BoundExpr::Parameter(slot) = expr {
            self.note_parameter(*slot, hint);
        }
    }

    fn bind_create(&mut self, create: CreateTableStmt) -> Result<BoundStatement> {
        let columns = create
            .columns
            .into_iter()
            .map(|c| ColumnDef::new(c.name, c.data_type))
            .collect();
        Ok(BoundStatement::CreateTable {
            name: create.name,
            columns,
            if_not_exists: create.if_not_exists,
        })
    }

    fn bind_insert(&mut self, insert: InsertStmt) -> Result<BoundStatement> {
        let entry = self.resolve(EntryKind::Table, &insert.table)?;
        let table = table_of(&entry)?;
        let width = table.columns().len();

        let targets: Vec<usize> = match &insert.columns {
            Some(names) => {
                let mut targets = Vec::with_capacity(names.len());
                for name in names {
                    let idx = table.column_index(name).ok_or_else(|| {
                        DbError::Bind(format!(
                            "table '{}' has no column named '{}'",
                            entry.name(),
                            name
                        ))
                    })?;
                    if targets.contains(&idx) {
                        return Err(DbError::Bind(format!(
                            "column '{}' specified more than once",
                            name
                        )));
                    }
                    targets.push(idx);
                }
                targets
            }
            None => (0..width).collect(),
        };

        let mut rows = Vec::with_capacity(insert.rows.len());
        for values in &insert.rows {
            if values.len() != targets.len() {
                return Err(DbError::Bind(format!(
                    "table '{}' has {} target columns but {} values were supplied",
                    entry.name(),
                    targets.len(),
                    values.len()
                )));
            }
            let mut row = vec![BoundExpr::Constant(OwnedValue::Null); width];
            for (value, &idx) in values.iter().zip(&targets) {
                let bound = self.bind_expr(value, None)?;
                self.hint(&bound, Some(table.columns()[idx].data_type()));
                row[idx] = bound;
            }
            rows.push(row);
        }

        Ok(BoundStatement::Insert { table: entry, rows })
    }

    fn bind_select(&mut self, select: SelectStmt) -> Result<BoundSelect> {
        let table = match &select.from {
            Some(name) => Some(self.resolve(EntryKind::Table, name)?),
            None => None,
        };
        let scope = match &table {
            Some(entry) => Some(table_of(entry)?),
            None => None,
        };

        let filter = match &select.filter {
            Some(expr) => {
                let bound = self.bind_expr(expr, scope)?;
                self.hint(&bound, Some(DataType::Bool));
                Some(bound)
            }
            None => None,
        };

        let has_aggregate = select.items.iter().any(|item| {
            matches!(item, SelectItem::Expr { expr: Expr::Function { name, .. }, .. } if is_aggregate(name))
        });

        let mut columns = Vec::new();
        let projection = if has_aggregate {
            let mut aggregates = Vec::with_capacity(select.items.len());
            for item in &select.items {
                let SelectItem::Expr { expr, alias } = item else {
                    return Err(DbError::Bind(
                        "cannot combine * with aggregate functions".to_string(),
                    ));
                };
                columns.push(output_name(expr, alias.as_deref()));
                aggregates.push(self.bind_aggregate(expr, scope)?);
            }
            Projection::Aggregates(aggregates)
        } else {
            let mut exprs = Vec::with_capacity(select.items.len());
            for item in &select.items {
                match item {
                    SelectItem::Wildcard => {
                        let scope = scope.ok_or_else(|| {
                            DbError::Bind("SELECT * requires a FROM clause".to_string())
                        })?;
                        for (idx, column) in scope.columns().iter().enumerate() {
                            columns.push(column.name().to_string());
                            exprs.push(BoundExpr::Column(idx));
                        }
                    }
                    SelectItem::Expr { expr, alias } => {
                        columns.push(output_name(expr, alias.as_deref()));
                        exprs.push(self.bind_expr(expr, scope)?);
                    }
                }
            }
            Projection::Rows(exprs)
        };

        if has_aggregate && !select.order_by.is_empty() {
            return Err(DbError::Bind(
                "ORDER BY is not supported together with aggregate functions".to_string(),
            ));
        }

        let mut order_by = Vec::with_capacity(select.order_by.len());
        for item in &select.order_by {
            let expr = self.bind_expr(&item.expr, scope)?;
            let collation = match &item.collation {
                Some(name) => Some(self.resolve(EntryKind::Collation, name)?),
                None => None,
            };
            order_by.push(BoundOrder {
                expr,
                collation,
                descending: item.descending,
            });
        }

        let limit = match &select.limit {
            Some(expr) => {
                let bound = self.bind_expr(expr, None)?;
                self.hint(&bound, Some(DataType::Int8));
                Some(bound)
            }
            None => None,
        };

        Ok(BoundSelect {
            table,
            columns,
            filter,
            projection,
            order_by,
            limit,
        })
    }

    fn bind_aggregate(&mut self, expr: &Expr, scope: Option<&TableDef>) -> Result<AggregateExpr> {
        let (name, args, star) = match expr {
            Expr::Function { name, args, star } if is_aggregate(name) => (name, args, star),
            _ => {
                let bound = self.bind_expr(expr, scope)?;
                if references_column(&bound) {
                    return Err(DbError::Bind(
                        "column references must appear inside an aggregate function".to_string(),
                    ));
                }
                return Ok(AggregateExpr::Constant(bound));
            }
        };

        let lower = name.to_ascii_lowercase();
        if *star {
            if lower != "count" {
                return Err(DbError::Bind(format!("{}(*) is not supported", lower)));
            }
            return Ok(AggregateExpr::CountStar);
        }
        let [arg] = args.as_slice() else {
            return Err(DbError::Bind(format!(
                "{}() takes exactly one argument, got {}",
                lower,
                args.len()
            )));
        };
        let arg = self.bind_expr(arg, scope)?;
        Ok(match lower.as_str() {
            "count" => AggregateExpr::Count(arg),
            "sum" => AggregateExpr::Sum(arg),
            "min" => AggregateExpr::Min(arg),
            _ => AggregateExpr::Max(arg),
        })
    }

    fn bind_expr(&mut self, expr: &Expr, scope: Option<&TableDef>) -> Result<BoundExpr> {
        match expr {
            Expr::Literal(value) => Ok(BoundExpr::Constant(value.clone())),
            Expr::Column(name) => {
                let table = scope.ok_or_else(|| {
                    DbError::Bind(format!(
                        "column '{}' cannot be referenced without a FROM clause",
                        name
                    ))
                })?;
                table
                    .column_index(name)
                    .map(BoundExpr::Column)
                    .ok_or_else(|| DbError::Bind(format!("column '{}' not found", name)))
            }
            Expr::Parameter(n) => {
                if *n as usize > MAX_PARAMETERS {
                    return Err(DbError::Bind(format!(
                        "parameter ${} exceeds the limit of {} parameters",
                        n, MAX_PARAMETERS
                    )));
                }
                let slot = (*n as usize).saturating_sub(1);
                self.note_parameter(slot, None);
                Ok(BoundExpr::Parameter(slot))
            }
            Expr::Unary { op, expr } => {
                let inner = self.bind_expr(expr, scope)?;
                if *op == UnaryOp::Not {
                    self.hint(&inner, Some(DataType::Bool));
                }
                Ok(BoundExpr::Unary {
                    op: *op,
                    expr: Box::new(inner),
                })
            }
            Expr::Binary { left, op, right } => {
                let left = self.bind_expr(left, scope)?;
                let right = self.bind_expr(right, scope)?;
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        self.hint(&left, Some(DataType::Bool));
                        self.hint(&right, Some(DataType::Bool));
                    }
                    BinaryOp::Concat => {
                        self.hint(&left, Some(DataType::Varchar));
                        self.hint(&right, Some(DataType::Varchar));
                    }
                    BinaryOp::Compare(_) | BinaryOp::Arithmetic(_) => {
                        let left_type = self.type_of(&left, scope);
                        let right_type = self.type_of(&right, scope);
                        self.hint(&left, right_type);
                        self.hint(&right, left_type);
                    }
                }
                Ok(BoundExpr::Binary {
                    left: Box::new(left),
                    op: *op,
                    right: Box::new(right),
                })
            }
            Expr::IsNull { expr, negated } => Ok(BoundExpr::IsNull {
                expr: Box::new(self.bind_expr(expr, scope)?),
                negated: *negated,
            }),
            Expr::Cast { expr, data_type } => {
                let inner = self.bind_expr(expr, scope)?;
                self.hint(&inner, Some(*data_type));
                Ok(BoundExpr::Cast {
                    expr: Box::new(inner),
                    data_type: *data_type,
                })
            }
            Expr::Function { name, args, star } => {
                if is_aggregate(name) {
                    return Err(DbError::Bind(format!(
                        "aggregate function {}() is only allowed at the top level of the select list",
                        name.to_ascii_lowercase()
                    )));
                }
                if *star {
                    return Err(DbError::Bind(format!("{}(*) is not supported", name)));
                }
                let function = self.resolve(EntryKind::Function, name)?;
                let Some(def) = function.as_function() else {
                    return Err(DbError::Bind(format!("'{}' is not a function", name)));
                };
                if !def.accepts_arity(args.len()) {
                    return Err(DbError::Bind(format!(
                        "{}() does not accept {} argument(s)",
                        def.name,
                        args.len()
                    )));
                }
                let arg_types: Vec<_> = (0..args.len()).map(|i| def.arg_type(i)).collect();
                let mut bound = Vec::with_capacity(args.len());
                for (arg, arg_type) in args.iter().zip(arg_types) {
                    let b = self.bind_expr(arg, scope)?;
                    self.hint(&b, arg_type);
                    bound.push(b);
                }
                Ok(BoundExpr::Function {
                    function,
                    args: bound,
                })
            }
        }
    }

    /// Static type of a bound expression, `None` when unknown.
    fn type_of(&self, expr: &BoundExpr, scope: Option<&TableDef>) -> Option<DataType> {
        match expr {
            BoundExpr::Constant(value) => value.data_type(),
            BoundExpr::Column(idx) => scope.map(|t| t.columns()[*idx].data_type()),
            BoundExpr::Parameter(slot) => self.parameter_types.get(*slot).copied().flatten(),
            BoundExpr::Unary { op: UnaryOp::Not, .. } => Some(DataType::Bool),
            BoundExpr::Unary { expr, .. } => self.type_of(expr, scope),
            BoundExpr::Binary { left, op, right } => match op {
                BinaryOp::Arithmetic(_) => {
                    match (self.type_of(left, scope), self.type_of(right, scope)) {
                        (Some(l), Some(r)) => DataType::arithmetic_result(l, r),
                        (Some(t), None) | (None, Some(t)) => Some(t),
                        (None, None) => None,
                    }
                }
                BinaryOp::Concat => Some(DataType::Varchar),
                _ => Some(DataType::Bool),
            },
            BoundExpr::IsNull { .. } => Some(DataType::Bool),
            BoundExpr::Cast { data_type, .. } => Some(*data_type),
            BoundExpr::Function { function, .. } => function.as_function().map(|f| f.return_type),
        }
    }
}

fn table_of(entry: &EntryRef) -> Result<&TableDef> {
    entry
        .as_table()
        .ok_or_else(|| DbError::Bind(format!("'{}' is not a table", entry.name())))
}

fn references_column(expr: &BoundExpr) -> bool {
    match expr {
        BoundExpr::Column(_) => true,
        BoundExpr::Constant(_) | BoundExpr::Parameter(_) => false,
        BoundExpr::Unary { expr, .. }
        | BoundExpr::IsNull { expr, .. }
        | BoundExpr::Cast { expr, .. } => references_column(expr),
        BoundExpr::Binary { left, right, .. } => references_column(left) || references_column(right),
        BoundExpr::Function { args, .. } => args.iter().any(references_column),
    }
}

fn output_name(expr: &Expr, alias: Option<&str>) -> String {
    if let Some(alias) = alias {
        return alias.to_string();
    }
    match expr {
        Expr::Column(name) => name.clone(),
        Expr::Function { name, .. } => name.to_ascii_lowercase(),
        Expr::Cast { expr, .. } => output_name(expr, None),
        _ => "?column?".to_string(),
    }
}
