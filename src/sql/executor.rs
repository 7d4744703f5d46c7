//! # Statement Executor
//!
//! Runs the data-bearing part of a [`BoundPlan`](super::binder::BoundPlan)
//! inside a transaction. Transaction control, `PREPARE`, `EXECUTE`,
//! `DEALLOCATE` and `CHECKPOINT` are connection-level operations and never
//! reach this module.
//!
//! ## SELECT Pipeline
//!
//! ```text
//! scan(snapshot) ─> filter ─> sort ─> limit ─> project
//!                        └──────────────> aggregate (single group)
//! ```
//!
//! Sorting happens before projection so `ORDER BY` may name columns that are
//! not selected. A SELECT without FROM runs over a single empty row.
//!
//! ## NULL Semantics
//!
//! Comparisons and arithmetic involving NULL yield NULL. `AND`/`OR` use
//! three-valued logic, and `WHERE` keeps a row only when its predicate is
//! exactly TRUE.

use super::ast::{BinaryOp, CompareOp, UnaryOp};
use super::binder::{AggregateExpr, BoundExpr, BoundOrder, BoundSelect, BoundStatement, Projection};
use crate::database::{ExecuteResult, Row};
use crate::error::{DbError, Result};
use crate::mvcc::Transaction;
use crate::schema::{Catalog, EntryDefinition, EntryKind};
use crate::types::{DataType, OwnedValue};
use std::cmp::Ordering;
use tracing::trace;

pub struct Executor<'a> {
    catalog: &'a Catalog,
    params: &'a [OwnedValue],
}

impl<'a> Executor<'a> {
    pub fn new(catalog: &'a Catalog, params: &'a [OwnedValue]) -> Self {
        Self { catalog, params }
    }

    pub fn execute(&self, statement: &BoundStatement, txn: &mut Transaction) -> Result<ExecuteResult> {
        trace!(txn_id = txn.id(), kind = statement.kind(), "executing statement");
        match statement {
            BoundStatement::CreateTable {
                name,
                columns,
                if_not_exists,
            } => {
                let snapshot = txn.snapshot();
                if *if_not_exists && self.catalog.lookup(EntryKind::Table, name, &snapshot).is_some() {
                    return Ok(ExecuteResult::CreateTable { created: false });
                }
                self.catalog.create_entry(
                    txn,
                    name,
                    EntryKind::Table,
                    EntryDefinition::table(columns.clone()),
                )?;
                Ok(ExecuteResult::CreateTable { created: true })
            }
            BoundStatement::DropTable { name, if_exists } => {
                let snapshot = txn.snapshot();
                if *if_exists && self.catalog.lookup(EntryKind::Table, name, &snapshot).is_none() {
                    return Ok(ExecuteResult::DropTable { dropped: false });
                }
                self.catalog.drop_entry(txn, EntryKind::Table, name)?;
                Ok(ExecuteResult::DropTable { dropped: true })
            }
            BoundStatement::Insert { table, rows } => {
                let def = table.as_table().ok_or_else(|| {
                    DbError::Execution(format!("'{}' is not a table", table.name()))
                })?;
                let mut values = Vec::with_capacity(rows.len());
                for row in rows {
                    let mut out = Vec::with_capacity(row.len());
                    for (expr, column) in row.iter().zip(def.columns()) {
                        let value = self.evaluate(expr, &[])?;
                        let coerced = value.coerce(column.data_type()).ok_or_else(|| {
                            DbError::Execution(format!(
                                "could not convert {} to {} for column '{}'",
                                value,
                                column.data_type(),
                                column.name()
                            ))
                        })?;
                        out.push(coerced);
                    }
                    values.push(out);
                }
                let rows_affected = values.len();
                self.catalog.insert_rows(txn, table, values)?;
                Ok(ExecuteResult::Insert { rows_affected })
            }
            BoundStatement::Select(select) => self.select(select, txn),
            other => Err(DbError::Execution(format!(
                "{} cannot be executed as a query",
                other.kind()
            ))),
        }
    }

    fn select(&self, select: &BoundSelect, txn: &Transaction) -> Result<ExecuteResult> {
        let snapshot = txn.snapshot();
        let mut rows = match &select.table {
            Some(entry) => {
                if !entry.visible_to(&snapshot) {
                    return Err(DbError::Catalog(format!(
                        "table '{}' does not exist",
                        entry.name()
                    )));
                }
                let table = entry.as_table().ok_or_else(|| {
                    DbError::Execution(format!("'{}' is not a table", entry.name()))
                })?;
                table.scan(&snapshot)
            }
            None => vec![Vec::new()],
        };

        if let Some(filter) = &select.filter {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if self.evaluate(filter, &row)? == OwnedValue::Bool(true) {
                    kept.push(row);
                }
            }
            rows = kept;
        }

        let output = match &select.projection {
            Projection::Aggregates(aggregates) => {
                vec![Row::new(self.aggregate(aggregates, &rows)?)]
            }
            Projection::Rows(exprs) => {
                if !select.order_by.is_empty() {
                    rows = self.sort(rows, &select.order_by)?;
                }
                let mut out = Vec::with_capacity(rows.len());
                for row in &rows {
                    let values = exprs
                        .iter()
                        .map(|e| self.evaluate(e, row))
                        .collect::<Result<Vec<_>>>()?;
                    out.push(Row::new(values));
                }
                out
            }
        };

        let output = match &select.limit {
            Some(limit) => {
                let n = self.limit_value(limit)?;
                output.into_iter().take(n).collect()
            }
            None => output,
        };

        Ok(ExecuteResult::Select {
            columns: select.columns.clone(),
            rows: output,
        })
    }

    fn limit_value(&self, limit: &BoundExpr) -> Result<usize> {
        match self.evaluate(limit, &[])? {
            OwnedValue::Null => Ok(usize::MAX),
            value => {
                let n = value
                    .coerce(DataType::Int8)
                    .and_then(|v| v.as_i64())
                    .ok_or_else(|| {
                        DbError::Execution(format!("LIMIT expects an integer, got {}", value))
                    })?;
                if n < 0 {
                    return Err(DbError::Execution(format!(
                        "LIMIT must not be negative, got {}",
                        n
                    )));
                }
                Ok(usize::try_from(n).unwrap_or(usize::MAX))
            }
        }
    }

    fn sort(&self, rows: Vec<Vec<OwnedValue>>, order_by: &[BoundOrder]) -> Result<Vec<Vec<OwnedValue>>> {
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            let mut keys = Vec::with_capacity(order_by.len());
            for item in order_by {
                let value = self.evaluate(&item.expr, &row)?;
                let key = match (&item.collation, &value) {
                    (Some(entry), OwnedValue::Text(s)) => match entry.as_collation() {
                        Some(collation) => OwnedValue::Text(collation.key(s)),
                        None => value,
                    },
                    _ => value,
                };
                keys.push(key);
            }
            keyed.push((keys, row));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for ((x, y), item) in a.iter().zip(b).zip(order_by) {
                let ord = x.sort_cmp(y);
                let ord = if item.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    fn aggregate(&self, aggregates: &[AggregateExpr], rows: &[Vec<OwnedValue>]) -> Result<Vec<OwnedValue>> {
        let mut out = Vec::with_capacity(aggregates.len());
        for aggregate in aggregates {
            let value = match aggregate {
                AggregateExpr::CountStar => OwnedValue::Int(rows.len() as i64),
                AggregateExpr::Count(expr) => {
                    let mut count = 0i64;
                    for row in rows {
                        if !self.evaluate(expr, row)?.is_null() {
                            count += 1;
                        }
                    }
                    OwnedValue::Int(count)
                }
                AggregateExpr::Sum(expr) => {
                    let mut sum = OwnedValue::Null;
                    for row in rows {
                        let value = self.evaluate(expr, row)?;
                        if value.is_null() {
                            continue;
                        }
                        if value.as_f64().is_none() {
                            return Err(DbError::Execution(format!(
                                "sum() expects numeric values, got {}",
                                value
                            )));
                        }
                        sum = if sum.is_null() {
                            value
                        } else {
                            sum.apply_arithmetic(crate::types::ArithmeticOp::Add, &value)
                                .map_err(DbError::Execution)?
                        };
                    }
                    sum
                }
                AggregateExpr::Min(expr) => self.extreme(expr, rows, Ordering::Less)?,
                AggregateExpr::Max(expr) => self.extreme(expr, rows, Ordering::Greater)?,
                AggregateExpr::Constant(expr) => self.evaluate(expr, &[])?,
            };
            out.push(value);
        }
        Ok(out)
    }

    fn extreme(&self, expr: &BoundExpr, rows: &[Vec<OwnedValue>], wanted: Ordering) -> Result<OwnedValue> {
        let mut best = OwnedValue::Null;
        for row in rows {
            let value = self.evaluate(expr, row)?;
            if value.is_null() {
                continue;
            }
            if best.is_null() || value.compare(&best) == Some(wanted) {
                best = value;
            }
        }
        Ok(best)
    }

    pub fn evaluate(&self, expr: &BoundExpr, row: &[OwnedValue]) -> Result<OwnedValue> {
        match expr {
            BoundExpr::Constant(value) => Ok(value.clone()),
            BoundExpr::Column(idx) => row.get(*idx).cloned().ok_or_else(|| {
                DbError::Execution(format!("column index {} out of range", idx))
            }),
            BoundExpr::Parameter(slot) => self.params.get(*slot).cloned().ok_or_else(|| {
                DbError::Execution(format!("no value supplied for parameter ${}", slot + 1))
            }),
            BoundExpr::Unary { op, expr } => {
                let value = self.evaluate(expr, row)?;
                match (op, value) {
                    (_, OwnedValue::Null) => Ok(OwnedValue::Null),
                    (UnaryOp::Not, OwnedValue::Bool(b)) => Ok(OwnedValue::Bool(!b)),
                    (UnaryOp::Neg, OwnedValue::Int(i)) => i
                        .checked_neg()
                        .map(OwnedValue::Int)
                        .ok_or_else(|| DbError::Execution(format!("integer overflow in -{}", i))),
                    (UnaryOp::Neg, OwnedValue::Float(f)) => Ok(OwnedValue::Float(-f)),
                    (UnaryOp::Not, other) => Err(DbError::Execution(format!(
                        "NOT expects a boolean, got {}",
                        other
                    ))),
                    (UnaryOp::Neg, other) => Err(DbError::Execution(format!(
                        "cannot negate {}",
                        other
                    ))),
                }
            }
            BoundExpr::Binary { left, op, right } => {
                let l = self.evaluate(left, row)?;
                let r = self.evaluate(right, row)?;
                match op {
                    BinaryOp::And => {
                        let (a, b) = (truth(&l)?, truth(&r)?);
                        Ok(match (a, b) {
                            (Some(false), _) | (_, Some(false)) => OwnedValue::Bool(false),
                            (Some(true), Some(true)) => OwnedValue::Bool(true),
                            _ => OwnedValue::Null,
                        })
                    }
                    BinaryOp::Or => {
                        let (a, b) = (truth(&l)?, truth(&r)?);
                        Ok(match (a, b) {
                            (Some(true), _) | (_, Some(true)) => OwnedValue::Bool(true),
                            (Some(false), Some(false)) => OwnedValue::Bool(false),
                            _ => OwnedValue::Null,
                        })
                    }
                    BinaryOp::Compare(cmp) => {
                        if l.is_null() || r.is_null() {
                            return Ok(OwnedValue::Null);
                        }
                        let ord = l.compare(&r).ok_or_else(|| {
                            DbError::Execution(format!("cannot compare {} and {}", l, r))
                        })?;
                        Ok(OwnedValue::Bool(compare_holds(*cmp, ord)))
                    }
                    BinaryOp::Arithmetic(arith) => {
                        l.apply_arithmetic(*arith, &r).map_err(DbError::Execution)
                    }
                    BinaryOp::Concat => {
                        if l.is_null() || r.is_null() {
                            return Ok(OwnedValue::Null);
                        }
                        Ok(OwnedValue::Text(format!("{}{}", plain(&l), plain(&r))))
                    }
                }
            }
            BoundExpr::IsNull { expr, negated } => {
                let is_null = self.evaluate(expr, row)?.is_null();
                Ok(OwnedValue::Bool(is_null != *negated))
            }
            BoundExpr::Cast { expr, data_type } => {
                let value = self.evaluate(expr, row)?;
                value.cast(*data_type).ok_or_else(|| {
                    DbError::Execution(format!("could not cast {} to {}", value, data_type))
                })
            }
            BoundExpr::Function { function, args } => {
                let def = function.as_function().ok_or_else(|| {
                    DbError::Execution(format!("'{}' is not a function", function.name()))
                })?;
                let values = args
                    .iter()
                    .map(|a| self.evaluate(a, row))
                    .collect::<Result<Vec<_>>>()?;
                def.invoke(&values).map_err(DbError::Execution)
            }
        }
    }
}

fn truth(value: &OwnedValue) -> Result<Option<bool>> {
    match value {
        OwnedValue::Null => Ok(None),
        OwnedValue::Bool(b) => Ok(Some(*b)),
        other => Err(DbError::Execution(format!(
            "expected a boolean, got {}",
            other
        ))),
    }
}

fn compare_holds(op: CompareOp, ord: Ordering) -> bool {
    match op {
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::NotEq => ord != Ordering::Equal,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::LtEq => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::GtEq => ord != Ordering::Less,
    }
}

/// Text without the quoting `Display` adds.
fn plain(value: &OwnedValue) -> String {
    match value {
        OwnedValue::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::TransactionManager;
    use crate::schema::ColumnDef;
    use crate::sql::binder::Binder;
    use crate::sql::functions::{CoreExtension, Extension, FunctionRegistrar};
    use crate::sql::parser::parse_statement;
    use crate::storage::InMemoryStorage;

    struct Fixture {
        catalog: Catalog,
        txns: TransactionManager,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = Catalog::new();
            let mut registrar = FunctionRegistrar::new();
            CoreExtension.load(&mut registrar);
            let (functions, collations) = registrar.into_parts();
            for f in functions {
                let name = f.name.clone();
                catalog
                    .create_base_entry(&name, EntryDefinition::Function(f))
                    .unwrap();
            }
            for c in collations {
                let name = c.name.clone();
                catalog
                    .create_base_entry(&name, EntryDefinition::Collation(c))
                    .unwrap();
            }
            Self {
                catalog,
                txns: TransactionManager::new(),
            }
        }

        fn run(&self, sql: &str, params: &[OwnedValue]) -> Result<ExecuteResult> {
            let mut txn = self.txns.begin_txn()?;
            let stmt = parse_statement(sql).map_err(|e| DbError::Parse(e.to_string()))?;
            let plan = Binder::new(&self.catalog, txn.snapshot()).bind(stmt)?;
            let result = Executor::new(&self.catalog, params).execute(&plan.statement, &mut txn);
            match result {
                Ok(r) => {
                    self.txns
                        .commit(&mut txn, &self.catalog, &InMemoryStorage::new())?;
                    Ok(r)
                }
                Err(e) => {
                    self.txns.rollback(&mut txn, &self.catalog)?;
                    Err(e)
                }
            }
        }

        fn rows(&self, sql: &str, params: &[OwnedValue]) -> Vec<Vec<OwnedValue>> {
            match self.run(sql, params).unwrap() {
                ExecuteResult::Select { rows, .. } => rows.into_iter().map(|r| r.values).collect(),
                other => panic!("expected rows, got {:?}", other),
            }
        }
    }

    #[test]
    fn filter_and_count_with_parameters() {
        let fx = Fixture::new();
        fx.run("CREATE TABLE a (i TINYINT)", &[]).unwrap();
        fx.run("INSERT INTO a VALUES (11), (12), (13)", &[]).unwrap();
        let rows = fx.rows(
            "SELECT COUNT(*) FROM a WHERE i>$1 AND i<$2",
            &[OwnedValue::Int(11), OwnedValue::Int(13)],
        );
        assert_eq!(rows, vec![vec![OwnedValue::Int(1)]]);
    }

    #[test]
    fn null_comparison_filters_out_rows() {
        let fx = Fixture::new();
        fx.run("CREATE TABLE t (v INTEGER)", &[]).unwrap();
        fx.run("INSERT INTO t VALUES (1), (NULL)", &[]).unwrap();
        let rows = fx.rows("SELECT v FROM t WHERE v = NULL", &[]);
        assert!(rows.is_empty());
        let rows = fx.rows("SELECT v FROM t WHERE v IS NULL", &[]);
        assert_eq!(rows, vec![vec![OwnedValue::Null]]);
    }

    #[test]
    fn three_valued_logic() {
        let fx = Fixture::new();
        let rows = fx.rows("SELECT NULL AND FALSE, NULL OR TRUE, NULL AND TRUE", &[]);
        assert_eq!(
            rows,
            vec![vec![
                OwnedValue::Bool(false),
                OwnedValue::Bool(true),
                OwnedValue::Null
            ]]
        );
    }

    #[test]
    fn order_by_collation_and_limit() {
        let fx = Fixture::new();
        fx.run("CREATE TABLE n (s VARCHAR)", &[]).unwrap();
        fx.run("INSERT INTO n VALUES ('b'), ('A'), ('c')", &[]).unwrap();
        let rows = fx.rows("SELECT s FROM n ORDER BY s COLLATE nocase LIMIT 2", &[]);
        assert_eq!(
            rows,
            vec![vec![OwnedValue::from("A")], vec![OwnedValue::from("b")]]
        );
        let rows = fx.rows("SELECT s FROM n ORDER BY s DESC", &[]);
        assert_eq!(rows[0], vec![OwnedValue::from("c")]);
    }

    #[test]
    fn aggregates_skip_nulls() {
        let fx = Fixture::new();
        fx.run("CREATE TABLE t (v INTEGER)", &[]).unwrap();
        fx.run("INSERT INTO t VALUES (4), (NULL), (2)", &[]).unwrap();
        let rows = fx.rows("SELECT COUNT(v), SUM(v), MIN(v), MAX(v), COUNT(*) FROM t", &[]);
        assert_eq!(
            rows,
            vec![vec![
                OwnedValue::Int(2),
                OwnedValue::Int(6),
                OwnedValue::Int(2),
                OwnedValue::Int(4),
                OwnedValue::Int(3)
            ]]
        );
    }

    #[test]
    fn insert_rejects_out_of_range_values() {
        let fx = Fixture::new();
        fx.run("CREATE TABLE a (i TINYINT)", &[]).unwrap();
        let err = fx.run("INSERT INTO a VALUES (1000)", &[]).unwrap_err();
        assert!(matches!(err, DbError::Execution(_)));
        assert!(fx.rows("SELECT * FROM a", &[]).is_empty());
    }

    #[test]
    fn insert_with_column_list_fills_nulls() {
        let fx = Fixture::new();
        fx.run("CREATE TABLE p (a INTEGER, b VARCHAR)", &[]).unwrap();
        fx.run("INSERT INTO p (b) VALUES ('x')", &[]).unwrap();
        let rows = fx.rows("SELECT a, b FROM p", &[]);
        assert_eq!(rows, vec![vec![OwnedValue::Null, OwnedValue::from("x")]]);
    }

    #[test]
    fn if_not_exists_and_if_exists_are_quiet() {
        let fx = Fixture::new();
        fx.run("CREATE TABLE t (v INTEGER)", &[]).unwrap();
        let r = fx.run("CREATE TABLE IF NOT EXISTS t (v INTEGER)", &[]).unwrap();
        assert!(matches!(r, ExecuteResult::CreateTable { created: false }));
        fx.run("DROP TABLE t", &[]).unwrap();
        let r = fx.run("DROP TABLE IF EXISTS t", &[]).unwrap();
        assert!(matches!(r, ExecuteResult::DropTable { dropped: false }));
    }

    #[test]
    fn functions_and_concat() {
        let fx = Fixture::new();
        let rows = fx.rows("SELECT upper('ab') || 'c', length('héllo'), abs(-2.5)", &[]);
        assert_eq!(
            rows,
            vec![vec![
                OwnedValue::from("ABc"),
                OwnedValue::Int(5),
                OwnedValue::Float(2.5)
            ]]
        );
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let fx = Fixture::new();
        let err = fx.run("SELECT 1 / 0", &[]).unwrap_err();
        assert!(matches!(err, DbError::Execution(_)));
    }

    #[test]
    fn columns_keep_table_order() {
        let fx = Fixture::new();
        let catalog = &fx.catalog;
        catalog
            .load_table(
                "pre",
                vec![ColumnDef::new("x", DataType::Int4)],
                vec![vec![OwnedValue::Int(7)]],
            )
            .unwrap();
        let rows = fx.rows("SELECT x + 1 FROM pre", &[]);
        assert_eq!(rows, vec![vec![OwnedValue::Int(8)]]);
    }
}
