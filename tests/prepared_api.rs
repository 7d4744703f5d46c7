//! # Prepared Statement API Tests
//!
//! Compile-once / execute-many behavior of prepared statements: parameter
//! counting and typing, captured prepare errors, named statements and
//! invalidation when the owning connection goes away.

use keeldb::{params, Connection, DataType, Database, DbError, InvalidationCause, OwnedValue, ParameterError};

fn setup() -> (Database, Connection) {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connect().unwrap();
    conn.execute_batch("CREATE TABLE a (i TINYINT); INSERT INTO a VALUES (11), (12), (13)")
        .unwrap();
    (db, conn)
}

fn scalar(conn: &Connection, sql: &str, params: &[OwnedValue]) -> OwnedValue {
    conn.query(sql, params)
        .unwrap()
        .scalar()
        .cloned()
        .unwrap_or(OwnedValue::Null)
}

#[test]
fn count_with_single_parameter() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i=$1");
    assert!(stmt.success(), "{:?}", stmt.error());
    assert_eq!(stmt.parameter_count(), 1);
    assert_eq!(stmt.parameter_types(), &[Some(DataType::Int1)]);

    let result = stmt.execute(&params![12]).unwrap();
    assert_eq!(result.scalar(), Some(&OwnedValue::Int(1)));
}

#[test]
fn count_with_range_parameters() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i>$1 AND i<$2");
    assert_eq!(stmt.parameter_count(), 2);

    let result = stmt.execute(&params![10, 13]).unwrap();
    assert_eq!(result.scalar(), Some(&OwnedValue::Int(2)));

    let result = stmt.execute(&params![11, 13]).unwrap();
    assert_eq!(result.scalar(), Some(&OwnedValue::Int(1)));
}

#[test]
fn anonymous_parameters_are_numbered_in_order() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i >= ? AND i <= ?");
    assert_eq!(stmt.parameter_count(), 2);
    let result = stmt.execute(&params![12, 13]).unwrap();
    assert_eq!(result.scalar(), Some(&OwnedValue::Int(2)));
}

#[test]
fn wrong_argument_count_leaves_statement_usable() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i=$1");

    let err = stmt.execute(&[]).unwrap_err();
    assert!(matches!(
        err,
        DbError::Parameter(ParameterError::Count { expected: 1, got: 0 })
    ));
    let err = stmt.execute(&params![1, 2]).unwrap_err();
    assert!(err.is_parameter_error());

    let result = stmt.execute(&params![13]).unwrap();
    assert_eq!(result.scalar(), Some(&OwnedValue::Int(1)));
}

#[test]
fn wrong_argument_count_does_not_touch_the_table() {
    let (_db, conn) = setup();
    let insert = conn.prepare("INSERT INTO a VALUES ($1)");
    assert!(insert.success(), "{:?}", insert.error());

    assert!(insert.execute(&[]).unwrap_err().is_parameter_error());
    assert!(insert.execute(&params![14, 15]).unwrap_err().is_parameter_error());
    assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM a", &[]), OwnedValue::Int(3));
}

#[test]
fn argument_count_is_checked_before_validity() {
    let (_db, conn) = setup();
    conn.begin().unwrap();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i=$1");
    conn.rollback().unwrap();

    let err = stmt.execute(&[]).unwrap_err();
    assert!(matches!(
        err,
        DbError::Parameter(ParameterError::Count { expected: 1, got: 0 })
    ));
    let err = stmt.execute(&params![12]).unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidatedStatement(InvalidationCause::TransactionRolledBack(_))
    ));
}

#[test]
fn argument_that_does_not_fit_is_a_type_error() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i=$1");

    let err = stmt.execute(&params![1000]).unwrap_err();
    assert!(matches!(
        err,
        DbError::Parameter(ParameterError::Type {
            index: 1,
            expected: DataType::Int1,
            ..
        })
    ));
    let err = stmt.execute(&params!["twelve"]).unwrap_err();
    assert!(err.is_parameter_error());

    // Parseable text and integral doubles coerce.
    assert_eq!(
        stmt.execute(&params!["12"]).unwrap().scalar(),
        Some(&OwnedValue::Int(1))
    );
    assert_eq!(
        stmt.execute(&params![12.0]).unwrap().scalar(),
        Some(&OwnedValue::Int(1))
    );
}

#[test]
fn cast_declares_parameter_type() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT $1::INTEGER");
    assert_eq!(stmt.parameter_types(), &[Some(DataType::Int4)]);
    assert_eq!(
        stmt.execute(&params!["42"]).unwrap().scalar(),
        Some(&OwnedValue::Int(42))
    );
    assert!(stmt.execute(&params!["abc"]).is_err());
}

#[test]
fn untyped_parameter_passes_value_through() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT $1");
    assert_eq!(stmt.parameter_types(), &[None]);
    assert_eq!(
        stmt.execute(&params!["x"]).unwrap().scalar(),
        Some(&OwnedValue::Text("x".to_string()))
    );
    assert_eq!(
        stmt.execute(&params![None::<i64>]).unwrap().scalar(),
        Some(&OwnedValue::Null)
    );
}

#[test]
fn multiple_statements_fail_at_prepare_and_every_execute() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT 42; SELECT 84");
    assert!(!stmt.success());
    assert!(matches!(stmt.error(), Some(DbError::Parse(_))));

    let first = stmt.execute(&[]).unwrap_err().to_string();
    let second = stmt.execute(&[]).unwrap_err().to_string();
    assert_eq!(first, second);
    assert_eq!(first, stmt.error().unwrap().to_string());
}

#[test]
fn semicolon_inside_literal_is_not_a_delimiter() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT 'a;b'");
    assert!(stmt.success(), "{:?}", stmt.error());
    assert_eq!(
        stmt.execute(&[]).unwrap().scalar(),
        Some(&OwnedValue::Text("a;b".to_string()))
    );
}

#[test]
fn bind_error_is_captured() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT * FROM missing WHERE x = $1");
    assert!(!stmt.success());
    assert_eq!(stmt.parameter_count(), 0);
    assert!(matches!(stmt.execute(&params![1]), Err(DbError::Catalog(_))));
    assert!(conn.registered_statements().is_empty());
}

#[test]
fn two_open_statements_execute_independently() {
    let (_db, conn) = setup();
    let count = conn.prepare("SELECT COUNT(*) FROM a WHERE i=$1");
    let max = conn.prepare("SELECT MAX(i) FROM a WHERE i<$1");

    assert_eq!(count.execute(&params![11]).unwrap().scalar(), Some(&OwnedValue::Int(1)));
    assert_eq!(max.execute(&params![13]).unwrap().scalar(), Some(&OwnedValue::Int(12)));
    drop(count);
    assert_eq!(max.execute(&params![12]).unwrap().scalar(), Some(&OwnedValue::Int(11)));
}

#[test]
fn dropping_the_connection_invalidates_its_statements() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a WHERE i=$1");
    assert!(stmt.execute(&params![12]).is_ok());

    drop(conn);

    for _ in 0..2 {
        let err = stmt.execute(&params![12]).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidatedStatement(InvalidationCause::ConnectionClosed)
        ));
    }
}

#[test]
fn dropping_a_statement_releases_its_name() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT 1");
    assert_eq!(conn.registered_statements(), vec![stmt.name().to_string()]);
    drop(stmt);
    assert!(conn.registered_statements().is_empty());
}

#[test]
fn sql_prepare_execute_and_deallocate() {
    let (_db, conn) = setup();
    conn.query("PREPARE s1 AS SELECT COUNT(*) FROM a WHERE i > $1", &[])
        .unwrap();
    assert_eq!(conn.registered_statements(), vec!["s1".to_string()]);

    assert_eq!(scalar(&conn, "EXECUTE s1(11)", &[]), OwnedValue::Int(2));
    assert_eq!(scalar(&conn, "EXECUTE s1($1)", &params![12]), OwnedValue::Int(1));

    let err = conn.query("EXECUTE s1", &[]).unwrap_err();
    assert!(err.is_parameter_error());

    conn.query("DEALLOCATE s1", &[]).unwrap();
    let err = conn.query("EXECUTE s1(11)", &[]).unwrap_err();
    assert!(matches!(err, DbError::StatementNotFound(name) if name == "s1"));
}

#[test]
fn execute_cannot_run_itself() {
    let (_db, conn) = setup();
    let err = conn.query("PREPARE s AS EXECUTE s", &[]).unwrap_err();
    assert!(matches!(err, DbError::Bind(_)), "{:?}", err);
    assert!(conn.query("PREPARE d AS DEALLOCATE d", &[]).is_err());
    assert!(conn.registered_statements().is_empty());

    let looping = conn.prepare_named("s", "EXECUTE s");
    assert!(looping.success(), "{:?}", looping.error());
    for _ in 0..2 {
        assert!(matches!(looping.execute(&[]), Err(DbError::Execution(_))));
    }

    conn.query("PREPARE t AS SELECT COUNT(*) FROM a", &[]).unwrap();
    let through = conn.prepare("EXECUTE t");
    assert_eq!(through.execute(&[]).unwrap().scalar(), Some(&OwnedValue::Int(3)));
}

#[test]
fn deallocate_invalidates_named_handle() {
    let (_db, conn) = setup();
    let stmt = conn.prepare_named("q", "SELECT COUNT(*) FROM a");
    assert!(stmt.success());
    conn.query("DEALLOCATE PREPARE q", &[]).unwrap();
    let err = stmt.execute(&[]).unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidatedStatement(InvalidationCause::Released(name)) if name == "q"
    ));
}

#[test]
fn duplicate_prepared_name_fails() {
    let (_db, conn) = setup();
    conn.query("PREPARE s AS SELECT 1", &[]).unwrap();
    assert!(conn.query("PREPARE s AS SELECT 2", &[]).is_err());
    let dup = conn.prepare_named("s", "SELECT 3");
    assert!(!dup.success());
}

#[test]
fn dropped_table_invalidates_dependent_statement() {
    let (_db, conn) = setup();
    let stmt = conn.prepare("SELECT COUNT(*) FROM a");
    assert!(stmt.execute(&[]).is_ok());

    conn.query("DROP TABLE a", &[]).unwrap();
    conn.query("CREATE TABLE a (i TINYINT)", &[]).unwrap();

    let err = stmt.execute(&[]).unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidatedStatement(InvalidationCause::EntryInvalidated(name)) if name == "a"
    ));
    // A fresh prepare binds to the new table.
    assert_eq!(scalar(&conn, "SELECT COUNT(*) FROM a", &[]), OwnedValue::Int(0));
}

#[test]
fn statement_belongs_to_its_connection() {
    let (db, conn) = setup();
    let other = db.connect().unwrap();
    let stmt = conn.prepare("SELECT 1");
    assert!(other.execute(&stmt, &[]).is_err());
    assert!(conn.execute(&stmt, &[]).is_ok());
}

#[test]
fn insert_through_prepared_statement() {
    let (_db, conn) = setup();
    conn.query("CREATE TABLE users (id INTEGER, name VARCHAR, score DOUBLE)", &[])
        .unwrap();
    let insert = conn.prepare("INSERT INTO users VALUES ($1, $2, $3)");
    assert_eq!(
        insert.parameter_types(),
        &[Some(DataType::Int4), Some(DataType::Varchar), Some(DataType::Float8)]
    );
    for (id, name) in [(1, "ann"), (2, "bob"), (3, "cy")] {
        let r = insert.execute(&params![id, name, 1]).unwrap();
        assert_eq!(r.rows_affected(), 1);
    }

    let result = conn
        .query("SELECT upper(name) AS n, score FROM users WHERE id >= $1 ORDER BY id DESC", &params![2])
        .unwrap();
    assert_eq!(result.columns(), &["n".to_string(), "score".to_string()]);
    let rows = result.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get_text(0).unwrap(), "CY");
    assert_eq!(rows[0].get_float(1).unwrap(), 1.0);
}
