//! Builder queries executed against in-memory SQLite.
#![cfg(feature = "sqlite")]

use std::sync::Arc;

use chrono::NaiveDate;
use quarry_core::{QuarryError, QuarryResult};
use quarry_db::{Builder, Executor, Grammar, TransactionManager, Value};
use quarry_db_backends::SqliteBackend;

const SCHEMA: &str = "
    CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        age INTEGER,
        created_at TEXT
    );
    CREATE TABLE posts (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL REFERENCES users(id),
        title TEXT NOT NULL,
        published INTEGER NOT NULL DEFAULT 0
    );
";

fn setup() -> SqliteBackend {
    let backend = SqliteBackend::memory().unwrap();
    backend.execute_batch(SCHEMA).unwrap();
    backend
}

fn grammar() -> Arc<Grammar> {
    Arc::new(Grammar::new())
}

fn table(name: &str) -> Builder {
    let mut q = Builder::new(grammar());
    q.from(name);
    q
}

fn user(name: &str, age: i64, created: &str) -> Vec<(&'static str, Value)> {
    vec![
        ("name", Value::from(name)),
        ("age", Value::Int(age)),
        ("created_at", Value::from(created)),
    ]
}

fn seed(db: &dyn Executor) {
    table("users")
        .insert(
            db,
            &[
                user("ada", 36, "2024-03-07 09:30:00"),
                user("alan", 41, "2024-03-08 12:00:00"),
                user("grace", 85, "2023-12-09 18:45:00"),
            ],
        )
        .unwrap();
    table("posts")
        .insert(
            db,
            &[
                vec![
                    ("user_id", Value::Int(1)),
                    ("title", Value::from("engines")),
                    ("published", Value::Bool(true)),
                ],
                vec![
                    ("user_id", Value::Int(1)),
                    ("title", Value::from("notes")),
                    ("published", Value::Bool(false)),
                ],
                vec![
                    ("user_id", Value::Int(3)),
                    ("title", Value::from("compilers")),
                    ("published", Value::Bool(true)),
                ],
            ],
        )
        .unwrap();
}

fn names(rows: &[quarry_db::Row]) -> Vec<String> {
    rows.iter()
        .map(|row| row.get::<String>("name").unwrap())
        .collect()
}

#[test]
fn test_select_with_predicates() {
    let db = setup();
    seed(&db);

    let mut q = table("users");
    q.select(&["name"])
        .where_("age", ">", 30)
        .unwrap()
        .where_nested(|inner| {
            inner.where_eq("name", "ada")?.or_where_in("name", ["grace"])?;
            Ok(())
        })
        .unwrap()
        .order_by("age", "desc");

    assert_eq!(names(&q.get(&db).unwrap()), vec!["grace", "ada"]);
}

#[test]
fn test_between_null_and_limit() {
    let db = setup();
    seed(&db);
    table("users")
        .insert(&db, &[vec![("name", Value::from("anon"))]])
        .unwrap();

    let mut q = table("users");
    q.select(&["name"]).where_null("age");
    assert_eq!(names(&q.get(&db).unwrap()), vec!["anon"]);

    let mut q = table("users");
    q.select(&["name"])
        .where_between("age", 40, 90)
        .unwrap()
        .order_by("age", "asc")
        .limit(1)
        .offset(1);
    assert_eq!(names(&q.get(&db).unwrap()), vec!["grace"]);
}

#[test]
fn test_where_date() {
    let db = setup();
    seed(&db);

    let mut q = table("users");
    q.select(&["name"])
        .where_date("created_at", "=", NaiveDate::from_ymd_opt(2024, 3, 8).unwrap())
        .unwrap();
    assert_eq!(names(&q.get(&db).unwrap()), vec!["alan"]);
}

#[test]
fn test_join_with_bound_condition() {
    let db = setup();
    seed(&db);

    let mut q = table("users");
    q.select(&["users.name", "posts.title"])
        .join_with("posts", |join| {
            join.on("posts.user_id", "=", "users.id")
                .where_eq("posts.published", true)?;
            Ok(())
        })
        .unwrap()
        .where_("users.age", "<", 50)
        .unwrap();

    let rows = q.get(&db).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get::<String>("title").unwrap(), "engines");
}

#[test]
fn test_sub_query_and_aggregates() {
    let db = setup();
    seed(&db);

    let mut authors = table("users");
    authors.where_in_sub("id", |sub| {
        sub.select(&["user_id"]).from("posts").where_eq("published", true)?;
        Ok(())
    })
    .unwrap();

    assert_eq!(authors.count(&db, "*").unwrap(), Value::Int(2));
    assert_eq!(authors.max(&db, "age").unwrap(), Value::Int(85));
    assert_eq!(authors.min(&db, "age").unwrap(), Value::Int(36));
    assert_eq!(authors.sum(&db, "age").unwrap(), Value::Int(121));
    assert_eq!(authors.avg(&db, "age").unwrap(), Value::Float(60.5));

    // the aggregates ran on copies
    assert_eq!(authors.get(&db).unwrap().len(), 2);
}

#[test]
fn test_update_and_delete() {
    let db = setup();
    seed(&db);

    let mut q = table("users");
    q.where_eq("name", "alan").unwrap();
    assert_eq!(q.update(&db, &[("age", Value::Int(42))]).unwrap(), 1);

    let rows = q.get(&db).unwrap();
    assert_eq!(rows[0].get::<i64>("age").unwrap(), 42);

    let mut drafts = table("posts");
    drafts.where_eq("published", false).unwrap();
    assert_eq!(drafts.delete(&db).unwrap(), 1);
    assert_eq!(table("posts").count(&db, "id").unwrap(), Value::Int(2));
}

#[test]
fn test_truncate_is_unsupported_but_delete_empties() {
    let db = setup();
    seed(&db);

    let err = table("posts").truncate(&db).unwrap_err();
    assert!(matches!(err, QuarryError::DatabaseError(_)));
    assert_eq!(table("posts").count(&db, "*").unwrap(), Value::Int(3));

    assert_eq!(table("posts").delete(&db).unwrap(), 3);
    assert_eq!(table("posts").count(&db, "*").unwrap(), Value::Int(0));
}

#[test]
fn test_raw_order_does_not_break_update_or_delete() {
    let db = setup();
    seed(&db);

    let mut q = table("users");
    q.where_eq("name", "ada")
        .unwrap()
        .order_by_raw("abs(age - ?)", vec![Value::Int(40)]);
    assert_eq!(q.update(&db, &[("age", Value::Int(37))]).unwrap(), 1);

    let mut drafts = table("posts");
    drafts
        .where_eq("published", false)
        .unwrap()
        .order_by_raw("length(title) > ?", vec![Value::Int(3)]);
    assert_eq!(drafts.delete(&db).unwrap(), 1);
}

#[test]
fn test_constraint_violation_propagates() {
    let db = setup();
    seed(&db);
    let err = table("users")
        .insert(&db, &[user("ada", 1, "2024-01-01 00:00:00")])
        .unwrap_err();
    assert!(matches!(err, QuarryError::IntegrityError(_)));
}

#[test]
fn test_savepoint_rollback_keeps_outer_work() {
    let mut manager = TransactionManager::new(setup(), grammar());

    manager
        .run_in_transaction(|tx| {
            tx.table("users").insert(&*tx, &[user("ada", 36, "2024-03-07 09:30:00")])?;

            let inner = tx.run_in_transaction(|tx| -> QuarryResult<()> {
                tx.table("users").insert(&*tx, &[user("bob", 20, "2024-03-07 09:30:00")])?;
                tx.table("users").insert(&*tx, &[user("bob", 21, "2024-03-07 09:30:00")])?;
                Ok(())
            });
            assert!(matches!(inner, Err(QuarryError::IntegrityError(_))));
            assert_eq!(tx.transaction_level(), 1);
            Ok(())
        })
        .unwrap();

    assert_eq!(manager.transaction_level(), 0);
    let rows = manager.table("users").get(&manager).unwrap();
    assert_eq!(names(&rows), vec!["ada"]);
}

#[test]
fn test_manual_depth_control() {
    let mut manager = TransactionManager::new(setup(), grammar());

    manager.begin().unwrap();
    manager.table("users").insert(&manager, &[user("a", 1, "")]).unwrap();
    manager.begin().unwrap();
    manager.table("users").insert(&manager, &[user("b", 2, "")]).unwrap();
    manager.begin().unwrap();
    manager.table("users").insert(&manager, &[user("c", 3, "")]).unwrap();

    // drops "c" only
    manager.rollback(None).unwrap();
    assert_eq!(manager.transaction_level(), 2);
    // out of range: nothing happens
    manager.rollback(Some(4)).unwrap();
    manager.commit().unwrap();
    manager.commit().unwrap();
    manager.commit().unwrap();
    assert_eq!(manager.transaction_level(), 0);

    let mut q = manager.table("users");
    q.select(&["name"]).order_by("name", "asc");
    assert_eq!(names(&q.get(&manager).unwrap()), vec!["a", "b"]);
}

#[test]
fn test_failed_transaction_rolls_everything_back() {
    let backend = setup();
    let mut manager = TransactionManager::new(backend.clone(), grammar());

    let result = manager.run_in_transaction(|tx| -> QuarryResult<()> {
        tx.table("users").insert(&*tx, &[user("temp", 1, "")])?;
        Err(QuarryError::DatabaseError("abort".into()))
    });
    assert!(result.is_err());
    assert_eq!(table("users").count(&backend, "*").unwrap(), Value::Int(0));
}
