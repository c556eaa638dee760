use parish_core::db::migrations::latest_version;
use parish_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "families");
    assert_table_exists(&conn, "members");
    assert_table_exists(&conn, "death_records");
    assert_table_exists(&conn, "marriages");
    assert_table_exists(&conn, "baptisms");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parish.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "members");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let result = conn.execute(
        "INSERT INTO members (uuid, name, gender, date_of_birth, family_number)
         VALUES ('m-1', 'Orphan', 'male', '1990-01-01', 'NO-SUCH-FAMILY');",
        [],
    );
    assert!(result.is_err());
}

#[test]
fn storage_rejects_second_living_head() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO families (family_number, name) VALUES ('F-1', 'Kallarackal');
         INSERT INTO members (uuid, name, gender, date_of_birth, family_number, is_hof)
         VALUES ('a', 'Thomas', 'male', '1950-01-01', 'F-1', 1);",
    )
    .unwrap();

    let second_head = conn.execute(
        "INSERT INTO members (uuid, name, gender, date_of_birth, family_number, is_hof)
         VALUES ('b', 'Mary', 'female', '1955-01-01', 'F-1', 1);",
        [],
    );
    assert!(second_head.is_err());

    conn.execute_batch(
        "UPDATE members SET is_hof = 0, is_deceased = 1 WHERE uuid = 'a';
         INSERT INTO members (uuid, name, gender, date_of_birth, family_number, is_hof)
         VALUES ('b', 'Mary', 'female', '1955-01-01', 'F-1', 1);",
    )
    .unwrap();
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
