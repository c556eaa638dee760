//! Schema steps of the register database.
//!
//! Each step is an embedded SQL script with a version number. The version of
//! the last applied step is stored in `PRAGMA user_version`; opening a file
//! runs every later step inside one transaction.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Ordered by `version`, starting at 1, without gaps.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "households",
        sql: include_str!("0001_households.sql"),
    },
    Migration {
        version: 2,
        name: "vital_records",
        sql: include_str!("0002_vital_records.sql"),
    },
];

/// Schema version a freshly opened register ends up at.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Brings the register schema up to [`latest_version`].
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is ahead of this build.
/// - `MigrationFailed` naming the step that broke; the file is left at its
///   previous version.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }
    if from_version == latest {
        return Ok(());
    }

    run_steps(conn, MIGRATIONS, from_version)?;
    info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    Ok(())
}

fn run_steps(conn: &mut Connection, steps: &[Migration], from_version: u32) -> DbResult<()> {
    let tx = conn.transaction()?;
    for step in steps.iter().filter(|step| step.version > from_version) {
        let script = format!("{}\nPRAGMA user_version = {};", step.sql, step.version);
        tx.execute_batch(&script)
            .map_err(|source| DbError::MigrationFailed {
                version: step.version,
                name: step.name,
                source,
            })?;
        debug!(
            "event=db_migrate module=db status=step version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;
    Ok(())
}

/// Reads the schema version recorded on the connection.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::{current_user_version, run_steps, Migration, MIGRATIONS};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn versions_are_contiguous_from_one() {
        for (index, step) in MIGRATIONS.iter().enumerate() {
            assert_eq!(step.version as usize, index + 1, "step {}", step.name);
        }
    }

    #[test]
    fn broken_step_is_named_and_rolled_back() {
        let mut conn = Connection::open_in_memory().unwrap();
        let steps = [
            Migration {
                version: 1,
                name: "ledger",
                sql: "CREATE TABLE ledger (id INTEGER PRIMARY KEY);",
            },
            Migration {
                version: 2,
                name: "broken",
                sql: "CREATE TABLE ledger (id INTEGER PRIMARY KEY);",
            },
        ];

        let err = run_steps(&mut conn, &steps, 0).unwrap_err();
        assert!(matches!(
            err,
            DbError::MigrationFailed {
                version: 2,
                name: "broken",
                ..
            }
        ));
        assert_eq!(current_user_version(&conn).unwrap(), 0);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'ledger';",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }
}
