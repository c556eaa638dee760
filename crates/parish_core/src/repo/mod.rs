//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define per-aggregate storage contracts used by register services.
//! - Isolate SQLite query details from succession and bond orchestration.
//! - Surface uniqueness violations as `RepoError::Duplicate`, straight from
//!   the storage constraint rather than from a separate existence check.
//!
//! # Invariants
//! - Write paths call the model's `validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repositories refuse connections whose schema is not fully migrated.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::ValidationError;
use chrono::NaiveDate;
use rusqlite::{Connection, ErrorCode};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod baptism_repo;
pub mod death_repo;
pub mod family_repo;
pub mod marriage_repo;
pub mod member_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every register aggregate.
#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    /// Targeted row does not exist.
    NotFound { entity: &'static str, key: String },
    /// A UNIQUE or PRIMARY KEY constraint rejected the write.
    Duplicate { entity: &'static str, key: String },
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Duplicate { entity, key } => write!(f, "duplicate {entity}: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted register data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "register repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "register repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "register repository requires column `{column}` in table `{table}`"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Inclusive date window used by register listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Whole calendar year window.
    pub fn year(year: i32) -> Self {
        Self {
            from: NaiveDate::from_ymd_opt(year, 1, 1),
            to: NaiveDate::from_ymd_opt(year, 12, 31),
        }
    }
}

/// Maps a write failure, turning uniqueness violations into `Duplicate`.
pub(crate) fn map_write_error(
    err: rusqlite::Error,
    entity: &'static str,
    key: impl Into<String>,
) -> RepoError {
    if is_unique_violation(&err) {
        return RepoError::Duplicate {
            entity,
            key: key.into(),
        };
    }
    err.into()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

pub(crate) fn ensure_connection_ready(
    conn: &Connection,
    table: &'static str,
    columns: &[&'static str],
) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, table)? {
        return Err(RepoError::MissingRequiredTable(table));
    }

    let present = table_columns(conn, table)?;
    for column in columns {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn { table, column });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get(1)?);
    }
    Ok(columns)
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean `{other}` in {column}"
        ))),
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<Uuid>> {
    value.map(|text| parse_uuid(&text, column)).transpose()
}

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn date_to_db(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_date(value: &str, column: &'static str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

pub(crate) fn parse_optional_date(
    value: Option<String>,
    column: &'static str,
) -> RepoResult<Option<NaiveDate>> {
    value.map(|text| parse_date(&text, column)).transpose()
}

/// Appends `column >= ? AND column <= ?` filters for a date window.
pub(crate) fn push_date_range(
    sql: &mut String,
    bind_values: &mut Vec<rusqlite::types::Value>,
    column: &str,
    range: &DateRange,
) {
    if let Some(from) = range.from {
        sql.push_str(&format!(" AND {column} >= ?"));
        bind_values.push(rusqlite::types::Value::Text(date_to_db(from)));
    }
    if let Some(to) = range.to {
        sql.push_str(&format!(" AND {column} <= ?"));
        bind_values.push(rusqlite::types::Value::Text(date_to_db(to)));
    }
}

#[cfg(test)]
mod tests {
    use super::{date_to_db, parse_bool, parse_date, DateRange, RepoError};
    use chrono::NaiveDate;

    #[test]
    fn dates_round_trip_through_iso_text() {
        let date = NaiveDate::from_ymd_opt(1950, 3, 7).unwrap();
        assert_eq!(date_to_db(date), "1950-03-07");
        assert_eq!(parse_date("1950-03-07", "members.date_of_birth").unwrap(), date);
    }

    #[test]
    fn malformed_values_surface_as_invalid_data() {
        assert!(matches!(
            parse_date("07/03/1950", "members.date_of_birth"),
            Err(RepoError::InvalidData(_))
        ));
        assert!(matches!(
            parse_bool(2, "members.is_hof"),
            Err(RepoError::InvalidData(_))
        ));
    }

    #[test]
    fn year_range_covers_whole_calendar_year() {
        let range = DateRange::year(2024);
        assert_eq!(range.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(range.to, NaiveDate::from_ymd_opt(2024, 12, 31));
    }
}
