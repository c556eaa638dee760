//! Marriage register repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `marriage_id` duplicates are rejected by the UNIQUE constraint.
//! - Parties are stored as `spouse1_*`/`spouse2_*` column groups; a party
//!   with `is_parishioner = 1` always carries a member uuid.
//! - Listing order is `marriage_date DESC, marriage_id ASC`.

use super::{
    bool_to_int, date_to_db, ensure_connection_ready, map_write_error, parse_bool, parse_date,
    parse_optional_uuid, parse_uuid, push_date_range, DateRange, RepoError, RepoResult,
};
use crate::model::marriage::{MarriageDetails, MarriageParty, MarriageRecord, MarriageRecordId};
use crate::model::member::MemberId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ENTITY: &str = "marriage";
const KEY_ENTITY: &str = "marriage_id";

const MARRIAGE_SELECT_SQL: &str = "SELECT
    uuid,
    marriage_id,
    spouse1_is_parishioner,
    spouse1_uuid,
    spouse1_name,
    spouse1_home_parish,
    spouse2_is_parishioner,
    spouse2_uuid,
    spouse2_name,
    spouse2_home_parish,
    marriage_date,
    place,
    officiant_number
FROM marriages";

const MARRIAGE_COLUMNS: &[&str] = &[
    "uuid",
    "marriage_id",
    "spouse1_is_parishioner",
    "spouse1_uuid",
    "spouse1_name",
    "spouse2_is_parishioner",
    "spouse2_uuid",
    "spouse2_name",
    "marriage_date",
];

/// Query options for listing marriages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarriageListQuery {
    pub range: DateRange,
    /// Case-insensitive substring match on either party's name.
    pub spouse_name: Option<String>,
}

/// Repository interface for the marriage register.
pub trait MarriageRepository {
    fn create_marriage(&self, record: &MarriageRecord) -> RepoResult<MarriageRecordId>;
    fn get_marriage(&self, id: MarriageRecordId) -> RepoResult<Option<MarriageRecord>>;
    fn find_marriage_by_key(&self, marriage_id: &str) -> RepoResult<Option<MarriageRecord>>;
    fn update_marriage_details(
        &self,
        id: MarriageRecordId,
        details: &MarriageDetails,
    ) -> RepoResult<()>;
    /// Rewrites the stored party name on every record naming `member_id`.
    /// Returns the number of records touched.
    fn rename_party(&self, member_id: MemberId, name: &str) -> RepoResult<usize>;
    fn delete_marriage(&self, id: MarriageRecordId) -> RepoResult<()>;
    fn list_marriages(&self, query: &MarriageListQuery) -> RepoResult<Vec<MarriageRecord>>;
}

/// SQLite-backed marriage register.
pub struct SqliteMarriageRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMarriageRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "marriages", MARRIAGE_COLUMNS)?;
        Ok(Self { conn })
    }

    fn query_marriages(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
    ) -> RepoResult<Vec<MarriageRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_marriage_row(row)?);
        }
        Ok(records)
    }
}

/// Column values for one party: `(is_parishioner, uuid, name, home_parish)`.
fn party_columns(party: &MarriageParty) -> (i64, Option<String>, &str, Option<&str>) {
    match party {
        MarriageParty::Parishioner { member_id, name } => {
            (1, Some(member_id.to_string()), name.as_str(), None)
        }
        MarriageParty::External { name, home_parish } => {
            (0, None, name.as_str(), home_parish.as_deref())
        }
    }
}

impl MarriageRepository for SqliteMarriageRepository<'_> {
    fn create_marriage(&self, record: &MarriageRecord) -> RepoResult<MarriageRecordId> {
        record.validate()?;

        let (first_flag, first_uuid, first_name, first_parish) = party_columns(&record.first);
        let (second_flag, second_uuid, second_name, second_parish) =
            party_columns(&record.second);

        self.conn
            .execute(
                "INSERT INTO marriages (
                    uuid,
                    marriage_id,
                    spouse1_is_parishioner,
                    spouse1_uuid,
                    spouse1_name,
                    spouse1_home_parish,
                    spouse2_is_parishioner,
                    spouse2_uuid,
                    spouse2_name,
                    spouse2_home_parish,
                    marriage_date,
                    place,
                    officiant_number
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
                params![
                    record.uuid.to_string(),
                    record.marriage_id.as_str(),
                    first_flag,
                    first_uuid,
                    first_name,
                    first_parish,
                    second_flag,
                    second_uuid,
                    second_name,
                    second_parish,
                    date_to_db(record.details.date),
                    record.details.place.as_deref(),
                    record.details.officiant_number.as_deref(),
                ],
            )
            .map_err(|err| map_write_error(err, KEY_ENTITY, record.marriage_id.clone()))?;

        Ok(record.uuid)
    }

    fn get_marriage(&self, id: MarriageRecordId) -> RepoResult<Option<MarriageRecord>> {
        let mut records = self.query_marriages(
            &format!("{MARRIAGE_SELECT_SQL} WHERE uuid = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(records.pop())
    }

    fn find_marriage_by_key(&self, marriage_id: &str) -> RepoResult<Option<MarriageRecord>> {
        let mut records = self.query_marriages(
            &format!("{MARRIAGE_SELECT_SQL} WHERE marriage_id = ?;"),
            vec![Value::Text(marriage_id.to_string())],
        )?;
        Ok(records.pop())
    }

    fn update_marriage_details(
        &self,
        id: MarriageRecordId,
        details: &MarriageDetails,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE marriages
             SET
                marriage_date = ?2,
                place = ?3,
                officiant_number = ?4,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                date_to_db(details.date),
                details.place.as_deref(),
                details.officiant_number.as_deref(),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn rename_party(&self, member_id: MemberId, name: &str) -> RepoResult<usize> {
        let member_id = member_id.to_string();
        let mut changed = 0;
        for (uuid_col, name_col) in [
            ("spouse1_uuid", "spouse1_name"),
            ("spouse2_uuid", "spouse2_name"),
        ] {
            changed += self.conn.execute(
                &format!(
                    "UPDATE marriages
                     SET
                        {name_col} = ?2,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE {uuid_col} = ?1;"
                ),
                params![member_id.as_str(), name],
            )?;
        }
        Ok(changed)
    }

    fn delete_marriage(&self, id: MarriageRecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM marriages WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list_marriages(&self, query: &MarriageListQuery) -> RepoResult<Vec<MarriageRecord>> {
        let mut sql = format!("{MARRIAGE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_date_range(&mut sql, &mut bind_values, "marriage_date", &query.range);

        if let Some(name) = query
            .spouse_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
        {
            let pattern = format!("%{}%", escape_like(&name.to_lowercase()));
            sql.push_str(
                " AND (LOWER(spouse1_name) LIKE ? ESCAPE '\\' OR LOWER(spouse2_name) LIKE ? ESCAPE '\\')",
            );
            bind_values.push(Value::Text(pattern.clone()));
            bind_values.push(Value::Text(pattern));
        }

        sql.push_str(" ORDER BY marriage_date DESC, marriage_id ASC;");
        self.query_marriages(&sql, bind_values)
    }
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn not_found(id: MarriageRecordId) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY,
        key: id.to_string(),
    }
}

fn parse_party(row: &Row<'_>, prefix: &'static str) -> RepoResult<MarriageParty> {
    let (flag_col, uuid_col, name_col, parish_col) = match prefix {
        "spouse1" => (
            "spouse1_is_parishioner",
            "spouse1_uuid",
            "spouse1_name",
            "spouse1_home_parish",
        ),
        _ => (
            "spouse2_is_parishioner",
            "spouse2_uuid",
            "spouse2_name",
            "spouse2_home_parish",
        ),
    };

    let is_parishioner = parse_bool(row.get(flag_col)?, "marriages.spouse_is_parishioner")?;
    let member_id = parse_optional_uuid(row.get(uuid_col)?, "marriages.spouse_uuid")?;
    let name: String = row.get(name_col)?;

    match (is_parishioner, member_id) {
        (true, Some(member_id)) => Ok(MarriageParty::Parishioner { member_id, name }),
        (false, None) => Ok(MarriageParty::External {
            name,
            home_parish: row.get(parish_col)?,
        }),
        _ => Err(RepoError::InvalidData(format!(
            "inconsistent {prefix} columns in marriages"
        ))),
    }
}

fn parse_marriage_row(row: &Row<'_>) -> RepoResult<MarriageRecord> {
    let uuid_text: String = row.get("uuid")?;
    let date_text: String = row.get("marriage_date")?;

    let record = MarriageRecord {
        uuid: parse_uuid(&uuid_text, "marriages.uuid")?,
        marriage_id: row.get("marriage_id")?,
        first: parse_party(row, "spouse1")?,
        second: parse_party(row, "spouse2")?,
        details: MarriageDetails {
            date: parse_date(&date_text, "marriages.marriage_date")?,
            place: row.get("place")?,
            officiant_number: row.get("officiant_number")?,
        },
    };
    record.validate()?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
