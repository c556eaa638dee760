//! Death register repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `sl_no` duplicates are rejected by the UNIQUE constraint and surface
//!   as `RepoError::Duplicate { entity: "death record sl_no", .. }`.
//! - The subject of a stored record is immutable; corrective edits replace
//!   `sl_no` and descriptive details only.
//! - Listing order is `death_date DESC, sl_no DESC`.

use super::{
    bool_to_int, date_to_db, ensure_connection_ready, map_write_error, parse_bool, parse_date,
    parse_optional_date, parse_optional_uuid, parse_uuid, push_date_range, DateRange, RepoError,
    RepoResult,
};
use crate::model::death::{DeathDetails, DeathRecord, DeathRecordId, DeathSubject};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ENTITY: &str = "death record";
const SEQUENCE_ENTITY: &str = "death record sl_no";

const DEATH_SELECT_SQL: &str = "SELECT
    uuid,
    sl_no,
    is_parishioner,
    member_uuid,
    family_number,
    next_hof_uuid,
    name,
    house_name,
    address_place,
    father_husband_name,
    mother_wife_name,
    death_date,
    burial_date,
    age,
    conducted_by,
    cause_of_death,
    cell_no,
    remarks
FROM death_records";

const DEATH_COLUMNS: &[&str] = &[
    "uuid",
    "sl_no",
    "is_parishioner",
    "member_uuid",
    "family_number",
    "next_hof_uuid",
    "name",
    "death_date",
    "burial_date",
];

/// Repository interface for the death register.
pub trait DeathRepository {
    fn create_death(&self, record: &DeathRecord) -> RepoResult<DeathRecordId>;
    fn get_death(&self, id: DeathRecordId) -> RepoResult<Option<DeathRecord>>;
    fn find_death_by_sl_no(&self, sl_no: i64) -> RepoResult<Option<DeathRecord>>;
    fn update_death(
        &self,
        id: DeathRecordId,
        sl_no: i64,
        details: &DeathDetails,
    ) -> RepoResult<()>;
    fn delete_death(&self, id: DeathRecordId) -> RepoResult<()>;
    fn list_deaths(&self, range: &DateRange) -> RepoResult<Vec<DeathRecord>>;
}

/// SQLite-backed death register.
pub struct SqliteDeathRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDeathRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "death_records", DEATH_COLUMNS)?;
        Ok(Self { conn })
    }

    fn query_deaths(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<DeathRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_death_row(row)?);
        }
        Ok(records)
    }
}

impl DeathRepository for SqliteDeathRepository<'_> {
    fn create_death(&self, record: &DeathRecord) -> RepoResult<DeathRecordId> {
        record.validate()?;

        let (member_uuid, family_number) = match &record.subject {
            DeathSubject::Parishioner {
                member_id,
                family_number,
            } => (Some(member_id.to_string()), Some(family_number.as_str())),
            DeathSubject::External => (None, None),
        };
        let details = &record.details;

        self.conn
            .execute(
                "INSERT INTO death_records (
                    uuid,
                    sl_no,
                    is_parishioner,
                    member_uuid,
                    family_number,
                    next_hof_uuid,
                    name,
                    house_name,
                    address_place,
                    father_husband_name,
                    mother_wife_name,
                    death_date,
                    burial_date,
                    age,
                    conducted_by,
                    cause_of_death,
                    cell_no,
                    remarks
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18);",
                params![
                    record.uuid.to_string(),
                    record.sl_no,
                    bool_to_int(record.is_parishioner()),
                    member_uuid,
                    family_number,
                    record.next_hof_candidate.map(|id| id.to_string()),
                    details.name.as_str(),
                    details.house_name.as_deref(),
                    details.address_place.as_deref(),
                    details.father_husband_name.as_deref(),
                    details.mother_wife_name.as_deref(),
                    date_to_db(details.death_date),
                    details.burial_date.map(date_to_db),
                    details.age,
                    details.conducted_by.as_deref(),
                    details.cause_of_death.as_deref(),
                    details.cell_no.as_deref(),
                    details.remarks.as_deref(),
                ],
            )
            .map_err(|err| map_write_error(err, SEQUENCE_ENTITY, record.sl_no.to_string()))?;

        Ok(record.uuid)
    }

    fn get_death(&self, id: DeathRecordId) -> RepoResult<Option<DeathRecord>> {
        let mut records = self.query_deaths(
            &format!("{DEATH_SELECT_SQL} WHERE uuid = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(records.pop())
    }

    fn find_death_by_sl_no(&self, sl_no: i64) -> RepoResult<Option<DeathRecord>> {
        let mut records = self.query_deaths(
            &format!("{DEATH_SELECT_SQL} WHERE sl_no = ?;"),
            vec![Value::Integer(sl_no)],
        )?;
        Ok(records.pop())
    }

    fn update_death(
        &self,
        id: DeathRecordId,
        sl_no: i64,
        details: &DeathDetails,
    ) -> RepoResult<()> {
        crate::model::require_sequence(sl_no)?;
        details.validate()?;

        let changed = self
            .conn
            .execute(
                "UPDATE death_records
                 SET
                    sl_no = ?2,
                    name = ?3,
                    house_name = ?4,
                    address_place = ?5,
                    father_husband_name = ?6,
                    mother_wife_name = ?7,
                    death_date = ?8,
                    burial_date = ?9,
                    age = ?10,
                    conducted_by = ?11,
                    cause_of_death = ?12,
                    cell_no = ?13,
                    remarks = ?14,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![
                    id.to_string(),
                    sl_no,
                    details.name.as_str(),
                    details.house_name.as_deref(),
                    details.address_place.as_deref(),
                    details.father_husband_name.as_deref(),
                    details.mother_wife_name.as_deref(),
                    date_to_db(details.death_date),
                    details.burial_date.map(date_to_db),
                    details.age,
                    details.conducted_by.as_deref(),
                    details.cause_of_death.as_deref(),
                    details.cell_no.as_deref(),
                    details.remarks.as_deref(),
                ],
            )
            .map_err(|err| map_write_error(err, SEQUENCE_ENTITY, sl_no.to_string()))?;

        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn delete_death(&self, id: DeathRecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM death_records WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    fn list_deaths(&self, range: &DateRange) -> RepoResult<Vec<DeathRecord>> {
        let mut sql = format!("{DEATH_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_date_range(&mut sql, &mut bind_values, "death_date", range);
        sql.push_str(" ORDER BY death_date DESC, sl_no DESC;");
        self.query_deaths(&sql, bind_values)
    }
}

fn not_found(id: DeathRecordId) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY,
        key: id.to_string(),
    }
}

fn parse_death_row(row: &Row<'_>) -> RepoResult<DeathRecord> {
    let uuid_text: String = row.get("uuid")?;
    let is_parishioner = parse_bool(row.get("is_parishioner")?, "death_records.is_parishioner")?;
    let member_id = parse_optional_uuid(row.get("member_uuid")?, "death_records.member_uuid")?;
    let family_number: Option<String> = row.get("family_number")?;

    let subject = match (is_parishioner, member_id, family_number) {
        (true, Some(member_id), Some(family_number)) => DeathSubject::Parishioner {
            member_id,
            family_number,
        },
        (false, None, None) => DeathSubject::External,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "inconsistent subject columns for death record `{uuid_text}`"
            )));
        }
    };

    let death_date_text: String = row.get("death_date")?;
    let details = DeathDetails {
        name: row.get("name")?,
        house_name: row.get("house_name")?,
        address_place: row.get("address_place")?,
        father_husband_name: row.get("father_husband_name")?,
        mother_wife_name: row.get("mother_wife_name")?,
        death_date: parse_date(&death_date_text, "death_records.death_date")?,
        burial_date: parse_optional_date(row.get("burial_date")?, "death_records.burial_date")?,
        age: row.get("age")?,
        conducted_by: row.get("conducted_by")?,
        cause_of_death: row.get("cause_of_death")?,
        cell_no: row.get("cell_no")?,
        remarks: row.get("remarks")?,
    };

    let record = DeathRecord {
        uuid: parse_uuid(&uuid_text, "death_records.uuid")?,
        sl_no: row.get("sl_no")?,
        subject,
        next_hof_candidate: parse_optional_uuid(
            row.get("next_hof_uuid")?,
            "death_records.next_hof_uuid",
        )?,
        details,
    };
    record.validate()?;
    Ok(record)
}
