//! Baptism register repository contracts and SQLite implementation.

use super::member_repo::{gender_to_db, parse_gender};
use super::{
    bool_to_int, date_to_db, ensure_connection_ready, map_write_error, parse_bool, parse_date,
    parse_optional_uuid, parse_uuid, push_date_range, DateRange, RepoError, RepoResult,
};
use crate::model::baptism::{BaptismDetails, BaptismRecord, BaptismRecordId, BaptismSubject};
use crate::model::member::MemberId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ENTITY: &str = "baptism record";
const SEQUENCE_ENTITY: &str = "baptism record sl_no";

const BAPTISM_SELECT_SQL: &str = "SELECT
    uuid,
    sl_no,
    is_parishioner,
    member_uuid,
    family_number,
    home_parish,
    person_name,
    date_of_birth,
    gender,
    date_of_baptism,
    place_of_baptism,
    church_where_baptised,
    baptismal_name,
    godparent_name,
    godparent_house_name,
    certificate_number,
    remarks
FROM baptisms";

const BAPTISM_COLUMNS: &[&str] = &[
    "uuid",
    "sl_no",
    "is_parishioner",
    "member_uuid",
    "family_number",
    "person_name",
    "date_of_baptism",
    "baptismal_name",
];

/// Repository interface for the baptism register.
pub trait BaptismRepository {
    fn create_baptism(&self, record: &BaptismRecord) -> RepoResult<BaptismRecordId>;
    fn get_baptism(&self, id: BaptismRecordId) -> RepoResult<Option<BaptismRecord>>;
    fn find_baptism_by_sl_no(&self, sl_no: i64) -> RepoResult<Option<BaptismRecord>>;
    fn delete_baptism(&self, id: BaptismRecordId) -> RepoResult<()>;
    /// Lists by `date_of_baptism DESC, sl_no DESC`.
    fn list_baptisms(&self, range: &DateRange) -> RepoResult<Vec<BaptismRecord>>;
    fn count_baptisms_for_member(&self, member_id: MemberId) -> RepoResult<u32>;
}

/// SQLite-backed baptism register.
pub struct SqliteBaptismRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBaptismRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "baptisms", BAPTISM_COLUMNS)?;
        Ok(Self { conn })
    }

    fn query_baptisms(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
    ) -> RepoResult<Vec<BaptismRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_baptism_row(row)?);
        }
        Ok(records)
    }
}

impl BaptismRepository for SqliteBaptismRepository<'_> {
    fn create_baptism(&self, record: &BaptismRecord) -> RepoResult<BaptismRecordId> {
        record.validate()?;

        let (is_parishioner, member_uuid, family_number, home_parish) = match &record.subject {
            BaptismSubject::Parishioner {
                member_id,
                family_number,
            } => (true, Some(member_id.to_string()), Some(family_number.as_str()), None),
            BaptismSubject::External { home_parish } => {
                (false, None, None, home_parish.as_deref())
            }
        };
        let details = &record.details;

        self.conn
            .execute(
                "INSERT INTO baptisms (
                    uuid,
                    sl_no,
                    is_parishioner,
                    member_uuid,
                    family_number,
                    home_parish,
                    person_name,
                    date_of_birth,
                    gender,
                    date_of_baptism,
                    place_of_baptism,
                    church_where_baptised,
                    baptismal_name,
                    godparent_name,
                    godparent_house_name,
                    certificate_number,
                    remarks
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17);",
                params![
                    record.uuid.to_string(),
                    record.sl_no,
                    bool_to_int(is_parishioner),
                    member_uuid,
                    family_number,
                    home_parish,
                    details.person_name.as_str(),
                    date_to_db(details.date_of_birth),
                    gender_to_db(details.gender),
                    date_to_db(details.date_of_baptism),
                    details.place_of_baptism.as_deref(),
                    details.church_where_baptised.as_deref(),
                    details.baptismal_name.as_str(),
                    details.godparent_name.as_deref(),
                    details.godparent_house_name.as_deref(),
                    details.certificate_number.as_deref(),
                    details.remarks.as_deref(),
                ],
            )
            .map_err(|err| map_write_error(err, SEQUENCE_ENTITY, record.sl_no.to_string()))?;

        Ok(record.uuid)
    }

    fn get_baptism(&self, id: BaptismRecordId) -> RepoResult<Option<BaptismRecord>> {
        let mut records = self.query_baptisms(
            &format!("{BAPTISM_SELECT_SQL} WHERE uuid = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(records.pop())
    }

    fn find_baptism_by_sl_no(&self, sl_no: i64) -> RepoResult<Option<BaptismRecord>> {
        let mut records = self.query_baptisms(
            &format!("{BAPTISM_SELECT_SQL} WHERE sl_no = ?;"),
            vec![Value::Integer(sl_no)],
        )?;
        Ok(records.pop())
    }

    fn delete_baptism(&self, id: BaptismRecordId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM baptisms WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: ENTITY,
                key: id.to_string(),
            });
        }
        Ok(())
    }

    fn list_baptisms(&self, range: &DateRange) -> RepoResult<Vec<BaptismRecord>> {
        let mut sql = format!("{BAPTISM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values = Vec::new();
        push_date_range(&mut sql, &mut bind_values, "date_of_baptism", range);
        sql.push_str(" ORDER BY date_of_baptism DESC, sl_no DESC;");
        self.query_baptisms(&sql, bind_values)
    }

    fn count_baptisms_for_member(&self, member_id: MemberId) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM baptisms WHERE member_uuid = ?1;",
            [member_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn parse_baptism_row(row: &Row<'_>) -> RepoResult<BaptismRecord> {
    let uuid_text: String = row.get("uuid")?;
    let is_parishioner = parse_bool(row.get("is_parishioner")?, "baptisms.is_parishioner")?;
    let member_id = parse_optional_uuid(row.get("member_uuid")?, "baptisms.member_uuid")?;
    let family_number: Option<String> = row.get("family_number")?;

    let subject = match (is_parishioner, member_id, family_number) {
        (true, Some(member_id), Some(family_number)) => BaptismSubject::Parishioner {
            member_id,
            family_number,
        },
        (false, None, _) => BaptismSubject::External {
            home_parish: row.get("home_parish")?,
        },
        _ => {
            return Err(RepoError::InvalidData(format!(
                "inconsistent subject columns for baptism record `{uuid_text}`"
            )));
        }
    };

    let gender_text: String = row.get("gender")?;
    let gender = parse_gender(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid gender `{gender_text}` in baptisms.gender"))
    })?;
    let dob_text: String = row.get("date_of_birth")?;
    let baptism_text: String = row.get("date_of_baptism")?;

    let record = BaptismRecord {
        uuid: parse_uuid(&uuid_text, "baptisms.uuid")?,
        sl_no: row.get("sl_no")?,
        subject,
        details: BaptismDetails {
            person_name: row.get("person_name")?,
            date_of_birth: parse_date(&dob_text, "baptisms.date_of_birth")?,
            gender,
            date_of_baptism: parse_date(&baptism_text, "baptisms.date_of_baptism")?,
            place_of_baptism: row.get("place_of_baptism")?,
            church_where_baptised: row.get("church_where_baptised")?,
            baptismal_name: row.get("baptismal_name")?,
            godparent_name: row.get("godparent_name")?,
            godparent_house_name: row.get("godparent_house_name")?,
            certificate_number: row.get("certificate_number")?,
            remarks: row.get("remarks")?,
        },
    };
    record.validate()?;
    Ok(record)
}
