//! Member repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide find/insert/update/delete APIs over the `members` table.
//! - Offer targeted flag updates so vital events never rewrite whole rows.
//! - Provide the succession query: living family members ordered by birth
//!   date ascending, then insertion order.
//!
//! # Invariants
//! - Succession ordering is `date_of_birth ASC, member_seq ASC`.
//! - A second living head in one family is rejected by the
//!   `idx_members_living_head` index and surfaces as `RepoError::Duplicate`.

use super::{
    bool_to_int, date_to_db, ensure_connection_ready, map_write_error, parse_bool, parse_date,
    parse_optional_uuid, parse_uuid, RepoError, RepoResult,
};
use crate::model::member::{Gender, MaritalLink, MaritalStatus, Member, MemberId};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const ENTITY: &str = "member";
const HEAD_ENTITY: &str = "living head of family";

const MEMBER_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    gender,
    date_of_birth,
    family_number,
    relation,
    phone,
    email,
    occupation,
    is_hof,
    is_deceased,
    is_baptised,
    marital_status,
    spouse_uuid,
    spouse_name
FROM members";

const MEMBER_COLUMNS: &[&str] = &[
    "member_seq",
    "uuid",
    "name",
    "gender",
    "date_of_birth",
    "family_number",
    "relation",
    "phone",
    "email",
    "occupation",
    "is_hof",
    "is_deceased",
    "is_baptised",
    "marital_status",
    "spouse_uuid",
    "spouse_name",
];

/// Query options for listing members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberListQuery {
    pub family_number: Option<String>,
    pub include_deceased: bool,
}

/// Repository interface for the member directory.
pub trait MemberRepository {
    fn create_member(&self, member: &Member) -> RepoResult<MemberId>;
    /// Rewrites descriptive fields only. Flags and spouse links are untouched.
    fn update_member_profile(&self, member: &Member) -> RepoResult<()>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    fn delete_member(&self, id: MemberId) -> RepoResult<()>;
    fn list_members(&self, query: &MemberListQuery) -> RepoResult<Vec<Member>>;
    /// Living members of one family in succession order.
    fn list_living_family_members(&self, family_number: &str) -> RepoResult<Vec<Member>>;
    fn find_living_head(&self, family_number: &str) -> RepoResult<Option<Member>>;
    /// Members whose `spouse_uuid` points at `id`.
    fn list_spouses_of(&self, id: MemberId) -> RepoResult<Vec<Member>>;
    fn set_head_of_family(&self, id: MemberId, is_hof: bool) -> RepoResult<()>;
    /// Writes `is_hof` and `is_deceased` in one statement.
    fn set_vital_flags(&self, id: MemberId, is_hof: bool, is_deceased: bool) -> RepoResult<()>;
    fn set_marital_link(&self, id: MemberId, link: &MaritalLink) -> RepoResult<()>;
    fn set_baptised(&self, id: MemberId, is_baptised: bool) -> RepoResult<()>;
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "members", MEMBER_COLUMNS)?;
        Ok(Self { conn })
    }

    fn query_members(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<Member>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn expect_changed(&self, changed: usize, id: MemberId) -> RepoResult<()> {
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: ENTITY,
                key: id.to_string(),
            });
        }
        Ok(())
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn create_member(&self, member: &Member) -> RepoResult<MemberId> {
        member.validate()?;

        self.conn
            .execute(
                "INSERT INTO members (
                    uuid,
                    name,
                    gender,
                    date_of_birth,
                    family_number,
                    relation,
                    phone,
                    email,
                    occupation,
                    is_hof,
                    is_deceased,
                    is_baptised,
                    marital_status,
                    spouse_uuid,
                    spouse_name
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15);",
                params![
                    member.uuid.to_string(),
                    member.name.as_str(),
                    gender_to_db(member.gender),
                    date_to_db(member.date_of_birth),
                    member.family_number.as_deref(),
                    member.relation.as_deref(),
                    member.phone.as_deref(),
                    member.email.as_deref(),
                    member.occupation.as_deref(),
                    bool_to_int(member.is_hof),
                    bool_to_int(member.is_deceased),
                    bool_to_int(member.is_baptised),
                    marital_status_to_db(member.marital_status),
                    member.spouse_id.map(|id| id.to_string()),
                    member.spouse_name.as_deref(),
                ],
            )
            .map_err(|err| {
                if member.is_hof {
                    map_write_error(
                        err,
                        HEAD_ENTITY,
                        member.family_number.clone().unwrap_or_default(),
                    )
                } else {
                    map_write_error(err, ENTITY, member.uuid.to_string())
                }
            })?;

        Ok(member.uuid)
    }

    fn update_member_profile(&self, member: &Member) -> RepoResult<()> {
        member.validate()?;

        let changed = self.conn.execute(
            "UPDATE members
             SET
                name = ?2,
                gender = ?3,
                date_of_birth = ?4,
                relation = ?5,
                phone = ?6,
                email = ?7,
                occupation = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                member.uuid.to_string(),
                member.name.as_str(),
                gender_to_db(member.gender),
                date_to_db(member.date_of_birth),
                member.relation.as_deref(),
                member.phone.as_deref(),
                member.email.as_deref(),
                member.occupation.as_deref(),
            ],
        )?;
        self.expect_changed(changed, member.uuid)
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        let mut members = self.query_members(
            &format!("{MEMBER_SELECT_SQL} WHERE uuid = ?;"),
            vec![Value::Text(id.to_string())],
        )?;
        Ok(members.pop())
    }

    fn delete_member(&self, id: MemberId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE uuid = ?1;", [id.to_string()])?;
        self.expect_changed(changed, id)
    }

    fn list_members(&self, query: &MemberListQuery) -> RepoResult<Vec<Member>> {
        let mut sql = format!("{MEMBER_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(family_number) = &query.family_number {
            sql.push_str(" AND family_number = ?");
            bind_values.push(Value::Text(family_number.clone()));
        }
        if !query.include_deceased {
            sql.push_str(" AND is_deceased = 0");
        }
        sql.push_str(" ORDER BY family_number ASC, date_of_birth ASC, member_seq ASC;");

        self.query_members(&sql, bind_values)
    }

    fn list_living_family_members(&self, family_number: &str) -> RepoResult<Vec<Member>> {
        self.query_members(
            &format!(
                "{MEMBER_SELECT_SQL}
                 WHERE family_number = ?
                   AND is_deceased = 0
                 ORDER BY date_of_birth ASC, member_seq ASC;"
            ),
            vec![Value::Text(family_number.to_string())],
        )
    }

    fn find_living_head(&self, family_number: &str) -> RepoResult<Option<Member>> {
        let mut heads = self.query_members(
            &format!(
                "{MEMBER_SELECT_SQL}
                 WHERE family_number = ?
                   AND is_hof = 1
                   AND is_deceased = 0;"
            ),
            vec![Value::Text(family_number.to_string())],
        )?;
        Ok(heads.pop())
    }

    fn list_spouses_of(&self, id: MemberId) -> RepoResult<Vec<Member>> {
        self.query_members(
            &format!("{MEMBER_SELECT_SQL} WHERE spouse_uuid = ? ORDER BY member_seq ASC;"),
            vec![Value::Text(id.to_string())],
        )
    }

    fn set_head_of_family(&self, id: MemberId, is_hof: bool) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE members
                 SET is_hof = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![id.to_string(), bool_to_int(is_hof)],
            )
            .map_err(|err| map_write_error(err, HEAD_ENTITY, id.to_string()))?;
        self.expect_changed(changed, id)
    }

    fn set_vital_flags(&self, id: MemberId, is_hof: bool, is_deceased: bool) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE members
                 SET is_hof = ?2,
                     is_deceased = ?3,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1;",
                params![id.to_string(), bool_to_int(is_hof), bool_to_int(is_deceased)],
            )
            .map_err(|err| map_write_error(err, HEAD_ENTITY, id.to_string()))?;
        self.expect_changed(changed, id)
    }

    fn set_marital_link(&self, id: MemberId, link: &MaritalLink) -> RepoResult<()> {
        if link.spouse_id() == Some(id) {
            return Err(crate::model::ValidationError::SelfSpouse(id).into());
        }
        let changed = self.conn.execute(
            "UPDATE members
             SET marital_status = ?2,
                 spouse_uuid = ?3,
                 spouse_name = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                marital_status_to_db(link.status()),
                link.spouse_id().map(|value| value.to_string()),
                link.spouse_name(),
            ],
        )?;
        self.expect_changed(changed, id)
    }

    fn set_baptised(&self, id: MemberId, is_baptised: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE members
             SET is_baptised = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![id.to_string(), bool_to_int(is_baptised)],
        )?;
        self.expect_changed(changed, id)
    }
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let uuid_text: String = row.get("uuid")?;
    let gender_text: String = row.get("gender")?;
    let gender = parse_gender(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid gender `{gender_text}` in members.gender"))
    })?;
    let status_text: String = row.get("marital_status")?;
    let marital_status = parse_marital_status(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid marital status `{status_text}` in members.marital_status"
        ))
    })?;
    let dob_text: String = row.get("date_of_birth")?;

    let member = Member {
        uuid: parse_uuid(&uuid_text, "members.uuid")?,
        name: row.get("name")?,
        gender,
        date_of_birth: parse_date(&dob_text, "members.date_of_birth")?,
        family_number: row.get("family_number")?,
        relation: row.get("relation")?,
        phone: row.get("phone")?,
        email: row.get("email")?,
        occupation: row.get("occupation")?,
        is_hof: parse_bool(row.get("is_hof")?, "members.is_hof")?,
        is_deceased: parse_bool(row.get("is_deceased")?, "members.is_deceased")?,
        is_baptised: parse_bool(row.get("is_baptised")?, "members.is_baptised")?,
        marital_status,
        spouse_id: parse_optional_uuid(row.get("spouse_uuid")?, "members.spouse_uuid")?,
        spouse_name: row.get("spouse_name")?,
    };
    member.validate()?;
    Ok(member)
}

pub(crate) fn gender_to_db(gender: Gender) -> &'static str {
    match gender {
        Gender::Male => "male",
        Gender::Female => "female",
    }
}

pub(crate) fn parse_gender(value: &str) -> Option<Gender> {
    match value {
        "male" => Some(Gender::Male),
        "female" => Some(Gender::Female),
        _ => None,
    }
}

fn marital_status_to_db(status: MaritalStatus) -> &'static str {
    match status {
        MaritalStatus::Single => "single",
        MaritalStatus::Married => "married",
    }
}

fn parse_marital_status(value: &str) -> Option<MaritalStatus> {
    match value {
        "single" => Some(MaritalStatus::Single),
        "married" => Some(MaritalStatus::Married),
        _ => None,
    }
}
