//! Family repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `family_number` uniqueness comes from the primary key; duplicates
//!   surface as `RepoError::Duplicate`.
//! - `head_of_family_name` is written only through `set_head_name`.

use super::{
    bool_to_int, ensure_connection_ready, map_write_error, parse_bool, RepoError, RepoResult,
};
use crate::model::family::Family;
use rusqlite::{params, Connection, Row};

const ENTITY: &str = "family";

const FAMILY_SELECT_SQL: &str = "SELECT
    family_number,
    name,
    head_of_family_name,
    location,
    village,
    contact_number,
    family_unit,
    ward_number,
    subscription
FROM families";

const FAMILY_COLUMNS: &[&str] = &[
    "family_number",
    "name",
    "head_of_family_name",
    "location",
    "village",
    "contact_number",
    "family_unit",
    "ward_number",
    "subscription",
];

/// Household grouping columns with distinct-value listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HouseholdGrouping {
    /// `family_unit`
    Unit,
    /// `ward_number`
    Block,
}

impl HouseholdGrouping {
    fn column(self) -> &'static str {
        match self {
            Self::Unit => "family_unit",
            Self::Block => "ward_number",
        }
    }
}

/// Repository interface for the family registry.
pub trait FamilyRepository {
    fn create_family(&self, family: &Family) -> RepoResult<()>;
    fn get_family(&self, family_number: &str) -> RepoResult<Option<Family>>;
    /// Rewrites household metadata. The head name is left untouched.
    fn update_family_metadata(&self, family: &Family) -> RepoResult<()>;
    fn set_head_name(&self, family_number: &str, head_name: Option<&str>) -> RepoResult<()>;
    fn delete_family(&self, family_number: &str) -> RepoResult<()>;
    fn list_families(&self) -> RepoResult<Vec<Family>>;
    /// Counts affiliated members, living or deceased.
    fn count_members(&self, family_number: &str) -> RepoResult<u32>;
    /// Distinct non-blank values of one grouping column, sorted.
    fn list_groupings(&self, grouping: HouseholdGrouping) -> RepoResult<Vec<String>>;
}

/// SQLite-backed family repository.
pub struct SqliteFamilyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFamilyRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "families", FAMILY_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl FamilyRepository for SqliteFamilyRepository<'_> {
    fn create_family(&self, family: &Family) -> RepoResult<()> {
        family.validate()?;

        self.conn
            .execute(
                "INSERT INTO families (
                    family_number,
                    name,
                    head_of_family_name,
                    location,
                    village,
                    contact_number,
                    family_unit,
                    ward_number,
                    subscription
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
                params![
                    family.family_number.as_str(),
                    family.name.as_str(),
                    family.head_of_family_name.as_deref(),
                    family.location.as_deref(),
                    family.village.as_deref(),
                    family.contact_number.as_deref(),
                    family.family_unit.as_str(),
                    family.ward_number.as_str(),
                    bool_to_int(family.subscription),
                ],
            )
            .map_err(|err| map_write_error(err, ENTITY, family.family_number.clone()))?;
        Ok(())
    }

    fn get_family(&self, family_number: &str) -> RepoResult<Option<Family>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FAMILY_SELECT_SQL} WHERE family_number = ?1;"))?;
        let mut rows = stmt.query([family_number])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_family_row(row)?));
        }
        Ok(None)
    }

    fn update_family_metadata(&self, family: &Family) -> RepoResult<()> {
        family.validate()?;

        let changed = self.conn.execute(
            "UPDATE families
             SET
                name = ?2,
                location = ?3,
                village = ?4,
                contact_number = ?5,
                family_unit = ?6,
                ward_number = ?7,
                subscription = ?8,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE family_number = ?1;",
            params![
                family.family_number.as_str(),
                family.name.as_str(),
                family.location.as_deref(),
                family.village.as_deref(),
                family.contact_number.as_deref(),
                family.family_unit.as_str(),
                family.ward_number.as_str(),
                bool_to_int(family.subscription),
            ],
        )?;
        if changed == 0 {
            return Err(not_found(&family.family_number));
        }
        Ok(())
    }

    fn set_head_name(&self, family_number: &str, head_name: Option<&str>) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE families
             SET head_of_family_name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE family_number = ?1;",
            params![family_number, head_name],
        )?;
        if changed == 0 {
            return Err(not_found(family_number));
        }
        Ok(())
    }

    fn delete_family(&self, family_number: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM families WHERE family_number = ?1;",
            [family_number],
        )?;
        if changed == 0 {
            return Err(not_found(family_number));
        }
        Ok(())
    }

    fn list_families(&self) -> RepoResult<Vec<Family>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FAMILY_SELECT_SQL} ORDER BY family_number ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut families = Vec::new();
        while let Some(row) = rows.next()? {
            families.push(parse_family_row(row)?);
        }
        Ok(families)
    }

    fn count_members(&self, family_number: &str) -> RepoResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM members WHERE family_number = ?1;",
            [family_number],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_groupings(&self, grouping: HouseholdGrouping) -> RepoResult<Vec<String>> {
        let column = grouping.column();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT DISTINCT TRIM({column})
             FROM families
             WHERE TRIM({column}) <> ''
             ORDER BY 1 ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            values.push(row.get(0)?);
        }
        Ok(values)
    }
}

fn not_found(family_number: &str) -> RepoError {
    RepoError::NotFound {
        entity: ENTITY,
        key: family_number.to_string(),
    }
}

fn parse_family_row(row: &Row<'_>) -> RepoResult<Family> {
    let family = Family {
        family_number: row.get("family_number")?,
        name: row.get("name")?,
        head_of_family_name: row.get("head_of_family_name")?,
        location: row.get("location")?,
        village: row.get("village")?,
        contact_number: row.get("contact_number")?,
        family_unit: row.get("family_unit")?,
        ward_number: row.get("ward_number")?,
        subscription: parse_bool(row.get("subscription")?, "families.subscription")?,
    };
    family.validate()?;
    Ok(family)
}
