//! Transactional facade over the register services.
//!
//! # Responsibility
//! - Run every mutating submission inside one `BEGIN IMMEDIATE` transaction.
//! - Wire SQLite repositories into the register services per call.
//!
//! # Invariants
//! - A submission commits completely or not at all; service-level
//!   compensation runs first, the transaction rollback backs it up.
//! - Concurrent writers on one database file are serialized by SQLite's
//!   reserved lock, so two deaths in one family cannot both elect a head.

use super::baptism_service::{BaptismRecorder, BaptismSubmission};
use super::death_service::{DeathOutcome, DeathRecorder, DeathSubmission};
use super::directory_service::{MemberDirectory, MemberProfile};
use super::family_service::{FamilyOverview, FamilyRegistry, HouseholdDetails};
use super::marriage_service::{MarriageRecorder, MarriageSubmission};
use crate::config::SuccessionPolicyKind;
use crate::error::{RegisterError, RegisterResult};
use crate::model::baptism::{BaptismRecord, BaptismRecordId};
use crate::model::death::{DeathDetails, DeathRecord, DeathRecordId};
use crate::model::family::Family;
use crate::model::marriage::{MarriageDetails, MarriageRecord, MarriageRecordId};
use crate::model::member::{Member, MemberId};
use crate::repo::baptism_repo::SqliteBaptismRepository;
use crate::repo::death_repo::SqliteDeathRepository;
use crate::repo::family_repo::SqliteFamilyRepository;
use crate::repo::marriage_repo::{MarriageListQuery, SqliteMarriageRepository};
use crate::repo::member_repo::{MemberListQuery, SqliteMemberRepository};
use crate::repo::{DateRange, RepoError};
use log::{debug, error, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// Parish register bound to one migrated connection.
pub struct ParishRegister<'conn> {
    conn: &'conn Connection,
    policy: SuccessionPolicyKind,
}

type Directory<'c> = MemberDirectory<
    SqliteMemberRepository<'c>,
    SqliteFamilyRepository<'c>,
    SqliteMarriageRepository<'c>,
>;
type Registry<'c> = FamilyRegistry<SqliteFamilyRepository<'c>, SqliteMemberRepository<'c>>;
type Deaths<'c> = DeathRecorder<
    SqliteMemberRepository<'c>,
    SqliteFamilyRepository<'c>,
    SqliteDeathRepository<'c>,
>;
type Marriages<'c> = MarriageRecorder<SqliteMemberRepository<'c>, SqliteMarriageRepository<'c>>;
type Baptisms<'c> = BaptismRecorder<
    SqliteMemberRepository<'c>,
    SqliteFamilyRepository<'c>,
    SqliteBaptismRepository<'c>,
>;

impl<'conn> ParishRegister<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_policy(conn, SuccessionPolicyKind::default())
    }

    pub fn with_policy(conn: &'conn Connection, policy: SuccessionPolicyKind) -> Self {
        Self { conn, policy }
    }

    // Families.

    pub fn create_family(&self, family: Family) -> RegisterResult<Family> {
        self.write("create_family", |conn| registry(conn)?.create_family(family))
    }

    pub fn update_family(
        &self,
        family_number: &str,
        details: HouseholdDetails,
    ) -> RegisterResult<Family> {
        self.write("update_family", |conn| {
            registry(conn)?.update_family(family_number, details)
        })
    }

    pub fn delete_family(&self, family_number: &str) -> RegisterResult<()> {
        self.write("delete_family", |conn| {
            registry(conn)?.delete_family(family_number)
        })
    }

    pub fn get_family(&self, family_number: &str) -> RegisterResult<Option<Family>> {
        registry(self.conn)?.get_family(family_number)
    }

    pub fn list_families(&self) -> RegisterResult<Vec<Family>> {
        registry(self.conn)?.list_families()
    }

    pub fn list_family_units(&self) -> RegisterResult<Vec<String>> {
        registry(self.conn)?.list_units()
    }

    pub fn list_family_blocks(&self) -> RegisterResult<Vec<String>> {
        registry(self.conn)?.list_blocks()
    }

    pub fn family_overview(&self, family_number: &str) -> RegisterResult<FamilyOverview> {
        registry(self.conn)?.overview(family_number)
    }

    // Members.

    pub fn add_member(&self, member: Member) -> RegisterResult<Member> {
        self.write("add_member", |conn| directory(conn)?.add_member(member))
    }

    pub fn update_member(&self, id: MemberId, profile: MemberProfile) -> RegisterResult<Member> {
        self.write("update_member", |conn| {
            directory(conn)?.update_member(id, profile)
        })
    }

    pub fn transfer_headship(
        &self,
        family_number: &str,
        member_id: MemberId,
    ) -> RegisterResult<Member> {
        self.write("transfer_headship", |conn| {
            directory(conn)?.transfer_headship(family_number, member_id)
        })
    }

    pub fn delete_member(&self, id: MemberId) -> RegisterResult<()> {
        self.write("delete_member", |conn| directory(conn)?.delete_member(id))
    }

    pub fn get_member(&self, id: MemberId) -> RegisterResult<Option<Member>> {
        directory(self.conn)?.get_member(id)
    }

    pub fn list_members(&self, query: &MemberListQuery) -> RegisterResult<Vec<Member>> {
        directory(self.conn)?.list_members(query)
    }

    // Death register.

    pub fn record_death(&self, submission: DeathSubmission) -> RegisterResult<DeathOutcome> {
        self.write("record_death", |conn| {
            self.deaths(conn)?.record(submission)
        })
    }

    pub fn update_death(
        &self,
        id: DeathRecordId,
        sl_no: i64,
        details: DeathDetails,
    ) -> RegisterResult<DeathRecord> {
        self.write("update_death", |conn| {
            self.deaths(conn)?.update(id, sl_no, details)
        })
    }

    pub fn delete_death(&self, id: DeathRecordId) -> RegisterResult<()> {
        self.write("delete_death", |conn| self.deaths(conn)?.delete(id))
    }

    pub fn get_death(&self, id: DeathRecordId) -> RegisterResult<Option<DeathRecord>> {
        self.deaths(self.conn)?.get(id)
    }

    pub fn find_death_by_sl_no(&self, sl_no: i64) -> RegisterResult<Option<DeathRecord>> {
        self.deaths(self.conn)?.find_by_sl_no(sl_no)
    }

    pub fn list_deaths(&self, range: &DateRange) -> RegisterResult<Vec<DeathRecord>> {
        self.deaths(self.conn)?.list(range)
    }

    // Marriage register.

    pub fn record_marriage(
        &self,
        submission: MarriageSubmission,
    ) -> RegisterResult<MarriageRecord> {
        self.write("record_marriage", |conn| {
            marriages(conn)?.record(submission)
        })
    }

    pub fn update_marriage(
        &self,
        id: MarriageRecordId,
        details: MarriageDetails,
    ) -> RegisterResult<MarriageRecord> {
        self.write("update_marriage", |conn| {
            marriages(conn)?.update(id, details)
        })
    }

    pub fn delete_marriage(&self, id: MarriageRecordId) -> RegisterResult<()> {
        self.write("delete_marriage", |conn| marriages(conn)?.delete(id))
    }

    pub fn get_marriage(&self, id: MarriageRecordId) -> RegisterResult<Option<MarriageRecord>> {
        marriages(self.conn)?.get(id)
    }

    pub fn find_marriage_by_key(
        &self,
        marriage_id: &str,
    ) -> RegisterResult<Option<MarriageRecord>> {
        marriages(self.conn)?.find_by_key(marriage_id)
    }

    pub fn list_marriages(
        &self,
        query: &MarriageListQuery,
    ) -> RegisterResult<Vec<MarriageRecord>> {
        marriages(self.conn)?.list(query)
    }

    // Baptism register.

    pub fn record_baptism(&self, submission: BaptismSubmission) -> RegisterResult<BaptismRecord> {
        self.write("record_baptism", |conn| baptisms(conn)?.record(submission))
    }

    pub fn delete_baptism(&self, id: BaptismRecordId) -> RegisterResult<()> {
        self.write("delete_baptism", |conn| baptisms(conn)?.delete(id))
    }

    pub fn get_baptism(&self, id: BaptismRecordId) -> RegisterResult<Option<BaptismRecord>> {
        baptisms(self.conn)?.get(id)
    }

    pub fn find_baptism_by_sl_no(&self, sl_no: i64) -> RegisterResult<Option<BaptismRecord>> {
        baptisms(self.conn)?.find_by_sl_no(sl_no)
    }

    pub fn list_baptisms(&self, range: &DateRange) -> RegisterResult<Vec<BaptismRecord>> {
        baptisms(self.conn)?.list(range)
    }

    fn deaths<'c>(&self, conn: &'c Connection) -> RegisterResult<Deaths<'c>> {
        Ok(DeathRecorder::with_policy(
            SqliteMemberRepository::try_new(conn)?,
            SqliteFamilyRepository::try_new(conn)?,
            SqliteDeathRepository::try_new(conn)?,
            self.policy.build(),
        ))
    }

    /// Runs `work` in an immediate transaction, committing only on success.
    fn write<T>(
        &self,
        operation: &'static str,
        work: impl FnOnce(&Connection) -> RegisterResult<T>,
    ) -> RegisterResult<T> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(|err| RegisterError::Storage(RepoError::from(err)))?;

        match work(&tx) {
            Ok(value) => {
                tx.commit()
                    .map_err(|err| RegisterError::Storage(RepoError::from(err)))?;
                debug!(
                    "event=register_write module=service status=ok operation={}",
                    operation
                );
                Ok(value)
            }
            Err(err) => {
                warn!(
                    "event=register_write module=service status=rollback operation={} error_code={}",
                    operation,
                    err.code()
                );
                if let Err(rollback_err) = tx.rollback() {
                    error!(
                        "event=register_write module=service status=fatal operation={} error={}",
                        operation, rollback_err
                    );
                    return Err(RegisterError::CompensationFailed {
                        operation,
                        step: "rollback",
                        original: Box::new(err),
                        source: RepoError::from(rollback_err),
                    });
                }
                Err(err)
            }
        }
    }
}

fn directory(conn: &Connection) -> RegisterResult<Directory<'_>> {
    Ok(MemberDirectory::new(
        SqliteMemberRepository::try_new(conn)?,
        SqliteFamilyRepository::try_new(conn)?,
        SqliteMarriageRepository::try_new(conn)?,
    ))
}

fn registry(conn: &Connection) -> RegisterResult<Registry<'_>> {
    Ok(FamilyRegistry::new(
        SqliteFamilyRepository::try_new(conn)?,
        SqliteMemberRepository::try_new(conn)?,
    ))
}

fn marriages(conn: &Connection) -> RegisterResult<Marriages<'_>> {
    Ok(MarriageRecorder::new(
        SqliteMemberRepository::try_new(conn)?,
        SqliteMarriageRepository::try_new(conn)?,
    ))
}

fn baptisms(conn: &Connection) -> RegisterResult<Baptisms<'_>> {
    Ok(BaptismRecorder::new(
        SqliteMemberRepository::try_new(conn)?,
        SqliteFamilyRepository::try_new(conn)?,
        SqliteBaptismRepository::try_new(conn)?,
    ))
}
