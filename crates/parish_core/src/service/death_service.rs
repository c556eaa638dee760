//! Death register use-cases.
//!
//! # Responsibility
//! - Record a death and apply its side effects to the member directory.
//! - Trigger head-of-family succession when the deceased was the head.
//! - Undo completed steps when a later step fails.
//!
//! # Invariants
//! - A parishioner death marks the member deceased and strips headship.
//! - Deleting a record revives the member but never reverts a succession.
//! - A next-head hint is only consulted when the deceased was the head.

use super::saga::Saga;
use super::succession::{OldestFirst, SuccessionOutcome, SuccessionPolicy, SuccessionResolver};
use crate::error::{MemberProblem, RegisterError, RegisterResult};
use crate::model::death::{DeathDetails, DeathRecord, DeathRecordId, DeathSubject};
use crate::model::member::{Member, MemberId};
use crate::repo::death_repo::DeathRepository;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::DateRange;
use log::{debug, info};
use serde::{Deserialize, Serialize};

const REGISTER: &str = "death register";

/// Input for a new death record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSubmission {
    pub sl_no: i64,
    pub subject: DeathSubject,
    /// Proposed next head of family.
    pub next_hof_candidate: Option<MemberId>,
    pub details: DeathDetails,
}

/// Stored record plus the succession it triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeathOutcome {
    pub record: DeathRecord,
    pub succession: SuccessionOutcome,
}

/// Death register service over repository implementations.
pub struct DeathRecorder<M: MemberRepository, F: FamilyRepository, D: DeathRepository> {
    members: M,
    families: F,
    deaths: D,
    policy: Box<dyn SuccessionPolicy>,
}

impl<M: MemberRepository, F: FamilyRepository, D: DeathRepository> DeathRecorder<M, F, D> {
    /// Creates a recorder electing successors with [`OldestFirst`].
    pub fn new(members: M, families: F, deaths: D) -> Self {
        Self::with_policy(members, families, deaths, Box::new(OldestFirst))
    }

    pub fn with_policy(
        members: M,
        families: F,
        deaths: D,
        policy: Box<dyn SuccessionPolicy>,
    ) -> Self {
        Self {
            members,
            families,
            deaths,
            policy,
        }
    }

    /// Records a death.
    ///
    /// # Errors
    /// - `NotFound` when the referenced member or family does not exist.
    /// - `MemberInvalid` when the member is already deceased or belongs to
    ///   another family.
    /// - `DuplicateSequence` when `sl_no` is taken.
    /// - `CandidateInvalid` when an explicit next head is unusable.
    /// - `CompensationFailed` when a failed step could not be undone.
    pub fn record(&self, submission: DeathSubmission) -> RegisterResult<DeathOutcome> {
        let subject_member = match &submission.subject {
            DeathSubject::Parishioner {
                member_id,
                family_number,
            } => Some(self.load_living_member(*member_id, family_number)?),
            DeathSubject::External => None,
        };

        let mut record = DeathRecord::new(submission.sl_no, submission.subject, submission.details);
        record.next_hof_candidate = submission.next_hof_candidate;
        record.validate()?;

        let mut saga = Saga::new("record_death");
        self.deaths.create_death(&record).map_err(|err| {
            RegisterError::on_duplicate(err, || RegisterError::DuplicateSequence {
                register: REGISTER,
                sl_no: record.sl_no,
            })
        })?;
        let record_id = record.uuid;
        saga.record("persist_record", move || self.deaths.delete_death(record_id));

        let mut succession = SuccessionOutcome::NotRequired;
        if let Some(member) = subject_member {
            let member_id = member.uuid;
            let was_hof = member.is_hof;
            if let Err(err) = self.members.set_vital_flags(member_id, false, true) {
                return Err(saga.abort(err.into()));
            }
            saga.record("mark_deceased", move || {
                self.members.set_vital_flags(member_id, was_hof, false)
            });

            if was_hof {
                let resolver =
                    SuccessionResolver::new(&self.members, &self.families, self.policy.as_ref());
                let family_number = member.family_number.as_deref().unwrap_or_default();
                match resolver.resolve(&member, family_number, record.next_hof_candidate) {
                    Ok(outcome) => succession = outcome,
                    Err(err) => return Err(saga.abort(err)),
                }
            } else if let Some(candidate) = record.next_hof_candidate {
                debug!(
                    "event=death_record module=service status=hint_ignored member={} candidate={}",
                    member_id, candidate
                );
            }
        }
        saga.complete();

        info!(
            "event=death_record module=service status=ok record={} sl_no={} parishioner={} successor={}",
            record.uuid,
            record.sl_no,
            record.is_parishioner(),
            succession
                .successor()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(DeathOutcome { record, succession })
    }

    /// Replaces the sequence number and descriptive details of a record.
    pub fn update(
        &self,
        id: DeathRecordId,
        sl_no: i64,
        details: DeathDetails,
    ) -> RegisterResult<DeathRecord> {
        if self.deaths.get_death(id)?.is_none() {
            return Err(RegisterError::not_found("death record", id));
        }
        self.deaths
            .update_death(id, sl_no, &details)
            .map_err(|err| {
                RegisterError::on_duplicate(err, || RegisterError::DuplicateSequence {
                    register: REGISTER,
                    sl_no,
                })
            })?;
        self.deaths
            .get_death(id)?
            .ok_or_else(|| RegisterError::not_found("death record", id))
    }

    /// Deletes a record and revives its member.
    ///
    /// Only the deceased flag is reverted. Headship stays where succession
    /// left it, so a revived former head comes back as an ordinary member.
    pub fn delete(&self, id: DeathRecordId) -> RegisterResult<()> {
        let record = self
            .deaths
            .get_death(id)?
            .ok_or_else(|| RegisterError::not_found("death record", id))?;

        let mut saga = Saga::new("delete_death");
        if let Some(member_id) = record.subject.member_id() {
            match self.members.get_member(member_id)? {
                Some(member) if member.is_deceased => {
                    let is_hof = member.is_hof;
                    self.members.set_vital_flags(member_id, is_hof, false)?;
                    saga.record("revive_member", move || {
                        self.members.set_vital_flags(member_id, is_hof, true)
                    });
                }
                Some(_) => debug!(
                    "event=death_delete module=service status=skip reason=member_living member={}",
                    member_id
                ),
                None => debug!(
                    "event=death_delete module=service status=skip reason=member_missing member={}",
                    member_id
                ),
            }
        }

        if let Err(err) = self.deaths.delete_death(id) {
            return Err(saga.abort(err.into()));
        }
        saga.complete();

        info!(
            "event=death_delete module=service status=ok record={} sl_no={}",
            record.uuid, record.sl_no
        );
        Ok(())
    }

    pub fn get(&self, id: DeathRecordId) -> RegisterResult<Option<DeathRecord>> {
        Ok(self.deaths.get_death(id)?)
    }

    pub fn find_by_sl_no(&self, sl_no: i64) -> RegisterResult<Option<DeathRecord>> {
        Ok(self.deaths.find_death_by_sl_no(sl_no)?)
    }

    /// Lists records newest death first.
    pub fn list(&self, range: &DateRange) -> RegisterResult<Vec<DeathRecord>> {
        Ok(self.deaths.list_deaths(range)?)
    }

    fn load_living_member(&self, member_id: MemberId, family_number: &str) -> RegisterResult<Member> {
        let member = self
            .members
            .get_member(member_id)?
            .ok_or_else(|| RegisterError::not_found("member", member_id))?;
        if self.families.get_family(family_number)?.is_none() {
            return Err(RegisterError::not_found("family", family_number));
        }
        if member.is_deceased {
            return Err(RegisterError::member_invalid(
                member_id,
                MemberProblem::Deceased,
            ));
        }
        if !member.belongs_to(family_number) {
            return Err(RegisterError::member_invalid(
                member_id,
                MemberProblem::WrongFamily {
                    expected: family_number.to_string(),
                    actual: member.family_number.clone(),
                },
            ));
        }
        Ok(member)
    }
}
