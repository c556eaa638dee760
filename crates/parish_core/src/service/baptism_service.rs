//! Baptism register use-cases.
//!
//! # Invariants
//! - Recording a parishioner baptism marks the member baptised.
//! - Deleting a record clears the flag only when no other baptism record
//!   references the member.

use super::saga::Saga;
use crate::error::{MemberProblem, RegisterError, RegisterResult};
use crate::model::baptism::{BaptismDetails, BaptismRecord, BaptismRecordId, BaptismSubject};
use crate::repo::baptism_repo::BaptismRepository;
use crate::repo::family_repo::FamilyRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::DateRange;
use log::{debug, info};
use serde::{Deserialize, Serialize};

const REGISTER: &str = "baptism register";

/// Input for a new baptism record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaptismSubmission {
    pub sl_no: i64,
    pub subject: BaptismSubject,
    pub details: BaptismDetails,
}

/// Baptism register service over repository implementations.
pub struct BaptismRecorder<M: MemberRepository, F: FamilyRepository, B: BaptismRepository> {
    members: M,
    families: F,
    baptisms: B,
}

impl<M: MemberRepository, F: FamilyRepository, B: BaptismRepository> BaptismRecorder<M, F, B> {
    pub fn new(members: M, families: F, baptisms: B) -> Self {
        Self {
            members,
            families,
            baptisms,
        }
    }

    /// Records a baptism.
    ///
    /// # Errors
    /// - `NotFound` when the referenced member or family does not exist.
    /// - `MemberInvalid` when the member is deceased or in another family.
    /// - `DuplicateSequence` when `sl_no` is taken.
    pub fn record(&self, submission: BaptismSubmission) -> RegisterResult<BaptismRecord> {
        let mut mark_member = None;
        if let BaptismSubject::Parishioner {
            member_id,
            family_number,
        } = &submission.subject
        {
            let member = self
                .members
                .get_member(*member_id)?
                .ok_or_else(|| RegisterError::not_found("member", member_id))?;
            if self.families.get_family(family_number)?.is_none() {
                return Err(RegisterError::not_found("family", family_number));
            }
            if member.is_deceased {
                return Err(RegisterError::member_invalid(
                    member.uuid,
                    MemberProblem::Deceased,
                ));
            }
            if !member.belongs_to(family_number) {
                return Err(RegisterError::member_invalid(
                    member.uuid,
                    MemberProblem::WrongFamily {
                        expected: family_number.clone(),
                        actual: member.family_number.clone(),
                    },
                ));
            }
            if !member.is_baptised {
                mark_member = Some(member.uuid);
            }
        }

        let record = BaptismRecord::new(submission.sl_no, submission.subject, submission.details);
        record.validate()?;

        let mut saga = Saga::new("record_baptism");
        self.baptisms.create_baptism(&record).map_err(|err| {
            RegisterError::on_duplicate(err, || RegisterError::DuplicateSequence {
                register: REGISTER,
                sl_no: record.sl_no,
            })
        })?;
        let record_id = record.uuid;
        saga.record("persist_record", move || {
            self.baptisms.delete_baptism(record_id)
        });

        if let Some(member_id) = mark_member {
            if let Err(err) = self.members.set_baptised(member_id, true) {
                return Err(saga.abort(err.into()));
            }
        }
        saga.complete();

        info!(
            "event=baptism_record module=service status=ok record={} sl_no={}",
            record.uuid, record.sl_no
        );
        Ok(record)
    }

    /// Deletes a record, clearing the member flag when it was the last one.
    pub fn delete(&self, id: BaptismRecordId) -> RegisterResult<()> {
        let record = self
            .baptisms
            .get_baptism(id)?
            .ok_or_else(|| RegisterError::not_found("baptism record", id))?;

        let mut saga = Saga::new("delete_baptism");
        self.baptisms.delete_baptism(id)?;
        let restore = record.clone();
        saga.record("remove_record", move || {
            self.baptisms.create_baptism(&restore).map(|_| ())
        });

        if let Some(member_id) = record.subject.member_id() {
            let remaining = match self.baptisms.count_baptisms_for_member(member_id) {
                Ok(remaining) => remaining,
                Err(err) => return Err(saga.abort(err.into())),
            };
            let member = match self.members.get_member(member_id) {
                Ok(member) => member,
                Err(err) => return Err(saga.abort(err.into())),
            };
            match member {
                Some(member) if remaining == 0 && member.is_baptised => {
                    if let Err(err) = self.members.set_baptised(member_id, false) {
                        return Err(saga.abort(err.into()));
                    }
                }
                _ => debug!(
                    "event=baptism_delete module=service status=flag_kept member={} remaining={}",
                    member_id, remaining
                ),
            }
        }
        saga.complete();

        info!(
            "event=baptism_delete module=service status=ok record={} sl_no={}",
            record.uuid, record.sl_no
        );
        Ok(())
    }

    pub fn get(&self, id: BaptismRecordId) -> RegisterResult<Option<BaptismRecord>> {
        Ok(self.baptisms.get_baptism(id)?)
    }

    pub fn find_by_sl_no(&self, sl_no: i64) -> RegisterResult<Option<BaptismRecord>> {
        Ok(self.baptisms.find_baptism_by_sl_no(sl_no)?)
    }

    /// Lists records newest baptism first.
    pub fn list(&self, range: &DateRange) -> RegisterResult<Vec<BaptismRecord>> {
        Ok(self.baptisms.list_baptisms(range)?)
    }
}
