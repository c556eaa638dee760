//! Member directory use-cases.
//!
//! # Responsibility
//! - Register, edit and remove members without breaking household headship.
//! - Propagate renames to the family head name, spouse links and the
//!   marriage records naming the member.
//! - Hand headship over between living members of one family.
//!
//! # Invariants
//! - A family has at most one living head; the first living member added to
//!   a headless family becomes head.
//! - Member-to-member spouse links are only created by marriage records.
//! - A living head cannot be removed before headship is transferred.

use super::saga::Saga;
use crate::error::{CandidateProblem, MemberProblem, RegisterError, RegisterResult};
use crate::model::member::{Gender, MaritalLink, Member, MemberId};
use crate::repo::family_repo::FamilyRepository;
use crate::repo::marriage_repo::MarriageRepository;
use crate::repo::member_repo::{MemberListQuery, MemberRepository};
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

/// Descriptive member fields open to edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub relation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub occupation: Option<String>,
}

impl MemberProfile {
    fn apply_to(&self, member: &mut Member) {
        member.name = self.name.trim().to_string();
        member.gender = self.gender;
        member.date_of_birth = self.date_of_birth;
        member.relation = self.relation.clone();
        member.phone = self.phone.clone();
        member.email = self.email.clone();
        member.occupation = self.occupation.clone();
    }
}

/// Member directory service over repository implementations.
pub struct MemberDirectory<M: MemberRepository, F: FamilyRepository, R: MarriageRepository> {
    members: M,
    families: F,
    marriages: R,
}

impl<M: MemberRepository, F: FamilyRepository, R: MarriageRepository> MemberDirectory<M, F, R> {
    pub fn new(members: M, families: F, marriages: R) -> Self {
        Self {
            members,
            families,
            marriages,
        }
    }

    /// Registers a member.
    ///
    /// # Errors
    /// - `InvalidInput` when the member fails model validation.
    /// - `NotFound` when the family does not exist.
    /// - `MemberInvalid` when the member carries a member spouse link or
    ///   claims headship of a family that already has a living head.
    pub fn add_member(&self, mut member: Member) -> RegisterResult<Member> {
        member.name = member.name.trim().to_string();
        member.validate()?;
        if member.spouse_id.is_some() {
            return Err(RegisterError::member_invalid(
                member.uuid,
                MemberProblem::UnmanagedSpouseLink,
            ));
        }

        if let Some(family_number) = member.family_number.clone() {
            if self.families.get_family(&family_number)?.is_none() {
                return Err(RegisterError::not_found("family", &family_number));
            }
            let current_head = self.members.find_living_head(&family_number)?;
            match (&current_head, member.is_hof) {
                (Some(_), true) => {
                    return Err(RegisterError::member_invalid(
                        member.uuid,
                        MemberProblem::HeadAlreadyPresent { family_number },
                    ));
                }
                (None, false) if member.is_living() => member.is_hof = true,
                _ => {}
            }
        }

        let mut saga = Saga::new("add_member");
        self.members.create_member(&member)?;
        let member_id = member.uuid;
        saga.record("persist_member", move || {
            self.members.delete_member(member_id)
        });

        if member.is_hof {
            let family_number = member.family_number.as_deref().unwrap_or_default();
            if let Err(err) = self
                .families
                .set_head_name(family_number, Some(member.name.as_str()))
            {
                return Err(saga.abort(err.into()));
            }
        }
        saga.complete();

        info!(
            "event=member_add module=service status=ok member={} family={} is_hof={}",
            member.uuid,
            member.family_number.as_deref().unwrap_or("none"),
            member.is_hof
        );
        Ok(member)
    }

    /// Replaces a member's descriptive fields.
    ///
    /// A rename is copied to the family head name when the member is the
    /// living head, to every spouse linked to the member, and to the party
    /// name of the member's marriage records.
    pub fn update_member(&self, id: MemberId, profile: MemberProfile) -> RegisterResult<Member> {
        let previous = self
            .members
            .get_member(id)?
            .ok_or_else(|| RegisterError::not_found("member", id))?;
        let mut updated = previous.clone();
        profile.apply_to(&mut updated);
        updated.validate()?;

        let mut saga = Saga::new("update_member");
        self.members.update_member_profile(&updated)?;
        let restore = previous.clone();
        saga.record("rewrite_profile", move || {
            self.members.update_member_profile(&restore)
        });

        if updated.name != previous.name {
            if let Err(err) = self.propagate_rename(&mut saga, &previous.name, &updated) {
                return Err(saga.abort(err));
            }
        }
        saga.complete();

        info!(
            "event=member_update module=service status=ok member={} renamed={}",
            id,
            updated.name != previous.name
        );
        Ok(updated)
    }

    /// Makes `member_id` the head of `family_number`, demoting the current
    /// living head.
    ///
    /// # Errors
    /// - `NotFound` when the family does not exist.
    /// - `CandidateInvalid` when the member is missing, deceased or belongs
    ///   to another family.
    pub fn transfer_headship(
        &self,
        family_number: &str,
        member_id: MemberId,
    ) -> RegisterResult<Member> {
        if self.families.get_family(family_number)?.is_none() {
            return Err(RegisterError::not_found("family", family_number));
        }
        let candidate = self.members.get_member(member_id)?.ok_or_else(|| {
            RegisterError::candidate_invalid(member_id, CandidateProblem::Missing)
        })?;
        if candidate.is_deceased {
            return Err(RegisterError::candidate_invalid(
                member_id,
                CandidateProblem::Deceased,
            ));
        }
        if !candidate.belongs_to(family_number) {
            return Err(RegisterError::candidate_invalid(
                member_id,
                CandidateProblem::WrongFamily,
            ));
        }
        if candidate.is_hof {
            return Ok(candidate);
        }

        let mut saga = Saga::new("transfer_headship");
        if let Some(current) = self.members.find_living_head(family_number)? {
            let current_id = current.uuid;
            self.members.set_head_of_family(current_id, false)?;
            saga.record("demote_head", move || {
                self.members.set_head_of_family(current_id, true)
            });
        }
        if let Err(err) = self.members.set_head_of_family(member_id, true) {
            return Err(saga.abort(err.into()));
        }
        saga.record("appoint_head", move || {
            self.members.set_head_of_family(member_id, false)
        });
        if let Err(err) = self
            .families
            .set_head_name(family_number, Some(candidate.name.as_str()))
        {
            return Err(saga.abort(err.into()));
        }
        saga.complete();

        info!(
            "event=headship_transfer module=service status=ok family={} member={}",
            family_number, member_id
        );
        let mut head = candidate;
        head.is_hof = true;
        Ok(head)
    }

    /// Removes a member from the directory.
    ///
    /// Spouses keep their married status with the partner's name as text.
    /// Death, marriage and baptism records referencing the member are kept.
    pub fn delete_member(&self, id: MemberId) -> RegisterResult<()> {
        let member = self
            .members
            .get_member(id)?
            .ok_or_else(|| RegisterError::not_found("member", id))?;
        if member.is_hof && member.is_living() {
            return Err(RegisterError::member_invalid(
                id,
                MemberProblem::LivingHeadOfFamily,
            ));
        }

        let mut saga = Saga::new("delete_member");
        for spouse in self.members.list_spouses_of(id)? {
            let spouse_id = spouse.uuid;
            let detached = MaritalLink::External {
                name: member.name.clone(),
            };
            if let Err(err) = self.members.set_marital_link(spouse_id, &detached) {
                return Err(saga.abort(err.into()));
            }
            let previous = spouse.marital_link();
            saga.record("detach_spouse", move || {
                self.members.set_marital_link(spouse_id, &previous)
            });
        }

        if let Err(err) = self.members.delete_member(id) {
            return Err(saga.abort(err.into()));
        }
        saga.complete();

        info!(
            "event=member_delete module=service status=ok member={} family={}",
            id,
            member.family_number.as_deref().unwrap_or("none")
        );
        Ok(())
    }

    pub fn get_member(&self, id: MemberId) -> RegisterResult<Option<Member>> {
        Ok(self.members.get_member(id)?)
    }

    /// Lists members by family, ordered by birth date then registration.
    pub fn list_members(&self, query: &MemberListQuery) -> RegisterResult<Vec<Member>> {
        Ok(self.members.list_members(query)?)
    }

    fn propagate_rename<'s>(
        &'s self,
        saga: &mut Saga<'s>,
        previous_name: &str,
        updated: &Member,
    ) -> RegisterResult<()> {
        if updated.is_hof && updated.is_living() {
            if let Some(family_number) = updated.family_number.clone() {
                let old_name = self
                    .families
                    .get_family(&family_number)?
                    .and_then(|family| family.head_of_family_name);
                self.families
                    .set_head_name(&family_number, Some(updated.name.as_str()))?;
                saga.record("rename_head", move || {
                    self.families
                        .set_head_name(&family_number, old_name.as_deref())
                });
            }
        }

        let renamed = MaritalLink::Member {
            member_id: updated.uuid,
            name: updated.name.clone(),
        };
        for spouse in self.members.list_spouses_of(updated.uuid)? {
            let spouse_id = spouse.uuid;
            self.members.set_marital_link(spouse_id, &renamed)?;
            let previous = spouse.marital_link();
            saga.record("rename_spouse_link", move || {
                self.members.set_marital_link(spouse_id, &previous)
            });
        }

        // Unbinding matches a detached spouse link by this name.
        let member_id = updated.uuid;
        if self.marriages.rename_party(member_id, &updated.name)? > 0 {
            let old_name = previous_name.to_string();
            saga.record("rename_marriage_party", move || {
                self.marriages.rename_party(member_id, &old_name).map(|_| ())
            });
        }
        Ok(())
    }
}
