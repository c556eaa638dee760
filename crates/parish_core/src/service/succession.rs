//! Head-of-family succession.
//!
//! # Responsibility
//! - Pick the next head when a head of family vacates the role.
//! - Honour an explicit candidate after validating it.
//! - Keep `families.head_of_family_name` in step with the elected head.
//!
//! # Invariants
//! - A family never gains a second living head.
//! - With no explicit candidate the policy sees living members in
//!   `date_of_birth ASC, member_seq ASC` order; ties resolve to the earlier
//!   registration.
//! - When no living member remains the family is left headless and its head
//!   name is cleared.

use super::saga::Saga;
use crate::error::{CandidateProblem, RegisterError, RegisterResult};
use crate::model::member::{Member, MemberId};
use crate::repo::family_repo::FamilyRepository;
use crate::repo::member_repo::MemberRepository;
use log::{info, warn};
use serde::Serialize;

/// Strategy choosing a successor among eligible living members.
pub trait SuccessionPolicy {
    /// Stable policy name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Picks a successor from `candidates`, given in registration order
    /// within equal birth dates.
    fn select<'m>(&self, candidates: &'m [Member]) -> Option<&'m Member>;
}

/// Elects the oldest living member.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirst;

impl SuccessionPolicy for OldestFirst {
    fn name(&self) -> &'static str {
        "oldest_first"
    }

    fn select<'m>(&self, candidates: &'m [Member]) -> Option<&'m Member> {
        // `min_by_key` keeps the first of equal keys.
        candidates.iter().min_by_key(|member| member.date_of_birth)
    }
}

/// How an elected head was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Appointment {
    Explicit,
    Policy(&'static str),
}

/// Result of a succession attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SuccessionOutcome {
    /// The departing member was not head of family.
    NotRequired,
    Elected {
        member_id: MemberId,
        name: String,
        appointment: Appointment,
    },
    /// No living member remains to take the role.
    Headless,
}

impl SuccessionOutcome {
    pub fn successor(&self) -> Option<MemberId> {
        match self {
            Self::Elected { member_id, .. } => Some(*member_id),
            _ => None,
        }
    }
}

/// Appoints a new head after the previous one vacated the role.
pub struct SuccessionResolver<'a, M: MemberRepository, F: FamilyRepository> {
    members: &'a M,
    families: &'a F,
    policy: &'a dyn SuccessionPolicy,
}

impl<'a, M: MemberRepository, F: FamilyRepository> SuccessionResolver<'a, M, F> {
    pub fn new(members: &'a M, families: &'a F, policy: &'a dyn SuccessionPolicy) -> Self {
        Self {
            members,
            families,
            policy,
        }
    }

    /// Elects a successor for `vacating` in `family_number`.
    ///
    /// The vacating member must already be stored without headship.
    ///
    /// # Errors
    /// - `CandidateInvalid` when `explicit` is missing, deceased, the vacating
    ///   member, or outside the family.
    /// - `NotFound` when the family does not exist.
    pub fn resolve(
        &self,
        vacating: &Member,
        family_number: &str,
        explicit: Option<MemberId>,
    ) -> RegisterResult<SuccessionOutcome> {
        if self.families.get_family(family_number)?.is_none() {
            return Err(RegisterError::not_found("family", family_number));
        }

        let (successor, appointment) = match explicit {
            Some(candidate_id) => (
                self.validate_candidate(vacating, family_number, candidate_id)?,
                Appointment::Explicit,
            ),
            None => {
                let living: Vec<Member> = self
                    .members
                    .list_living_family_members(family_number)?
                    .into_iter()
                    .filter(|member| member.uuid != vacating.uuid)
                    .collect();
                match self.policy.select(&living) {
                    Some(member) => (member.clone(), Appointment::Policy(self.policy.name())),
                    None => {
                        self.families.set_head_name(family_number, None)?;
                        info!(
                            "event=succession module=service status=headless family={} vacated_by={}",
                            family_number, vacating.uuid
                        );
                        return Ok(SuccessionOutcome::Headless);
                    }
                }
            }
        };

        let successor_id = successor.uuid;
        let mut saga = Saga::new("succession");
        self.members.set_head_of_family(successor_id, true)?;
        saga.record("appoint_head", move || {
            self.members.set_head_of_family(successor_id, false)
        });

        if let Err(err) = self
            .families
            .set_head_name(family_number, Some(successor.name.as_str()))
        {
            return Err(saga.abort(err.into()));
        }
        saga.complete();

        info!(
            "event=succession module=service status=elected family={} vacated_by={} successor={} appointment={:?}",
            family_number, vacating.uuid, successor.uuid, appointment
        );
        Ok(SuccessionOutcome::Elected {
            member_id: successor.uuid,
            name: successor.name,
            appointment,
        })
    }

    fn validate_candidate(
        &self,
        vacating: &Member,
        family_number: &str,
        candidate_id: MemberId,
    ) -> RegisterResult<Member> {
        let reject = |problem: CandidateProblem| {
            warn!(
                "event=succession module=service status=rejected family={} candidate={} problem={:?}",
                family_number, candidate_id, problem
            );
            RegisterError::candidate_invalid(candidate_id, problem)
        };

        if candidate_id == vacating.uuid {
            return Err(reject(CandidateProblem::SameAsVacating));
        }
        let Some(candidate) = self.members.get_member(candidate_id)? else {
            return Err(reject(CandidateProblem::Missing));
        };
        if candidate.is_deceased {
            return Err(reject(CandidateProblem::Deceased));
        }
        if !candidate.belongs_to(family_number) {
            return Err(reject(CandidateProblem::WrongFamily));
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::{OldestFirst, SuccessionPolicy};
    use crate::model::member::{Gender, Member};
    use chrono::NaiveDate;

    fn member(name: &str, year: i32) -> Member {
        Member::new(
            name,
            Gender::Female,
            NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
        )
    }

    #[test]
    fn oldest_first_picks_earliest_birth_date() {
        let candidates = vec![member("C", 1970), member("B", 1960), member("D", 1980)];
        let chosen = OldestFirst.select(&candidates).unwrap();
        assert_eq!(chosen.name, "B");
    }

    #[test]
    fn oldest_first_breaks_ties_by_given_order() {
        let candidates = vec![member("first", 1960), member("second", 1960)];
        let chosen = OldestFirst.select(&candidates).unwrap();
        assert_eq!(chosen.name, "first");
    }

    #[test]
    fn oldest_first_returns_none_for_empty_family() {
        assert!(OldestFirst.select(&[]).is_none());
    }
}
