//! Marriage bond maintenance.
//!
//! # Responsibility
//! - Persist a marriage record and link both parishioner sides to each other.
//! - Reverse those links when a marriage record is removed.
//!
//! # Invariants
//! - Links are symmetric for member-to-member marriages.
//! - A member-to-external marriage sets only the member side, with the
//!   partner's name as text.
//! - Unbinding never clears a link that points at someone other than the
//!   record's partner.

use super::saga::Saga;
use crate::error::{MemberProblem, RegisterError, RegisterResult};
use crate::model::marriage::{MarriageDetails, MarriageParty, MarriageRecord};
use crate::model::member::{MaritalLink, Member, MemberId};
use crate::repo::marriage_repo::MarriageRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::RepoResult;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// One side of a marriage as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarriageSide {
    Member {
        member_id: MemberId,
    },
    External {
        name: String,
        home_parish: Option<String>,
    },
}

impl MarriageSide {
    pub fn member(member_id: MemberId) -> Self {
        Self::Member { member_id }
    }

    pub fn external(name: impl Into<String>) -> Self {
        Self::External {
            name: name.into(),
            home_parish: None,
        }
    }

    fn member_id(&self) -> Option<MemberId> {
        match self {
            Self::Member { member_id } => Some(*member_id),
            Self::External { .. } => None,
        }
    }
}

/// Previous marital links replaced by an unbind, for restoring on failure.
#[derive(Debug, Default)]
pub struct Unbinding {
    previous_links: Vec<(MemberId, MaritalLink)>,
}

impl Unbinding {
    /// Members whose link was cleared.
    pub fn released(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.previous_links.iter().map(|(member_id, _)| *member_id)
    }
}

/// Keeps marriage records and member spouse links consistent.
pub struct BondManager<'a, M: MemberRepository, R: MarriageRepository> {
    members: &'a M,
    marriages: &'a R,
}

impl<'a, M: MemberRepository, R: MarriageRepository> BondManager<'a, M, R> {
    pub fn new(members: &'a M, marriages: &'a R) -> Self {
        Self { members, marriages }
    }

    /// Stores a marriage and links its parishioner sides.
    ///
    /// # Errors
    /// - `SameIdentity` when both sides name one member.
    /// - `MemberInvalid` when a member is missing, deceased, or still bound
    ///   to another living partner.
    /// - `DuplicateMarriageId` when `marriage_id` is taken.
    pub fn bind(
        &self,
        marriage_id: &str,
        first: &MarriageSide,
        second: &MarriageSide,
        details: MarriageDetails,
    ) -> RegisterResult<MarriageRecord> {
        if let (Some(a), Some(b)) = (first.member_id(), second.member_id()) {
            if a == b {
                return Err(RegisterError::SameIdentity(a));
            }
        }

        let first_party = self.resolve_side(first)?;
        let second_party = self.resolve_side(second)?;
        let record = MarriageRecord::new(marriage_id, first_party, second_party, details);
        record.validate()?;

        let mut saga = Saga::new("bind_marriage");
        self.marriages
            .create_marriage(&record)
            .map_err(|err| {
                RegisterError::on_duplicate(err, || {
                    RegisterError::DuplicateMarriageId(record.marriage_id.clone())
                })
            })?;
        let record_id = record.uuid;
        saga.record("persist_record", move || {
            self.marriages.delete_marriage(record_id)
        });

        for (own, partner) in [
            (&record.first, &record.second),
            (&record.second, &record.first),
        ] {
            let MarriageParty::Parishioner { member_id, .. } = own else {
                continue;
            };
            let member_id = *member_id;
            let previous = match self.members.get_member(member_id) {
                Ok(Some(member)) => member.marital_link(),
                Ok(None) => {
                    return Err(saga.abort(RegisterError::member_invalid(
                        member_id,
                        MemberProblem::Missing,
                    )))
                }
                Err(err) => return Err(saga.abort(err.into())),
            };
            if let Err(err) = self.members.set_marital_link(member_id, &link_to(partner)) {
                return Err(saga.abort(err.into()));
            }
            saga.record("link_spouse", move || {
                self.members.set_marital_link(member_id, &previous)
            });
        }
        saga.complete();

        info!(
            "event=marriage_bind module=service status=ok marriage_id={} record={}",
            record.marriage_id, record.uuid
        );
        Ok(record)
    }

    /// Clears the spouse links a marriage record established.
    ///
    /// Sides whose member was deleted, or whose link no longer points at the
    /// record's partner, are left untouched.
    pub fn unbind(&self, record: &MarriageRecord) -> RegisterResult<Unbinding> {
        let mut saga = Saga::new("unbind_marriage");
        let mut unbinding = Unbinding::default();

        for (own, partner) in [
            (&record.first, &record.second),
            (&record.second, &record.first),
        ] {
            let MarriageParty::Parishioner { member_id, .. } = own else {
                continue;
            };
            let member_id = *member_id;
            let member = match self.members.get_member(member_id) {
                Ok(Some(member)) => member,
                Ok(None) => {
                    debug!(
                        "event=marriage_unbind module=service status=skip reason=member_missing marriage_id={} member={}",
                        record.marriage_id, member_id
                    );
                    continue;
                }
                Err(err) => return Err(saga.abort(err.into())),
            };
            if !is_bound_to(&member, partner) {
                warn!(
                    "event=marriage_unbind module=service status=skip reason=link_mismatch marriage_id={} member={}",
                    record.marriage_id, member_id
                );
                continue;
            }

            let previous = member.marital_link();
            if let Err(err) = self.members.set_marital_link(member_id, &MaritalLink::Single) {
                return Err(saga.abort(err.into()));
            }
            let restore = previous.clone();
            saga.record("release_spouse", move || {
                self.members.set_marital_link(member_id, &restore)
            });
            unbinding.previous_links.push((member_id, previous));
        }
        saga.complete();

        info!(
            "event=marriage_unbind module=service status=ok marriage_id={} released={}",
            record.marriage_id,
            unbinding.previous_links.len()
        );
        Ok(unbinding)
    }

    /// Reapplies the links an unbind cleared.
    pub fn restore(&self, unbinding: &Unbinding) -> RepoResult<()> {
        for (member_id, link) in &unbinding.previous_links {
            self.members.set_marital_link(*member_id, link)?;
        }
        Ok(())
    }

    fn resolve_side(&self, side: &MarriageSide) -> RegisterResult<MarriageParty> {
        match side {
            MarriageSide::External { name, home_parish } => Ok(MarriageParty::External {
                name: name.trim().to_string(),
                home_parish: home_parish.clone(),
            }),
            MarriageSide::Member { member_id } => {
                let member = self.members.get_member(*member_id)?.ok_or_else(|| {
                    RegisterError::member_invalid(*member_id, MemberProblem::Missing)
                })?;
                if member.is_deceased {
                    return Err(RegisterError::member_invalid(
                        *member_id,
                        MemberProblem::Deceased,
                    ));
                }
                self.ensure_unbound(&member)?;
                Ok(MarriageParty::Parishioner {
                    member_id: member.uuid,
                    name: member.name,
                })
            }
        }
    }

    /// A member may remarry only once the previous member spouse has died.
    /// A link to an external partner, including a spouse detached when it was
    /// removed from the directory, holds until its marriage record is deleted.
    fn ensure_unbound(&self, member: &Member) -> RegisterResult<()> {
        match member.marital_link() {
            MaritalLink::Single => Ok(()),
            MaritalLink::Member { member_id, .. } => match self.members.get_member(member_id)? {
                Some(spouse) if spouse.is_living() => Err(RegisterError::member_invalid(
                    member.uuid,
                    MemberProblem::AlreadyMarried,
                )),
                Some(_) | None => Ok(()),
            },
            MaritalLink::External { .. } => Err(RegisterError::member_invalid(
                member.uuid,
                MemberProblem::AlreadyMarried,
            )),
        }
    }
}

fn link_to(partner: &MarriageParty) -> MaritalLink {
    match partner {
        MarriageParty::Parishioner { member_id, name } => MaritalLink::Member {
            member_id: *member_id,
            name: name.clone(),
        },
        MarriageParty::External { name, .. } => MaritalLink::External { name: name.clone() },
    }
}

/// Whether `member` still carries the link to `partner` that a bind created.
/// A partner removed from the directory leaves only its name behind.
fn is_bound_to(member: &Member, partner: &MarriageParty) -> bool {
    match member.marital_link() {
        MaritalLink::Single => false,
        MaritalLink::Member { member_id, .. } => partner.member_id() == Some(member_id),
        MaritalLink::External { name } => name == partner.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::{is_bound_to, link_to};
    use crate::model::marriage::MarriageParty;
    use crate::model::member::{Gender, MaritalLink, Member};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn member() -> Member {
        Member::new(
            "Anna",
            Gender::Female,
            NaiveDate::from_ymd_opt(1990, 5, 1).unwrap(),
        )
    }

    #[test]
    fn bound_to_member_partner_by_id() {
        let partner_id = Uuid::new_v4();
        let partner = MarriageParty::Parishioner {
            member_id: partner_id,
            name: "Jacob".to_string(),
        };
        let mut anna = member();
        anna.apply_marital_link(&link_to(&partner));
        assert!(is_bound_to(&anna, &partner));

        let other = MarriageParty::Parishioner {
            member_id: Uuid::new_v4(),
            name: "Jacob".to_string(),
        };
        assert!(!is_bound_to(&anna, &other));
    }

    #[test]
    fn detached_member_partner_still_matches_by_name() {
        let partner = MarriageParty::Parishioner {
            member_id: Uuid::new_v4(),
            name: "Jacob".to_string(),
        };
        let mut anna = member();
        anna.apply_marital_link(&MaritalLink::External {
            name: "Jacob".to_string(),
        });
        assert!(is_bound_to(&anna, &partner));
    }

    #[test]
    fn single_member_is_never_bound() {
        let partner = MarriageParty::External {
            name: "Jacob".to_string(),
            home_parish: None,
        };
        assert!(!is_bound_to(&member(), &partner));
    }
}
