//! Member domain model.
//!
//! # Responsibility
//! - Define the directory record for one individual.
//! - Describe the marital link as one typed value (`MaritalLink`).
//!
//! # Invariants
//! - `uuid` is stable and never reused for another member.
//! - A deceased member never holds headship.
//! - `Married` implies a spouse reference or, for external partners, a name.
//! - `Single` implies no spouse fields.

use super::family::FamilyNumber;
use super::{require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable member identifier.
pub type MemberId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaritalStatus {
    Single,
    Married,
}

/// Typed view of the `marital_status`/`spouse_id`/`spouse_name` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaritalLink {
    Single,
    /// Bound to another directory member.
    Member { member_id: MemberId, name: String },
    /// Bound to a non-parishioner known only by name.
    External { name: String },
}

impl MaritalLink {
    pub fn status(&self) -> MaritalStatus {
        match self {
            Self::Single => MaritalStatus::Single,
            Self::Member { .. } | Self::External { .. } => MaritalStatus::Married,
        }
    }

    pub fn spouse_id(&self) -> Option<MemberId> {
        match self {
            Self::Member { member_id, .. } => Some(*member_id),
            Self::Single | Self::External { .. } => None,
        }
    }

    pub fn spouse_name(&self) -> Option<&str> {
        match self {
            Self::Single => None,
            Self::Member { name, .. } | Self::External { name } => Some(name.as_str()),
        }
    }
}

/// Directory record for one individual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub uuid: MemberId,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    /// `None` for people registered without a household.
    pub family_number: Option<FamilyNumber>,
    /// Relation to the head of family, free text ("Son", "Wife", ...).
    pub relation: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub occupation: Option<String>,
    pub is_hof: bool,
    pub is_deceased: bool,
    pub is_baptised: bool,
    pub marital_status: MaritalStatus,
    /// Set only when the partner is a directory member.
    pub spouse_id: Option<MemberId>,
    /// Partner name, kept for both member and external partners.
    pub spouse_name: Option<String>,
}

impl Member {
    /// Creates a living, single, unaffiliated member with a generated ID.
    pub fn new(name: impl Into<String>, gender: Gender, date_of_birth: NaiveDate) -> Self {
        Self::with_id(Uuid::new_v4(), name, gender, date_of_birth)
    }

    /// Creates a member with a caller-provided stable ID.
    pub fn with_id(
        uuid: MemberId,
        name: impl Into<String>,
        gender: Gender,
        date_of_birth: NaiveDate,
    ) -> Self {
        Self {
            uuid,
            name: name.into(),
            gender,
            date_of_birth,
            family_number: None,
            relation: None,
            phone: None,
            email: None,
            occupation: None,
            is_hof: false,
            is_deceased: false,
            is_baptised: false,
            marital_status: MaritalStatus::Single,
            spouse_id: None,
            spouse_name: None,
        }
    }

    /// Builder-style family affiliation.
    pub fn in_family(mut self, family_number: impl Into<FamilyNumber>) -> Self {
        self.family_number = Some(family_number.into());
        self
    }

    pub fn is_living(&self) -> bool {
        !self.is_deceased
    }

    /// Whether this member belongs to `family_number`.
    pub fn belongs_to(&self, family_number: &str) -> bool {
        self.family_number.as_deref() == Some(family_number)
    }

    /// Returns the typed marital link. Call on validated members only.
    pub fn marital_link(&self) -> MaritalLink {
        match (self.marital_status, self.spouse_id, self.spouse_name.as_ref()) {
            (MaritalStatus::Single, _, _) => MaritalLink::Single,
            (MaritalStatus::Married, Some(member_id), name) => MaritalLink::Member {
                member_id,
                name: name.cloned().unwrap_or_default(),
            },
            (MaritalStatus::Married, None, name) => MaritalLink::External {
                name: name.cloned().unwrap_or_default(),
            },
        }
    }

    /// Replaces the marital fields from a typed link.
    pub fn apply_marital_link(&mut self, link: &MaritalLink) {
        self.marital_status = link.status();
        self.spouse_id = link.spouse_id();
        self.spouse_name = link.spouse_name().map(str::to_string);
    }

    /// Checks member invariants.
    ///
    /// # Errors
    /// - `BlankField("name")` when the name is blank.
    /// - Headship, spouse-link and self-reference violations.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")?;

        if self.is_hof && self.is_deceased {
            return Err(ValidationError::DeceasedHeadOfFamily(self.uuid));
        }
        if self.is_hof && self.family_number.is_none() {
            return Err(ValidationError::HeadWithoutFamily(self.uuid));
        }
        if self.spouse_id == Some(self.uuid) {
            return Err(ValidationError::SelfSpouse(self.uuid));
        }

        let has_spouse_name = self
            .spouse_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        match self.marital_status {
            MaritalStatus::Married if self.spouse_id.is_none() && !has_spouse_name => {
                Err(ValidationError::MarriedWithoutSpouse(self.uuid))
            }
            MaritalStatus::Single if self.spouse_id.is_some() || self.spouse_name.is_some() => {
                Err(ValidationError::SingleWithSpouse(self.uuid))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Gender, MaritalLink, MaritalStatus, Member};
    use crate::model::ValidationError;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn born(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 1, 1).unwrap()
    }

    #[test]
    fn new_member_is_living_single_and_unaffiliated() {
        let member = Member::new("Thomas", Gender::Male, born(1950));
        assert!(member.is_living());
        assert_eq!(member.marital_status, MaritalStatus::Single);
        assert!(member.family_number.is_none());
        assert!(member.validate().is_ok());
    }

    #[test]
    fn deceased_head_is_rejected() {
        let mut member = Member::new("Thomas", Gender::Male, born(1950)).in_family("F-1");
        member.is_hof = true;
        member.is_deceased = true;
        assert_eq!(
            member.validate(),
            Err(ValidationError::DeceasedHeadOfFamily(member.uuid))
        );
    }

    #[test]
    fn marital_link_round_trips_through_flat_fields() {
        let mut member = Member::new("Anna", Gender::Female, born(1960));
        let partner = Uuid::new_v4();
        member.apply_marital_link(&MaritalLink::Member {
            member_id: partner,
            name: "Joseph".to_string(),
        });
        assert_eq!(member.marital_status, MaritalStatus::Married);
        assert_eq!(member.spouse_id, Some(partner));
        assert!(member.validate().is_ok());

        member.apply_marital_link(&MaritalLink::Single);
        assert_eq!(member.marital_link(), MaritalLink::Single);
        assert!(member.spouse_name.is_none());
    }

    #[test]
    fn married_without_partner_fails_validation() {
        let mut member = Member::new("Anna", Gender::Female, born(1960));
        member.marital_status = MaritalStatus::Married;
        assert_eq!(
            member.validate(),
            Err(ValidationError::MarriedWithoutSpouse(member.uuid))
        );
    }
}
