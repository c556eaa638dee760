//! Marriage record domain model.
//!
//! # Invariants
//! - `marriage_id` is unique across the register (storage constraint).
//! - The two parties never resolve to the same member.
//! - Every party carries a non-blank display name.

use super::member::MemberId;
use super::{require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MarriageRecordId = Uuid;

/// One side of a marriage as stored on the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarriageParty {
    /// Directory member. `name` is copied from the member at bind time.
    Parishioner { member_id: MemberId, name: String },
    /// Person from another parish, known by name only.
    External {
        name: String,
        home_parish: Option<String>,
    },
}

impl MarriageParty {
    pub fn member_id(&self) -> Option<MemberId> {
        match self {
            Self::Parishioner { member_id, .. } => Some(*member_id),
            Self::External { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Parishioner { name, .. } | Self::External { name, .. } => name.as_str(),
        }
    }
}

/// Fields open to corrective edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarriageDetails {
    pub date: NaiveDate,
    pub place: Option<String>,
    pub officiant_number: Option<String>,
}

impl MarriageDetails {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            date,
            place: None,
            officiant_number: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarriageRecord {
    pub uuid: MarriageRecordId,
    /// Register key supplied by the parish office.
    pub marriage_id: String,
    pub first: MarriageParty,
    pub second: MarriageParty,
    pub details: MarriageDetails,
}

impl MarriageRecord {
    pub fn new(
        marriage_id: impl Into<String>,
        first: MarriageParty,
        second: MarriageParty,
        details: MarriageDetails,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            marriage_id: marriage_id.into(),
            first,
            second,
            details,
        }
    }

    /// Returns the party opposite to `member_id`, if it is one of the sides.
    pub fn partner_of(&self, member_id: MemberId) -> Option<&MarriageParty> {
        if self.first.member_id() == Some(member_id) {
            Some(&self.second)
        } else if self.second.member_id() == Some(member_id) {
            Some(&self.first)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.marriage_id, "marriage_id")?;
        require_text(self.first.name(), "first.name")?;
        require_text(self.second.name(), "second.name")?;
        if let (Some(first), Some(second)) = (self.first.member_id(), self.second.member_id()) {
            if first == second {
                return Err(ValidationError::SameSpouseIdentity(first));
            }
        }
        Ok(())
    }
}
