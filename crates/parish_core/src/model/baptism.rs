//! Baptism record domain model.

use super::family::FamilyNumber;
use super::member::{Gender, MemberId};
use super::{require_sequence, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BaptismRecordId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaptismSubject {
    Parishioner {
        member_id: MemberId,
        family_number: FamilyNumber,
    },
    External { home_parish: Option<String> },
}

impl BaptismSubject {
    pub fn member_id(&self) -> Option<MemberId> {
        match self {
            Self::Parishioner { member_id, .. } => Some(*member_id),
            Self::External { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaptismDetails {
    pub person_name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Gender,
    pub date_of_baptism: NaiveDate,
    pub place_of_baptism: Option<String>,
    pub church_where_baptised: Option<String>,
    /// Christian name given at baptism.
    pub baptismal_name: String,
    pub godparent_name: Option<String>,
    pub godparent_house_name: Option<String>,
    pub certificate_number: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaptismRecord {
    pub uuid: BaptismRecordId,
    pub sl_no: i64,
    pub subject: BaptismSubject,
    pub details: BaptismDetails,
}

impl BaptismRecord {
    pub fn new(sl_no: i64, subject: BaptismSubject, details: BaptismDetails) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            sl_no,
            subject,
            details,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_sequence(self.sl_no)?;
        require_text(&self.details.person_name, "person_name")?;
        require_text(&self.details.baptismal_name, "baptismal_name")?;
        if let BaptismSubject::Parishioner { family_number, .. } = &self.subject {
            require_text(family_number, "family_number")?;
        }
        if self.details.date_of_baptism < self.details.date_of_birth {
            return Err(ValidationError::BaptismBeforeBirth {
                date_of_birth: self.details.date_of_birth,
                date_of_baptism: self.details.date_of_baptism,
            });
        }
        Ok(())
    }
}
