//! Death record domain model.
//!
//! # Responsibility
//! - Capture the append-only historical fact of a death.
//! - Keep the caller's next-head hint alongside the record.
//!
//! # Invariants
//! - `sl_no` is unique across the death register (storage constraint).
//! - Parishioner records always name both member and family.
//! - Burial never precedes death.

use super::family::FamilyNumber;
use super::member::MemberId;
use super::{require_sequence, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DeathRecordId = Uuid;

/// Who the record is about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeathSubject {
    Parishioner {
        member_id: MemberId,
        family_number: FamilyNumber,
    },
    /// Non-parishioner, identified by the free-text details only.
    External,
}

impl DeathSubject {
    pub fn member_id(&self) -> Option<MemberId> {
        match self {
            Self::Parishioner { member_id, .. } => Some(*member_id),
            Self::External => None,
        }
    }
}

/// Descriptive fields that corrective edits may replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathDetails {
    pub name: String,
    pub house_name: Option<String>,
    pub address_place: Option<String>,
    pub father_husband_name: Option<String>,
    pub mother_wife_name: Option<String>,
    pub death_date: NaiveDate,
    pub burial_date: Option<NaiveDate>,
    pub age: Option<u32>,
    pub conducted_by: Option<String>,
    pub cause_of_death: Option<String>,
    pub cell_no: Option<String>,
    pub remarks: Option<String>,
}

impl DeathDetails {
    pub fn new(name: impl Into<String>, death_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            house_name: None,
            address_place: None,
            father_husband_name: None,
            mother_wife_name: None,
            death_date,
            burial_date: None,
            age: None,
            conducted_by: None,
            cause_of_death: None,
            cell_no: None,
            remarks: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.name, "name")?;
        if let Some(burial_date) = self.burial_date {
            if burial_date < self.death_date {
                return Err(ValidationError::BurialBeforeDeath {
                    death_date: self.death_date,
                    burial_date,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub uuid: DeathRecordId,
    /// Register sequence number supplied by the parish office.
    pub sl_no: i64,
    pub subject: DeathSubject,
    /// Successor requested by the caller when the deceased was head.
    pub next_hof_candidate: Option<MemberId>,
    pub details: DeathDetails,
}

impl DeathRecord {
    pub fn new(sl_no: i64, subject: DeathSubject, details: DeathDetails) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            sl_no,
            subject,
            next_hof_candidate: None,
            details,
        }
    }

    pub fn is_parishioner(&self) -> bool {
        matches!(self.subject, DeathSubject::Parishioner { .. })
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_sequence(self.sl_no)?;
        if let DeathSubject::Parishioner { family_number, .. } = &self.subject {
            require_text(family_number, "family_number")?;
        }
        self.details.validate()
    }
}
