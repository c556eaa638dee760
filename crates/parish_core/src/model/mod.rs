//! Domain model for the parish register.
//!
//! # Responsibility
//! - Define the records the integrity engine keeps consistent.
//! - Provide `validate()` checks that every repository write runs first.
//!
//! # Invariants
//! - Members, death, marriage and baptism records are identified by stable
//!   UUIDs. Families are identified by their family number.
//! - Calendar dates are `NaiveDate` and persist as ISO `YYYY-MM-DD` text.

use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod baptism;
pub mod death;
pub mod family;
pub mod marriage;
pub mod member;

use member::MemberId;

/// Model-level invariant violations detected before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is blank after trim.
    BlankField(&'static str),
    /// Sequence numbers start at 1.
    NonPositiveSequence(i64),
    /// Member links to itself as spouse.
    SelfSpouse(MemberId),
    /// `Married` without a member reference or partner name.
    MarriedWithoutSpouse(MemberId),
    /// `Single` while still carrying spouse fields.
    SingleWithSpouse(MemberId),
    /// Deceased members cannot hold headship.
    DeceasedHeadOfFamily(MemberId),
    /// Headship requires a family affiliation.
    HeadWithoutFamily(MemberId),
    /// Both marriage sides name the same member.
    SameSpouseIdentity(MemberId),
    BurialBeforeDeath {
        death_date: NaiveDate,
        burial_date: NaiveDate,
    },
    BaptismBeforeBirth {
        date_of_birth: NaiveDate,
        date_of_baptism: NaiveDate,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "`{field}` must not be blank"),
            Self::NonPositiveSequence(value) => {
                write!(f, "sequence number must be positive, got {value}")
            }
            Self::SelfSpouse(id) => write!(f, "member {id} cannot be its own spouse"),
            Self::MarriedWithoutSpouse(id) => {
                write!(f, "married member {id} has no spouse reference or name")
            }
            Self::SingleWithSpouse(id) => {
                write!(f, "single member {id} still carries spouse fields")
            }
            Self::DeceasedHeadOfFamily(id) => {
                write!(f, "deceased member {id} cannot be head of family")
            }
            Self::HeadWithoutFamily(id) => {
                write!(f, "member {id} is head of family without a family")
            }
            Self::SameSpouseIdentity(id) => {
                write!(f, "both marriage sides reference member {id}")
            }
            Self::BurialBeforeDeath {
                death_date,
                burial_date,
            } => write!(f, "burial date {burial_date} precedes death date {death_date}"),
            Self::BaptismBeforeBirth {
                date_of_birth,
                date_of_baptism,
            } => write!(
                f,
                "baptism date {date_of_baptism} precedes birth date {date_of_birth}"
            ),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}

pub(crate) fn require_sequence(value: i64) -> Result<(), ValidationError> {
    if value <= 0 {
        return Err(ValidationError::NonPositiveSequence(value));
    }
    Ok(())
}
