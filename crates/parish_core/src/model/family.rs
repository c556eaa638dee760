//! Family domain model.
//!
//! # Invariants
//! - `family_number` is the unique household key.
//! - `head_of_family_name` mirrors the current head member's name and is
//!   `None` while the family is headless. Only the register services write it.

use super::{require_text, ValidationError};
use serde::{Deserialize, Serialize};

/// Unique household key, e.g. `"F-102"`.
pub type FamilyNumber = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub family_number: FamilyNumber,
    /// Household (house) name.
    pub name: String,
    pub head_of_family_name: Option<String>,
    pub location: Option<String>,
    pub village: Option<String>,
    pub contact_number: Option<String>,
    /// Prayer unit the household belongs to. Empty when unassigned.
    pub family_unit: String,
    /// Ward/block number. Empty when unassigned.
    pub ward_number: String,
    pub subscription: bool,
}

impl Family {
    /// Creates a headless family with empty household metadata.
    pub fn new(family_number: impl Into<FamilyNumber>, name: impl Into<String>) -> Self {
        Self {
            family_number: family_number.into(),
            name: name.into(),
            head_of_family_name: None,
            location: None,
            village: None,
            contact_number: None,
            family_unit: String::new(),
            ward_number: String::new(),
            subscription: false,
        }
    }

    pub fn is_headless(&self) -> bool {
        self.head_of_family_name.is_none()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text(&self.family_number, "family_number")?;
        require_text(&self.name, "name")
    }
}
