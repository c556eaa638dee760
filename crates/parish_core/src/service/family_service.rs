//! Family registry use-cases.
//!
//! # Responsibility
//! - Create, edit, list and remove households.
//! - Report headship state for one household.
//!
//! # Invariants
//! - A new family starts headless. The head name is only ever written by
//!   headship changes in the member directory and the death register.
//! - A family with affiliated members cannot be removed.

use crate::error::{RegisterError, RegisterResult};
use crate::model::family::Family;
use crate::model::member::Member;
use crate::repo::family_repo::{FamilyRepository, HouseholdGrouping};
use crate::repo::member_repo::MemberRepository;
use log::info;
use serde::{Deserialize, Serialize};

/// Household metadata open to edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseholdDetails {
    pub name: String,
    pub location: Option<String>,
    pub village: Option<String>,
    pub contact_number: Option<String>,
    pub family_unit: String,
    pub ward_number: String,
    pub subscription: bool,
}

/// One family with its current headship state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyOverview {
    pub family: Family,
    pub head: Option<Member>,
    pub living_members: usize,
}

impl FamilyOverview {
    /// No living head is recorded for the family.
    pub fn is_headless(&self) -> bool {
        self.head.is_none()
    }
}

/// Family registry service over repository implementations.
pub struct FamilyRegistry<F: FamilyRepository, M: MemberRepository> {
    families: F,
    members: M,
}

impl<F: FamilyRepository, M: MemberRepository> FamilyRegistry<F, M> {
    pub fn new(families: F, members: M) -> Self {
        Self { families, members }
    }

    /// Registers a household without a head.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank family number or name.
    /// - `DuplicateFamilyNumber` when the number is taken.
    pub fn create_family(&self, mut family: Family) -> RegisterResult<Family> {
        family.family_number = family.family_number.trim().to_string();
        family.head_of_family_name = None;
        family.validate()?;

        self.families.create_family(&family).map_err(|err| {
            RegisterError::on_duplicate(err, || {
                RegisterError::DuplicateFamilyNumber(family.family_number.clone())
            })
        })?;

        info!(
            "event=family_create module=service status=ok family={}",
            family.family_number
        );
        Ok(family)
    }

    pub fn get_family(&self, family_number: &str) -> RegisterResult<Option<Family>> {
        Ok(self.families.get_family(family_number)?)
    }

    /// Lists families by family number.
    pub fn list_families(&self) -> RegisterResult<Vec<Family>> {
        Ok(self.families.list_families()?)
    }

    /// Distinct family units in use.
    pub fn list_units(&self) -> RegisterResult<Vec<String>> {
        Ok(self.families.list_groupings(HouseholdGrouping::Unit)?)
    }

    /// Distinct ward/block numbers in use.
    pub fn list_blocks(&self) -> RegisterResult<Vec<String>> {
        Ok(self.families.list_groupings(HouseholdGrouping::Block)?)
    }

    /// Rewrites household metadata. The head name is kept.
    pub fn update_family(
        &self,
        family_number: &str,
        details: HouseholdDetails,
    ) -> RegisterResult<Family> {
        let mut family = self
            .families
            .get_family(family_number)?
            .ok_or_else(|| RegisterError::not_found("family", family_number))?;
        family.name = details.name;
        family.location = details.location;
        family.village = details.village;
        family.contact_number = details.contact_number;
        family.family_unit = details.family_unit;
        family.ward_number = details.ward_number;
        family.subscription = details.subscription;
        family.validate()?;

        self.families.update_family_metadata(&family)?;
        Ok(family)
    }

    /// Removes an empty household.
    ///
    /// # Errors
    /// - `NotFound` when the family does not exist.
    /// - `FamilyInUse` while any member, living or deceased, is affiliated.
    pub fn delete_family(&self, family_number: &str) -> RegisterResult<()> {
        if self.families.get_family(family_number)?.is_none() {
            return Err(RegisterError::not_found("family", family_number));
        }
        let members = self.families.count_members(family_number)?;
        if members > 0 {
            return Err(RegisterError::FamilyInUse {
                family_number: family_number.to_string(),
                members,
            });
        }
        self.families.delete_family(family_number)?;

        info!(
            "event=family_delete module=service status=ok family={}",
            family_number
        );
        Ok(())
    }

    /// Returns the family with its living head and living member count.
    pub fn overview(&self, family_number: &str) -> RegisterResult<FamilyOverview> {
        let family = self
            .families
            .get_family(family_number)?
            .ok_or_else(|| RegisterError::not_found("family", family_number))?;
        let living_members = self.members.list_living_family_members(family_number)?.len();
        let head = self.members.find_living_head(family_number)?;
        Ok(FamilyOverview {
            family,
            head,
            living_members,
        })
    }
}
