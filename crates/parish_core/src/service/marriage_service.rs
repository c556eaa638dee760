//! Marriage register use-cases.
//!
//! # Responsibility
//! - Validate marriage submissions and delegate linking to `BondManager`.
//! - Release spouse links before a record is discarded.
//!
//! # Invariants
//! - A stored marriage always has both parishioner sides linked, unless a
//!   side was later removed from the directory.
//! - Corrective edits never change the parties.

use super::bond::{BondManager, MarriageSide};
use crate::error::{RegisterError, RegisterResult};
use crate::model::marriage::{MarriageDetails, MarriageRecord, MarriageRecordId};
use crate::model::require_text;
use crate::repo::marriage_repo::{MarriageListQuery, MarriageRepository};
use crate::repo::member_repo::MemberRepository;
use log::{error, info};
use serde::{Deserialize, Serialize};

/// Input for a new marriage record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarriageSubmission {
    pub marriage_id: String,
    pub first: MarriageSide,
    pub second: MarriageSide,
    pub details: MarriageDetails,
}

/// Marriage register service over repository implementations.
pub struct MarriageRecorder<M: MemberRepository, R: MarriageRepository> {
    members: M,
    marriages: R,
}

impl<M: MemberRepository, R: MarriageRepository> MarriageRecorder<M, R> {
    pub fn new(members: M, marriages: R) -> Self {
        Self { members, marriages }
    }

    fn bonds(&self) -> BondManager<'_, M, R> {
        BondManager::new(&self.members, &self.marriages)
    }

    /// Records a marriage and links both parishioner sides.
    ///
    /// # Errors
    /// - `InvalidInput` for a blank marriage id or external partner name.
    /// - `SameIdentity`, `MemberInvalid`, `DuplicateMarriageId` from binding.
    pub fn record(&self, submission: MarriageSubmission) -> RegisterResult<MarriageRecord> {
        let marriage_id = submission.marriage_id.trim();
        require_text(marriage_id, "marriage_id")?;
        for (side, field) in [
            (&submission.first, "first.name"),
            (&submission.second, "second.name"),
        ] {
            if let MarriageSide::External { name, .. } = side {
                require_text(name, field)?;
            }
        }

        self.bonds().bind(
            marriage_id,
            &submission.first,
            &submission.second,
            submission.details,
        )
    }

    /// Replaces date, place and officiant of a record.
    pub fn update(
        &self,
        id: MarriageRecordId,
        details: MarriageDetails,
    ) -> RegisterResult<MarriageRecord> {
        if self.marriages.get_marriage(id)?.is_none() {
            return Err(RegisterError::not_found("marriage", id));
        }
        self.marriages.update_marriage_details(id, &details)?;
        self.marriages
            .get_marriage(id)?
            .ok_or_else(|| RegisterError::not_found("marriage", id))
    }

    /// Releases the spouse links and removes the record.
    pub fn delete(&self, id: MarriageRecordId) -> RegisterResult<()> {
        let record = self
            .marriages
            .get_marriage(id)?
            .ok_or_else(|| RegisterError::not_found("marriage", id))?;

        let bonds = self.bonds();
        let unbinding = bonds.unbind(&record)?;
        if let Err(err) = self.marriages.delete_marriage(id) {
            let failure = RegisterError::from(err);
            if let Err(source) = bonds.restore(&unbinding) {
                error!(
                    "event=marriage_delete module=service status=fatal record={} error={}",
                    id, source
                );
                return Err(RegisterError::CompensationFailed {
                    operation: "delete_marriage",
                    step: "release_spouse",
                    original: Box::new(failure),
                    source,
                });
            }
            return Err(failure);
        }

        info!(
            "event=marriage_delete module=service status=ok record={} marriage_id={}",
            record.uuid, record.marriage_id
        );
        Ok(())
    }

    pub fn get(&self, id: MarriageRecordId) -> RegisterResult<Option<MarriageRecord>> {
        Ok(self.marriages.get_marriage(id)?)
    }

    pub fn find_by_key(&self, marriage_id: &str) -> RegisterResult<Option<MarriageRecord>> {
        Ok(self.marriages.find_marriage_by_key(marriage_id.trim())?)
    }

    /// Lists records newest marriage first.
    pub fn list(&self, query: &MarriageListQuery) -> RegisterResult<Vec<MarriageRecord>> {
        Ok(self.marriages.list_marriages(query)?)
    }
}
