//! Register error taxonomy.
//!
//! # Responsibility
//! - Give every failed submission a stable `ErrorKind` and code.
//! - Map kinds to transport-neutral response classes for request handlers.
//! - Keep compensation failures distinct from ordinary validation failures.
//!
//! # Invariants
//! - `RegisterError::is_fatal()` is true only for `CompensationFailed`.
//! - Storage duplicates are translated at the call site that knows which key
//!   collided. Unexpected duplicates stay `StorageFault`.

use crate::model::member::MemberId;
use crate::model::ValidationError;
use crate::repo::RepoError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RegisterResult<T> = Result<T, RegisterError>;

/// Stable error classification reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    MemberInvalid,
    CandidateInvalid,
    SameIdentity,
    DuplicateSequence,
    DuplicateMarriageId,
    DuplicateFamilyNumber,
    FamilyInUse,
    InvalidInput,
    StorageFault,
    /// A compensating step failed; the store may be inconsistent.
    CompensationFailed,
}

/// Transport-neutral outcome class (404/409/400/500 equivalents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseClass {
    BadRequest,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::MemberInvalid => "member_invalid",
            Self::CandidateInvalid => "candidate_invalid",
            Self::SameIdentity => "same_identity",
            Self::DuplicateSequence => "duplicate_sequence",
            Self::DuplicateMarriageId => "duplicate_marriage_id",
            Self::DuplicateFamilyNumber => "duplicate_family_number",
            Self::FamilyInUse => "family_in_use",
            Self::InvalidInput => "invalid_input",
            Self::StorageFault => "storage_fault",
            Self::CompensationFailed => "compensation_failed",
        }
    }

    pub fn response_class(self) -> ResponseClass {
        match self {
            Self::NotFound => ResponseClass::NotFound,
            Self::DuplicateSequence
            | Self::DuplicateMarriageId
            | Self::DuplicateFamilyNumber
            | Self::FamilyInUse => ResponseClass::Conflict,
            Self::MemberInvalid
            | Self::CandidateInvalid
            | Self::SameIdentity
            | Self::InvalidInput => ResponseClass::BadRequest,
            Self::StorageFault | Self::CompensationFailed => ResponseClass::Internal,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Why a referenced member cannot take part in the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberProblem {
    Missing,
    Deceased,
    WrongFamily {
        expected: String,
        actual: Option<String>,
    },
    /// Still bound to a living member or to an external partner.
    AlreadyMarried,
    /// A living head must hand over headship before removal.
    LivingHeadOfFamily,
    /// The family already has a living head.
    HeadAlreadyPresent { family_number: String },
    /// Member-to-member spouse links are created by marriage records only.
    UnmanagedSpouseLink,
}

impl Display for MemberProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "member does not exist"),
            Self::Deceased => write!(f, "member is deceased"),
            Self::WrongFamily { expected, actual } => match actual {
                Some(actual) => write!(f, "member belongs to family {actual}, not {expected}"),
                None => write!(f, "member has no family, expected {expected}"),
            },
            Self::AlreadyMarried => write!(f, "member is bound to another partner"),
            Self::LivingHeadOfFamily => write!(f, "member is the living head of family"),
            Self::HeadAlreadyPresent { family_number } => {
                write!(f, "family {family_number} already has a living head")
            }
            Self::UnmanagedSpouseLink => {
                write!(f, "spouse links to members are set by marriage records")
            }
        }
    }
}

/// Why a proposed successor was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateProblem {
    Missing,
    SameAsVacating,
    Deceased,
    WrongFamily,
}

impl Display for CandidateProblem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "candidate does not exist"),
            Self::SameAsVacating => write!(f, "candidate is the vacating head"),
            Self::Deceased => write!(f, "candidate is deceased"),
            Self::WrongFamily => write!(f, "candidate belongs to another family"),
        }
    }
}

/// Terminal failure of one register submission.
#[derive(Debug)]
pub enum RegisterError {
    NotFound {
        entity: &'static str,
        key: String,
    },
    MemberInvalid {
        member_id: MemberId,
        problem: MemberProblem,
    },
    CandidateInvalid {
        candidate_id: MemberId,
        problem: CandidateProblem,
    },
    SameIdentity(MemberId),
    DuplicateSequence {
        register: &'static str,
        sl_no: i64,
    },
    DuplicateMarriageId(String),
    DuplicateFamilyNumber(String),
    FamilyInUse {
        family_number: String,
        members: u32,
    },
    InvalidInput(ValidationError),
    Storage(RepoError),
    /// Undoing an earlier step failed after `original` aborted the operation.
    CompensationFailed {
        operation: &'static str,
        step: &'static str,
        original: Box<RegisterError>,
        source: RepoError,
    },
}

impl RegisterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MemberInvalid { .. } => ErrorKind::MemberInvalid,
            Self::CandidateInvalid { .. } => ErrorKind::CandidateInvalid,
            Self::SameIdentity(_) => ErrorKind::SameIdentity,
            Self::DuplicateSequence { .. } => ErrorKind::DuplicateSequence,
            Self::DuplicateMarriageId(_) => ErrorKind::DuplicateMarriageId,
            Self::DuplicateFamilyNumber(_) => ErrorKind::DuplicateFamilyNumber,
            Self::FamilyInUse { .. } => ErrorKind::FamilyInUse,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Storage(_) => ErrorKind::StorageFault,
            Self::CompensationFailed { .. } => ErrorKind::CompensationFailed,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// True when the store may have been left inconsistent.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CompensationFailed { .. })
    }

    pub(crate) fn member_invalid(member_id: MemberId, problem: MemberProblem) -> Self {
        Self::MemberInvalid { member_id, problem }
    }

    pub(crate) fn candidate_invalid(candidate_id: MemberId, problem: CandidateProblem) -> Self {
        Self::CandidateInvalid {
            candidate_id,
            problem,
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Translates a storage duplicate into the caller's domain error.
    pub(crate) fn on_duplicate(err: RepoError, make: impl FnOnce() -> RegisterError) -> Self {
        match err {
            RepoError::Duplicate { .. } => make(),
            other => other.into(),
        }
    }
}

impl Display for RegisterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::MemberInvalid { member_id, problem } => {
                write!(f, "member {member_id} is invalid here: {problem}")
            }
            Self::CandidateInvalid {
                candidate_id,
                problem,
            } => write!(f, "next head candidate {candidate_id} rejected: {problem}"),
            Self::SameIdentity(member_id) => {
                write!(f, "both marriage sides reference member {member_id}")
            }
            Self::DuplicateSequence { register, sl_no } => {
                write!(f, "{register} sequence number {sl_no} already exists")
            }
            Self::DuplicateMarriageId(marriage_id) => {
                write!(f, "marriage id `{marriage_id}` already exists")
            }
            Self::DuplicateFamilyNumber(family_number) => {
                write!(f, "family number `{family_number}` already exists")
            }
            Self::FamilyInUse {
                family_number,
                members,
            } => write!(
                f,
                "family {family_number} still has {members} affiliated member(s)"
            ),
            Self::InvalidInput(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "storage fault: {err}"),
            Self::CompensationFailed {
                operation,
                step,
                original,
                source,
            } => write!(
                f,
                "{operation}: compensation of `{step}` failed ({source}) after: {original}"
            ),
        }
    }
}

impl Error for RegisterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidInput(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::CompensationFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<RepoError> for RegisterError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            RepoError::Validation(err) => Self::InvalidInput(err),
            other => Self::Storage(other),
        }
    }
}

impl From<ValidationError> for RegisterError {
    fn from(value: ValidationError) -> Self {
        Self::InvalidInput(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, RegisterError, ResponseClass};
    use crate::model::ValidationError;
    use crate::repo::RepoError;

    #[test]
    fn kinds_map_to_transport_classes() {
        assert_eq!(ErrorKind::NotFound.response_class(), ResponseClass::NotFound);
        assert_eq!(
            ErrorKind::DuplicateSequence.response_class(),
            ResponseClass::Conflict
        );
        assert_eq!(
            ErrorKind::DuplicateMarriageId.response_class(),
            ResponseClass::Conflict
        );
        assert_eq!(
            ErrorKind::CandidateInvalid.response_class(),
            ResponseClass::BadRequest
        );
        assert_eq!(
            ErrorKind::SameIdentity.response_class(),
            ResponseClass::BadRequest
        );
        assert_eq!(
            ErrorKind::StorageFault.response_class(),
            ResponseClass::Internal
        );
    }

    #[test]
    fn repo_errors_translate_to_register_kinds() {
        let not_found: RegisterError = RepoError::NotFound {
            entity: "member",
            key: "x".to_string(),
        }
        .into();
        assert_eq!(not_found.kind(), ErrorKind::NotFound);

        let invalid: RegisterError = RepoError::Validation(ValidationError::BlankField("name")).into();
        assert_eq!(invalid.kind(), ErrorKind::InvalidInput);

        let unexpected_duplicate: RegisterError = RepoError::Duplicate {
            entity: "member",
            key: "x".to_string(),
        }
        .into();
        assert_eq!(unexpected_duplicate.kind(), ErrorKind::StorageFault);
    }

    #[test]
    fn only_compensation_failures_are_fatal() {
        let original = RegisterError::DuplicateMarriageId("M-1".to_string());
        assert!(!original.is_fatal());

        let fatal = RegisterError::CompensationFailed {
            operation: "record_marriage",
            step: "persist_record",
            original: Box::new(original),
            source: RepoError::InvalidData("boom".to_string()),
        };
        assert!(fatal.is_fatal());
        assert_eq!(fatal.code(), "compensation_failed");
    }
}
