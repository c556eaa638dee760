//! Core of the parish register.
//! Keeps households, members and the death, marriage and baptism registers
//! mutually consistent.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, RegisterConfig, SuccessionPolicyKind};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use error::{
    CandidateProblem, ErrorKind, MemberProblem, RegisterError, RegisterResult, ResponseClass,
};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::baptism::{BaptismDetails, BaptismRecord, BaptismRecordId, BaptismSubject};
pub use model::death::{DeathDetails, DeathRecord, DeathRecordId, DeathSubject};
pub use model::family::{Family, FamilyNumber};
pub use model::marriage::{MarriageDetails, MarriageParty, MarriageRecord, MarriageRecordId};
pub use model::member::{Gender, MaritalLink, MaritalStatus, Member, MemberId};
pub use model::ValidationError;
pub use repo::marriage_repo::MarriageListQuery;
pub use repo::member_repo::MemberListQuery;
pub use repo::{DateRange, RepoError, RepoResult};
pub use service::baptism_service::BaptismSubmission;
pub use service::bond::MarriageSide;
pub use service::death_service::{DeathOutcome, DeathSubmission};
pub use service::directory_service::MemberProfile;
pub use service::family_service::{FamilyOverview, HouseholdDetails};
pub use service::marriage_service::MarriageSubmission;
pub use service::register::ParishRegister;
pub use service::succession::{Appointment, OldestFirst, SuccessionOutcome, SuccessionPolicy};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
