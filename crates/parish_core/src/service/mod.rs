//! Register use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into register operations.
//! - Undo completed steps when a later step of the same operation fails.
//! - Keep request handlers decoupled from storage details.

pub mod baptism_service;
pub mod bond;
pub mod death_service;
pub mod directory_service;
pub mod family_service;
pub mod marriage_service;
pub mod register;
mod saga;
pub mod succession;
