//! User domain model and its persisted-row mapping.
//!
//! # Responsibility
//! - Define the validated `User` model used by core callers.
//! - Define the `UserEntity` row shape and the pure mapping between them.
//!
//! # Invariants
//! - Every user is identified by a 9-digit `Pid`.
//! - Mapping is explicit and hand-written; no reflection-based binding.

pub mod user;
pub mod user_entity;
