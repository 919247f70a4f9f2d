//! Core domain logic for Roster user registration.
//! This crate is the single source of truth for user invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{
    default_log_level, init_logging, logging_status, parse_log_level, LoggingError,
};
pub use model::user::{Pid, User, UserValidationError};
pub use model::user_entity::UserEntity;
pub use repo::user_session::{RepoError, RepoResult, SqliteUserSession, UserSession};
pub use service::user_service::{ServiceError, ServiceResult, UserService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
