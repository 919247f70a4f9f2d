//! User registration service.
//!
//! # Responsibility
//! - Orchestrate "map -> insert -> commit -> map back" for new users.
//! - Resolve point lookups by PID into validated `User` models.
//!
//! # Invariants
//! - Every failed `register` rolls the session back before returning.
//! - The service never logs or suppresses errors; every failure reaches the
//!   caller.
//! - Service layer remains storage-agnostic (generic over `UserSession`).

use crate::model::user::{Pid, User, UserValidationError};
use crate::model::user_entity::UserEntity;
use crate::repo::user_session::{RepoError, UserSession};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors from user service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Input PID is not a 9-digit number.
    Validation(UserValidationError),
    /// No user is registered under this PID.
    NotFound(Pid),
    /// A user is already registered under this PID.
    Conflict(Pid),
    /// A stored row failed model validation on read-back.
    InvalidStoredRow(UserValidationError),
    /// Session-level failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(pid) => write!(f, "no user found with pid: {pid}"),
            Self::Conflict(pid) => write!(f, "user already registered with pid: {pid}"),
            Self::InvalidStoredRow(err) => write!(f, "invalid stored user row: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) | Self::InvalidStoredRow(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) | Self::Conflict(_) => None,
        }
    }
}

impl From<UserValidationError> for ServiceError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict(raw) => match Pid::new(raw) {
                Ok(pid) => Self::Conflict(pid),
                Err(_) => Self::Repo(RepoError::Conflict(raw)),
            },
            other => Self::Repo(other),
        }
    }
}

/// Use-case service over one persistence session.
pub struct UserService<S: UserSession> {
    session: S,
}

impl<S: UserSession> UserService<S> {
    /// Creates a service owning the provided session.
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// Persists `user` and returns the model read back from the committed row.
    ///
    /// # Errors
    /// - `Conflict` when the PID is already registered.
    /// - `InvalidStoredRow` when the committed row does not map back to a
    ///   `User`.
    /// - `Repo` for any other storage failure.
    pub fn register(&mut self, user: &User) -> ServiceResult<User> {
        let entity = UserEntity::from(user);
        match self.persist(entity.clone()) {
            Ok(()) => entity.to_model().map_err(ServiceError::InvalidStoredRow),
            Err(err) => {
                self.session.rollback();
                Err(err.into())
            }
        }
    }

    /// Loads the user registered under `pid`.
    ///
    /// # Errors
    /// - `NotFound` when no row matches.
    /// - `InvalidStoredRow` when the stored row fails model validation.
    /// - `Repo` when the lookup itself fails.
    pub fn get(&self, pid: Pid) -> ServiceResult<User> {
        match self.session.get_by_key(pid.get())? {
            Some(entity) => entity.to_model().map_err(ServiceError::InvalidStoredRow),
            None => Err(ServiceError::NotFound(pid)),
        }
    }

    /// Validates a raw PID, then behaves like [`UserService::get`].
    ///
    /// # Errors
    /// - `Validation` when `pid` is not a 9-digit number.
    /// - Any error [`UserService::get`] returns.
    pub fn get_by_raw_pid(&self, pid: i64) -> ServiceResult<User> {
        self.get(Pid::new(pid)?)
    }

    /// Releases the owned session.
    pub fn into_session(self) -> S {
        self.session
    }

    fn persist(&mut self, entity: UserEntity) -> Result<(), RepoError> {
        self.session.insert(entity)?;
        self.session.commit()
    }
}
