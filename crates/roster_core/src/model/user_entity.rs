//! Persisted-row representation of a user.
//!
//! # Responsibility
//! - Mirror the `users` table columns with plain storage types.
//! - Convert between `User` and `UserEntity` without side effects.
//!
//! # Invariants
//! - `UserEntity::from_model(u).to_model() == Ok(u)` for every valid `u`.
//! - `to_model` re-validates, since rows read back from storage are untrusted.

use crate::model::user::{Pid, User, UserValidationError};

/// Row shape of the `users` table. `pid` is the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    pub pid: i64,
    pub first_name: String,
    pub last_name: String,
}

impl UserEntity {
    /// Builds an entity carrying the same field values as `user`.
    pub fn from_model(user: &User) -> Self {
        Self {
            pid: user.pid().get(),
            first_name: user.first_name().to_string(),
            last_name: user.last_name().to_string(),
        }
    }

    /// Maps this row back into a validated `User`.
    pub fn to_model(&self) -> Result<User, UserValidationError> {
        Ok(User::from_parts(
            Pid::new(self.pid)?,
            self.first_name.as_str(),
            self.last_name.as_str(),
        ))
    }
}

impl From<&User> for UserEntity {
    fn from(value: &User) -> Self {
        Self::from_model(value)
    }
}

impl TryFrom<UserEntity> for User {
    type Error = UserValidationError;

    fn try_from(value: UserEntity) -> Result<Self, Self::Error> {
        Ok(User::from_parts(
            Pid::new(value.pid)?,
            value.first_name,
            value.last_name,
        ))
    }
}
