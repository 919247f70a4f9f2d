//! User validation model.
//!
//! # Responsibility
//! - Define the caller-facing `User` record and its `Pid` identifier.
//! - Reject malformed input at construction time.
//!
//! # Invariants
//! - A `Pid` always holds a 9-digit value (`100_000_000..=999_999_999`).
//! - A `User` can only be built from a valid `Pid`, so no invalid `User`
//!   instance can exist, including ones produced by deserialization.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Validation errors for user model construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    /// PID is not a 9-digit number.
    PidOutOfRange { value: i64 },
}

impl Display for UserValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PidOutOfRange { value } => write!(
                f,
                "invalid pid {value}: must be between {} and {}",
                Pid::MIN,
                Pid::MAX
            ),
        }
    }
}

impl Error for UserValidationError {}

/// 9-digit person identifier, used as the user primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Pid(i64);

impl Pid {
    /// Smallest accepted PID.
    pub const MIN: i64 = 100_000_000;
    /// Largest accepted PID.
    pub const MAX: i64 = 999_999_999;

    /// Validates and wraps a raw PID value.
    pub fn new(value: i64) -> Result<Self, UserValidationError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(UserValidationError::PidOutOfRange { value })
        }
    }

    /// Returns the raw integer value.
    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for Pid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Pid {
    type Error = UserValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Pid> for i64 {
    fn from(value: Pid) -> Self {
        value.0
    }
}

/// Caller-facing user record.
///
/// Fields are read-only through accessors so the PID invariant cannot be
/// bypassed after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pid: Pid,
    first_name: String,
    last_name: String,
}

impl User {
    /// Creates a user from a raw PID, validating the PID range.
    pub fn new(
        pid: i64,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self::from_parts(Pid::new(pid)?, first_name, last_name))
    }

    /// Creates a user from an already validated PID.
    pub fn from_parts(
        pid: Pid,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            pid,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }
}
