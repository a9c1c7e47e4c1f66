// This file is dual licensed under the terms of the Apache License, Version
// 2.0, and the BSD License. See the LICENSE file in the root of this repository
// for complete details.

use thiserror::Error;

/// The two-variant error taxonomy this core returns to its caller.
///
/// Callers pattern-match on the variant to decide how to surface the failure
/// (e.g. a 400 for `User`, a 500 for `Internal`); the `String` payload is
/// meant for humans, not programmatic inspection.
#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("{0}")]
    User(String),
    #[error("{0}")]
    Internal(String),
}

pub type IssuanceResult<T> = Result<T, IssuanceError>;

impl From<openssl::error::ErrorStack> for IssuanceError {
    fn from(e: openssl::error::ErrorStack) -> Self {
        IssuanceError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for IssuanceError {
    fn from(e: std::io::Error) -> Self {
        IssuanceError::Internal(e.to_string())
    }
}

impl IssuanceError {
    pub fn user(msg: impl Into<String>) -> Self {
        IssuanceError::User(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        IssuanceError::Internal(msg.into())
    }

    pub fn is_user(&self) -> bool {
        matches!(self, IssuanceError::User(_))
    }
}
