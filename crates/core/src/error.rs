//! Domain error model.
//!
//! Every public operation in the workspace reports failures through
//! [`DomainError`]. The variants form a closed taxonomy so transports can map
//! them to status codes without inspecting messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Extra, caller-safe context attached to a refusal.
///
/// Lets a client see what *would* have been acceptable without another query.
/// Serializes as a single-key object naming the list, e.g.
/// `{"available_role_permissions": [..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostics {
    /// Permission names that exist in the requested module.
    AvailablePermissions(Vec<String>),
    /// Permission names granted by the caller's role.
    #[serde(rename = "available_role_permissions")]
    RolePermissions(Vec<String>),
}

/// Coarse classification of a [`DomainError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Unauthorized,
    Forbidden,
    NotFound,
    InvalidState,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Internal => "internal_error",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input failed validation (malformed email, missing vendor fields, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A uniqueness rule would be broken (duplicate email, role name, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller could not be authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but lacks a grant, role or ownership.
    #[error("forbidden: {message}")]
    Forbidden {
        message: String,
        diagnostics: Option<Diagnostics>,
    },

    /// A referenced resource does not exist.
    #[error("not found: {message}")]
    NotFound {
        message: String,
        diagnostics: Option<Diagnostics>,
    },

    /// The resource exists but its current state does not allow the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Store or other infrastructure failure. The message is safe to show.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden {
            message: msg.into(),
            diagnostics: None,
        }
    }

    pub fn forbidden_with(msg: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self::Forbidden {
            message: msg.into(),
            diagnostics: Some(diagnostics),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            diagnostics: None,
        }
    }

    pub fn not_found_with(msg: impl Into<String>, diagnostics: Diagnostics) -> Self {
        Self::NotFound {
            message: msg.into(),
            diagnostics: Some(diagnostics),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::Unauthorized(_) => ErrorKind::Unauthorized,
            DomainError::Forbidden { .. } => ErrorKind::Forbidden,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::InvalidState(_) => ErrorKind::InvalidState,
            DomainError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The human-readable message without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation(m)
            | DomainError::Conflict(m)
            | DomainError::Unauthorized(m)
            | DomainError::InvalidState(m)
            | DomainError::Internal(m) => m,
            DomainError::Forbidden { message, .. } | DomainError::NotFound { message, .. } => {
                message
            }
        }
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            DomainError::Forbidden { diagnostics, .. } | DomainError::NotFound { diagnostics, .. } => {
                diagnostics.as_ref()
            }
            _ => None,
        }
    }
}
