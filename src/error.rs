//! Error types for hearth
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown task/household/member)
//! - 3: Blocked by policy (capability check, lost claim race, stale version)
//! - 4: Operation failed (io error, lock timeout)

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Exit codes for the hearth CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for hearth operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Household not found: {0}")]
    HouseholdNotFound(String),

    #[error("Member not found: {0}")]
    MemberNotFound(Uuid),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid task: {0}")]
    Validation(String),

    // Policy blocks (exit code 3)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Task {task} is already claimed by {holder}")]
    AlreadyClaimed { task: Uuid, holder: Uuid },

    #[error("Invalid transition: task {task} cannot go from {from} via {event}")]
    InvalidTransition {
        task: Uuid,
        from: String,
        event: String,
    },

    #[error("Version conflict on task {task}: expected {expected}, found {actual}")]
    VersionConflict {
        task: Uuid,
        expected: u64,
        actual: u64,
    },

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::TaskNotFound(_)
            | Error::HouseholdNotFound(_)
            | Error::MemberNotFound(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_)
            | Error::Validation(_) => exit_codes::USER_ERROR,

            // Policy blocks
            Error::Forbidden(_)
            | Error::AlreadyClaimed { .. }
            | Error::InvalidTransition { .. }
            | Error::VersionConflict { .. } => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Whether the caller is expected to re-read state and retry.
    ///
    /// Claim races and stale versions are normal under multi-member
    /// contention; forbidden and invalid-transition are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::AlreadyClaimed { .. } | Error::VersionConflict { .. }
        )
    }

    /// Structured detail payload for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::AlreadyClaimed { task, holder } => Some(serde_json::json!({
                "task": task,
                "holder": holder,
            })),
            Error::VersionConflict {
                task,
                expected,
                actual,
            } => Some(serde_json::json!({
                "task": task,
                "expected_version": expected,
                "actual_version": actual,
            })),
            _ => None,
        }
    }
}

/// Result type alias for hearth operations
pub type Result<T> = std::result::Result<T, Error>;
