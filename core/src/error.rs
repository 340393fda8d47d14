//! # Error Taxonomy
//!
//! Three families, one fate. **Precondition errors** (expired deadline,
//! malformed path, unsupported step shape) are detected before or during
//! resolution. **Reconciliation errors** ([`SessionError::BalanceNotSettled`],
//! [`BackendError::InsufficientFunds`]) surface only at session close or
//! settlement time. **External-operation errors** (a venue rejecting an
//! amount against its bound) are propagated verbatim. Every one of them
//! aborts the entire top-level call: there is no retry policy anywhere in
//! this core, and all session state is discarded as if the call never ran.
//! User-visible behavior is binary -- either the full batch settles with
//! every declared bound respected, or nothing happens.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::backend::BackendError;
use crate::step::StepError;
use crate::vault::SessionError;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Any failure a top-level settlement call can produce.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The caller-supplied deadline had already passed at entry. Checked
    /// exactly once, against the wall clock; never re-checked mid-path.
    #[error("deadline expired: {deadline} is in the past")]
    DeadlineExpired {
        /// The deadline the caller supplied.
        deadline: DateTime<Utc>,
    },

    /// A path contained no steps.
    #[error("path {path} is empty")]
    EmptyPath {
        /// Index of the offending path within the batch.
        path: usize,
    },

    /// A path exceeded [`MAX_STEPS_PER_PATH`](crate::config::MAX_STEPS_PER_PATH).
    #[error("path {path} has {steps} steps, maximum is {max}")]
    PathTooLong {
        /// Index of the offending path within the batch.
        path: usize,
        /// Number of steps it declared.
        steps: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// The batch exceeded [`MAX_PATHS_PER_BATCH`](crate::config::MAX_PATHS_PER_BATCH).
    #[error("batch has {paths} paths, maximum is {max}")]
    BatchTooLarge {
        /// Number of paths submitted.
        paths: usize,
        /// The enforced maximum.
        max: usize,
    },

    /// Session lifecycle violation.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// A step's venue/asset combination matched no supported shape.
    #[error("step error: {0}")]
    Step(#[from] StepError),

    /// An external venue or transfer primitive failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}
