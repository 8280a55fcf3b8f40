//! Error types used by the limiter and by submitted tasks.
//!
//! This module defines two error enums:
//!
//! - [`ConfigError`] - errors raised while constructing a [`Limiter`](crate::Limiter).
//! - [`TaskError`] - the failure side of a [`TaskHandle`](crate::TaskHandle).
//!
//! Both types provide `as_label` for logs/metrics. The scheduler itself has no
//! runtime error conditions: once built, admission cannot fail.

use thiserror::Error;

/// # Errors produced while configuring a limiter.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Concurrency limit was zero or negative.
    #[error("concurrency limit must be positive, got {limit}")]
    NonPositiveLimit {
        /// The rejected value.
        limit: i64,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskgate::ConfigError;
    ///
    /// let err = ConfigError::NonPositiveLimit { limit: 0 };
    /// assert_eq!(err.as_label(), "config_non_positive_limit");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::NonPositiveLimit { .. } => "config_non_positive_limit",
        }
    }
}

/// # Outcome of a task that did not produce a value.
///
/// `E` is the error type of the submitted work function. It is carried
/// verbatim in [`TaskError::Failed`]; the limiter never inspects or retries it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TaskError<E> {
    /// The work function returned an error.
    #[error("task failed: {0}")]
    Failed(E),

    /// The work function panicked while running.
    #[error("task panicked: {reason}")]
    Panicked {
        /// Panic payload rendered as text (if it was a string).
        reason: String,
    },

    /// The task was dropped before it settled (runtime shut down).
    #[error("task dropped before completion")]
    Lost,
}

impl<E> TaskError<E> {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskgate::TaskError;
    ///
    /// let err: TaskError<&str> = TaskError::Failed("boom");
    /// assert_eq!(err.as_label(), "task_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Failed(_) => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Lost => "task_lost",
        }
    }

    /// Returns `true` if the work function itself returned an error.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskError::Failed(_))
    }

    /// Returns the work function's error, if that is what this is.
    ///
    /// # Example
    /// ```
    /// use taskgate::TaskError;
    ///
    /// let err: TaskError<&str> = TaskError::Failed("boom");
    /// assert_eq!(err.into_failure(), Some("boom"));
    ///
    /// let lost: TaskError<&str> = TaskError::Lost;
    /// assert_eq!(lost.into_failure(), None);
    /// ```
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}
