//! Error types for manipulation operations.
//!
//! This module defines the [`ManipError`] enum which represents every failure
//! the manipulation core can report, from path generation through execution
//! and tactile sensing.

use std::time::Duration;

/// Result type for manipulation operations.
pub type Result<T> = std::result::Result<T, ManipError>;

/// Errors that can occur during manipulation.
///
/// The first five variants mirror the outcome taxonomy reported by the
/// execution layer (see [`crate::OutcomeKind`]); the rest are construction
/// and I/O failures.
///
/// # Example
///
/// ```
/// use manip_types::ManipError;
///
/// let error = ManipError::collision(["left_finger", "shelf_bin_a"]);
/// assert!(error.is_collision());
/// assert!(error.to_string().contains("left_finger"));
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManipError {
    /// No feasible path or IK solution exists.
    #[error("planning failed: {0}")]
    PlanningFailed(String),

    /// The validity oracle or the controller rejected a state.
    #[error("collision detected between {}", links.join(", "))]
    CollisionDetected {
        /// Names of the links reported in contact.
        links: Vec<String>,
    },

    /// The controller did not report completion in time.
    #[error("controller timed out after {0:?}")]
    ControllerTimeout(Duration),

    /// Operator stop or cancellation.
    #[error("aborted: {0}")]
    Aborted(String),

    /// A tactile sample was malformed or stale.
    #[error("sensor fault: {0}")]
    SensorFault(String),

    /// A configuration parameter is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A joint vector does not match the chain it was produced for.
    #[error("dimension mismatch: expected {expected} joints, got {actual}")]
    DimensionMismatch {
        /// Joint count of the chain.
        expected: usize,
        /// Joint count supplied.
        actual: usize,
    },

    /// A trajectory violates its timing invariants.
    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),

    /// A playback file could not be parsed.
    #[error("playback file line {line}: {message}")]
    Playback {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// I/O error from the standard library.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManipError {
    /// Creates a planning failure with the given message.
    #[must_use]
    pub fn planning(message: impl Into<String>) -> Self {
        Self::PlanningFailed(message.into())
    }

    /// Creates a collision error listing the offending links.
    #[must_use]
    pub fn collision<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CollisionDetected {
            links: links.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an abort error with the given reason.
    #[must_use]
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted(reason.into())
    }

    /// Creates a sensor fault with the given reason.
    #[must_use]
    pub fn sensor_fault(reason: impl Into<String>) -> Self {
        Self::SensorFault(reason.into())
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Creates an invalid trajectory error.
    #[must_use]
    pub fn invalid_trajectory(message: impl Into<String>) -> Self {
        Self::InvalidTrajectory(message.into())
    }

    /// Creates a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Creates a playback parse error.
    #[must_use]
    pub fn playback(line: usize, message: impl Into<String>) -> Self {
        Self::Playback {
            line,
            message: message.into(),
        }
    }

    /// Returns `true` if this is a collision error.
    #[must_use]
    pub const fn is_collision(&self) -> bool {
        matches!(self, Self::CollisionDetected { .. })
    }

    /// Returns `true` if this is a planning failure.
    #[must_use]
    pub const fn is_planning_failure(&self) -> bool {
        matches!(self, Self::PlanningFailed(_))
    }

    /// Returns `true` if this is a controller timeout.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::ControllerTimeout(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collision_display_lists_links() {
        let error = ManipError::collision(["wrist", "bin_wall"]);
        let msg = error.to_string();
        assert!(msg.contains("collision detected"));
        assert!(msg.contains("wrist, bin_wall"));
    }

    #[test]
    fn test_timeout_display() {
        let error = ManipError::ControllerTimeout(Duration::from_secs(3));
        assert!(error.to_string().contains("timed out"));
        assert!(error.is_timeout());
        assert!(!error.is_collision());
    }

    #[test]
    fn test_dimension_mismatch_display() {
        let error = ManipError::dimension_mismatch(7, 6);
        let msg = error.to_string();
        assert!(msg.contains('7'));
        assert!(msg.contains('6'));
    }

    #[test]
    fn test_playback_display() {
        let error = ManipError::playback(4, "expected 3 columns");
        assert!(error.to_string().contains("line 4"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: ManipError = io.into();
        assert!(matches!(error, ManipError::Io(_)));
    }

    #[test]
    fn test_predicates() {
        assert!(ManipError::planning("no ik").is_planning_failure());
        assert!(!ManipError::aborted("stop").is_planning_failure());
    }
}
