//! Execution outcomes and their diagnostic payloads.
//!
//! Every motion the core attempts ends in an [`ExecutionOutcome`]. Outcomes
//! are `#[must_use]` so a caller cannot drop one without looking at it.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ManipError;

/// The closed set of ways a motion can end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OutcomeKind {
    /// The motion completed.
    Succeeded,
    /// No feasible path, IK solution, or trajectory, or a controller or
    /// sensor fault that ends the motion.
    PlanningFailed,
    /// The validity oracle or controller reported a collision.
    CollisionDetected,
    /// The controller did not report completion in time.
    ControllerTimeout,
    /// Operator stop or a preempted goal. Ends the run.
    Aborted,
}

impl OutcomeKind {
    /// Returns a short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PlanningFailed => "planning_failed",
            Self::CollisionDetected => "collision_detected",
            Self::ControllerTimeout => "controller_timeout",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional detail attached to an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostic {
    /// Controller-specific error code.
    pub error_code: Option<i32>,
    /// Links reported in contact.
    pub links: Vec<String>,
    /// Free-form description.
    pub message: Option<String>,
}

impl Diagnostic {
    /// Creates a diagnostic carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.error_code.is_none() && self.links.is_empty() && self.message.is_none()
    }
}

/// The result of one motion: what happened, plus any diagnostic detail.
///
/// # Example
///
/// ```
/// use manip_types::{ExecutionOutcome, ManipError, OutcomeKind};
///
/// let ok = ExecutionOutcome::succeeded();
/// assert!(ok.is_success());
///
/// let outcome = ExecutionOutcome::from(ManipError::collision(["palm"]));
/// assert_eq!(outcome.kind(), OutcomeKind::CollisionDetected);
/// assert_eq!(outcome.diagnostic().links, vec!["palm".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[must_use]
pub struct ExecutionOutcome {
    kind: OutcomeKind,
    diagnostic: Diagnostic,
}

impl ExecutionOutcome {
    /// Creates an outcome with a diagnostic.
    pub const fn new(kind: OutcomeKind, diagnostic: Diagnostic) -> Self {
        Self { kind, diagnostic }
    }

    /// A successful outcome with no diagnostic.
    pub fn succeeded() -> Self {
        Self::new(OutcomeKind::Succeeded, Diagnostic::default())
    }

    /// A planning failure with a message.
    pub fn planning_failed(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::PlanningFailed, Diagnostic::message(message))
    }

    /// A collision naming the links in contact.
    pub fn collision<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            OutcomeKind::CollisionDetected,
            Diagnostic {
                links: links.into_iter().map(Into::into).collect(),
                ..Diagnostic::default()
            },
        )
    }

    /// A controller timeout with a message.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(OutcomeKind::ControllerTimeout, Diagnostic::message(message))
    }

    /// An abort with a reason.
    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::new(OutcomeKind::Aborted, Diagnostic::message(reason))
    }

    /// Attaches a controller error code.
    pub const fn with_error_code(mut self, code: i32) -> Self {
        self.diagnostic.error_code = Some(code);
        self
    }

    /// Returns the outcome kind.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        self.kind
    }

    /// Returns the diagnostic payload.
    #[must_use]
    pub const fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }

    /// Returns `true` if the motion completed.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.kind, OutcomeKind::Succeeded)
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(code) = self.diagnostic.error_code {
            write!(f, " (code {code})")?;
        }
        if !self.diagnostic.links.is_empty() {
            write!(f, " [{}]", self.diagnostic.links.join(", "))?;
        }
        if let Some(message) = &self.diagnostic.message {
            write!(f, ": {message}")?;
        }
        Ok(())
    }
}

impl From<ManipError> for ExecutionOutcome {
    fn from(error: ManipError) -> Self {
        match error {
            ManipError::CollisionDetected { links } => Self::collision(links),
            ManipError::ControllerTimeout(after) => {
                Self::timeout(format!("no completion after {after:?}"))
            }
            ManipError::Aborted(reason) => Self::aborted(reason),
            ManipError::SensorFault(reason) => {
                Self::planning_failed(format!("sensor fault: {reason}"))
            }
            other => Self::planning_failed(other.to_string()),
        }
    }
}
