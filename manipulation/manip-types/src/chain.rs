//! Kinematic chains and the dual-arm robot model.
//!
//! The set of controllable arms is fixed when the robot is configured, so
//! "which arm" is a closed enum ([`ArmSide`]) rather than a trait object.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ManipError, Result};

/// Which arm of the robot a chain, configuration, or command belongs to.
///
/// # Example
///
/// ```
/// use manip_types::ArmSide;
///
/// assert_eq!(ArmSide::Left.other(), ArmSide::Right);
/// assert_eq!(ArmSide::Right.name(), "right_arm");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ArmSide {
    /// The left arm.
    Left,
    /// The right arm.
    Right,
}

impl ArmSide {
    /// Both sides, left first.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    /// Returns the opposite arm.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Returns the planning-group style name of the arm.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Left => "left_arm",
            Self::Right => "right_arm",
        }
    }
}

impl std::fmt::Display for ArmSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Position bounds of a single joint.
///
/// Bounds are normalized so that `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointLimits {
    lower: f64,
    upper: f64,
}

impl JointLimits {
    /// Creates new position limits, swapping the bounds if given in reverse.
    #[must_use]
    pub fn new(lower: f64, upper: f64) -> Self {
        let (lower, upper) = if lower <= upper {
            (lower, upper)
        } else {
            (upper, lower)
        };
        Self { lower, upper }
    }

    /// Creates symmetric limits around zero.
    #[must_use]
    pub fn symmetric(bound: f64) -> Self {
        Self::new(-bound.abs(), bound.abs())
    }

    /// Returns the lower bound.
    #[must_use]
    pub const fn lower(&self) -> f64 {
        self.lower
    }

    /// Returns the upper bound.
    #[must_use]
    pub const fn upper(&self) -> f64 {
        self.upper
    }

    /// Checks if a position is within the bounds.
    #[must_use]
    pub fn contains(&self, position: f64) -> bool {
        position >= self.lower && position <= self.upper
    }
}

/// One joint of a kinematic chain: name, bounds, and motion limits.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JointSpec {
    name: String,
    limits: JointLimits,
    max_velocity: f64,
    max_acceleration: f64,
}

impl JointSpec {
    /// Creates a joint with the given bounds and motion limits.
    ///
    /// Velocity and acceleration limits are stored as magnitudes.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        limits: JointLimits,
        max_velocity: f64,
        max_acceleration: f64,
    ) -> Self {
        Self {
            name: name.into(),
            limits,
            max_velocity: max_velocity.abs(),
            max_acceleration: max_acceleration.abs(),
        }
    }

    /// Returns the joint name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the position bounds.
    #[must_use]
    pub const fn limits(&self) -> &JointLimits {
        &self.limits
    }

    /// Returns the maximum velocity magnitude.
    #[must_use]
    pub const fn max_velocity(&self) -> f64 {
        self.max_velocity
    }

    /// Returns the maximum acceleration magnitude.
    #[must_use]
    pub const fn max_acceleration(&self) -> f64 {
        self.max_acceleration
    }
}

/// The ordered set of joints forming one controllable arm.
///
/// # Example
///
/// ```
/// use manip_types::{ArmSide, JointLimits, JointSpec, KinematicChain};
///
/// let chain = KinematicChain::new(
///     ArmSide::Left,
///     vec![
///         JointSpec::new("x", JointLimits::new(0.0, 1.0), 0.5, 1.0),
///         JointSpec::new("z", JointLimits::new(0.0, 2.0), 0.5, 1.0),
///     ],
/// );
///
/// assert_eq!(chain.dof(), 2);
/// assert!(chain.within_bounds(&[0.5, 1.5]));
/// assert_eq!(chain.first_out_of_bounds(&[1.5, 1.5]), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KinematicChain {
    side: ArmSide,
    joints: Vec<JointSpec>,
}

impl KinematicChain {
    /// Creates a chain for the given arm.
    #[must_use]
    pub const fn new(side: ArmSide, joints: Vec<JointSpec>) -> Self {
        Self { side, joints }
    }

    /// Returns which arm this chain drives.
    #[must_use]
    pub const fn side(&self) -> ArmSide {
        self.side
    }

    /// Returns the number of joints.
    #[must_use]
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// Returns the joint specifications in chain order.
    #[must_use]
    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    /// Returns the joint names in chain order.
    pub fn joint_names(&self) -> impl Iterator<Item = &str> {
        self.joints.iter().map(JointSpec::name)
    }

    /// Checks that a joint vector has one value per joint.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::DimensionMismatch`] if the lengths differ.
    pub fn check_dimension(&self, values: &[f64]) -> Result<()> {
        if values.len() == self.joints.len() {
            Ok(())
        } else {
            Err(ManipError::dimension_mismatch(self.joints.len(), values.len()))
        }
    }

    /// Returns `true` if every value is within its joint's bounds.
    ///
    /// A vector of the wrong length is never within bounds.
    #[must_use]
    pub fn within_bounds(&self, values: &[f64]) -> bool {
        values.len() == self.joints.len() && self.first_out_of_bounds(values).is_none()
    }

    /// Returns the index of the first joint whose value is out of bounds.
    #[must_use]
    pub fn first_out_of_bounds(&self, values: &[f64]) -> Option<usize> {
        self.joints
            .iter()
            .zip(values)
            .position(|(joint, value)| !joint.limits.contains(*value))
    }
}

/// The robot's arms, fixed at configuration time.
///
/// A single-arm robot leaves one side empty.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RobotModel {
    left: Option<KinematicChain>,
    right: Option<KinematicChain>,
}

impl RobotModel {
    /// Creates an empty model.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            left: None,
            right: None,
        }
    }

    /// Adds a chain, replacing any chain already registered for its side.
    #[must_use]
    pub fn with_chain(mut self, chain: KinematicChain) -> Self {
        match chain.side() {
            ArmSide::Left => self.left = Some(chain),
            ArmSide::Right => self.right = Some(chain),
        }
        self
    }

    /// Returns the chain for a side, if the robot has that arm.
    #[must_use]
    pub const fn chain(&self, side: ArmSide) -> Option<&KinematicChain> {
        match side {
            ArmSide::Left => self.left.as_ref(),
            ArmSide::Right => self.right.as_ref(),
        }
    }

    /// Returns the chain for a side or an error naming the missing arm.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] if the robot has no such arm.
    pub fn require_chain(&self, side: ArmSide) -> Result<&KinematicChain> {
        self.chain(side)
            .ok_or_else(|| ManipError::invalid_config(format!("robot has no {side}")))
    }

    /// Returns the sides this robot has arms for.
    pub fn sides(&self) -> impl Iterator<Item = ArmSide> + '_ {
        ArmSide::ALL
            .into_iter()
            .filter(|side| self.chain(*side).is_some())
    }
}
