//! Joint-space robot configurations.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::chain::{ArmSide, KinematicChain};
use crate::error::Result;

/// A vector of joint values for one kinematic chain.
///
/// Configurations are immutable once produced: operations that "move" a
/// configuration return a new one. Joint names come from the chain the
/// configuration belongs to.
///
/// # Example
///
/// ```
/// use manip_types::{ArmSide, RobotConfiguration};
///
/// let a = RobotConfiguration::new(ArmSide::Left, vec![0.0, 1.0]);
/// let b = RobotConfiguration::new(ArmSide::Left, vec![1.0, 1.0]);
///
/// let mid = a.interpolate(&b, 0.5);
/// assert_eq!(mid.values(), &[0.5, 1.0]);
/// assert!((a.max_joint_distance(&b) - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RobotConfiguration {
    side: ArmSide,
    values: Vec<f64>,
}

impl RobotConfiguration {
    /// Creates a configuration for the given arm.
    #[must_use]
    pub const fn new(side: ArmSide, values: Vec<f64>) -> Self {
        Self { side, values }
    }

    /// Creates a configuration checked against a chain's joint count.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ManipError::DimensionMismatch`] if `values` does not
    /// have one entry per joint.
    pub fn for_chain(chain: &KinematicChain, values: Vec<f64>) -> Result<Self> {
        chain.check_dimension(&values)?;
        Ok(Self::new(chain.side(), values))
    }

    /// Returns which arm this configuration belongs to.
    #[must_use]
    pub const fn side(&self) -> ArmSide {
        self.side
    }

    /// Returns the joint values in chain order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Returns the number of joint values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no joint values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the largest absolute per-joint difference (L-infinity norm).
    ///
    /// Joints missing from either side are ignored.
    #[must_use]
    pub fn max_joint_distance(&self, other: &Self) -> f64 {
        self.values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    /// Linearly interpolates toward `other`; `t = 0` is `self`, `t = 1` is `other`.
    #[must_use]
    pub fn interpolate(&self, other: &Self, t: f64) -> Self {
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| (b - a).mul_add(t, *a))
            .collect();
        Self::new(self.side, values)
    }

    /// Returns `true` if both configurations belong to the same arm and every
    /// joint differs by at most `tolerance`.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.side == other.side
            && self.values.len() == other.values.len()
            && self.max_joint_distance(other) <= tolerance
    }
}
