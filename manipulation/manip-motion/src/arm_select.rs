//! Choosing which arm services a target.

use manip_types::{ArmSide, ManipError, Result, RobotModel};
use nalgebra::Isometry3;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Picks an arm by the target's lateral (world y) offset.
///
/// Targets at or left of `split_y` go to the left arm, the rest to the right.
/// A robot with only one arm always uses it.
///
/// # Example
///
/// ```
/// use manip_motion::{ArmSelector, GantryKinematics};
/// use manip_types::{ArmSide, RobotModel};
/// use nalgebra::Isometry3;
///
/// let robot = RobotModel::new()
///     .with_chain(GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0))
///     .with_chain(GantryKinematics::chain(ArmSide::Right, 1.0, 1.0, 1.0));
/// let selector = ArmSelector::new(0.0);
///
/// let left = selector.select(&robot, &Isometry3::translation(0.8, 0.3, 1.0)).unwrap();
/// let right = selector.select(&robot, &Isometry3::translation(0.8, -0.3, 1.0)).unwrap();
/// assert_eq!(left, ArmSide::Left);
/// assert_eq!(right, ArmSide::Right);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArmSelector {
    split_y: f64,
}

impl ArmSelector {
    /// Creates a selector splitting the workspace at `split_y`.
    #[must_use]
    pub const fn new(split_y: f64) -> Self {
        Self { split_y }
    }

    /// Returns the lateral split.
    #[must_use]
    pub const fn split_y(&self) -> f64 {
        self.split_y
    }

    /// Chooses the arm for a target pose.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] if the robot has no arms.
    pub fn select(&self, robot: &RobotModel, target: &Isometry3<f64>) -> Result<ArmSide> {
        let available: Vec<ArmSide> = robot.sides().collect();
        let side = match available.as_slice() {
            [] => return Err(ManipError::invalid_config("robot has no arms")),
            [only] => *only,
            _ if target.translation.y >= self.split_y => ArmSide::Left,
            _ => ArmSide::Right,
        };
        debug!(side = %side, y = target.translation.y, "Selected arm");
        Ok(side)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kinematics::GantryKinematics;

    #[test]
    fn test_single_arm_always_wins() {
        let robot = RobotModel::new().with_chain(GantryKinematics::chain(ArmSide::Right, 1.0, 1.0, 1.0));
        let selector = ArmSelector::new(0.0);
        let side = selector
            .select(&robot, &Isometry3::translation(0.0, 5.0, 0.0))
            .unwrap();
        assert_eq!(side, ArmSide::Right);
    }

    #[test]
    fn test_no_arms() {
        let selector = ArmSelector::default();
        assert!(
            selector
                .select(&RobotModel::new(), &Isometry3::identity())
                .is_err()
        );
    }

    #[test]
    fn test_split_boundary_goes_left() {
        let robot = RobotModel::new()
            .with_chain(GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0))
            .with_chain(GantryKinematics::chain(ArmSide::Right, 1.0, 1.0, 1.0));
        let selector = ArmSelector::new(0.25);
        assert_eq!(
            selector
                .select(&robot, &Isometry3::translation(0.0, 0.25, 0.0))
                .unwrap(),
            ArmSide::Left
        );
        assert_eq!(
            selector
                .select(&robot, &Isometry3::translation(0.0, 0.2, 0.0))
                .unwrap(),
            ArmSide::Right
        );
    }
}
