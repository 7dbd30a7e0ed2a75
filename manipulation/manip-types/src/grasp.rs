//! Grasp candidates supplied by the external grasp generator.

use nalgebra::{Isometry3, Unit, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Finger joint positions for one gripper state.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GripperPosture {
    /// Finger joint positions in gripper order.
    pub positions: Vec<f64>,
}

impl GripperPosture {
    /// Creates a posture from finger joint positions.
    #[must_use]
    pub const fn new(positions: Vec<f64>) -> Self {
        Self { positions }
    }
}

/// A proposed grasp: the final end-effector pose, the pre-grasp pose the
/// approach starts from, and the finger posture to close to.
///
/// # Example
///
/// ```
/// use manip_types::{GraspCandidate, GripperPosture};
/// use nalgebra::Isometry3;
///
/// let candidate = GraspCandidate::new(
///     Isometry3::translation(1.0, 0.0, 1.0),
///     Isometry3::translation(0.8, 0.0, 1.0),
///     GripperPosture::new(vec![0.7]),
/// );
///
/// assert!((candidate.approach_distance() - 0.2).abs() < 1e-12);
/// let direction = candidate.approach_direction().unwrap();
/// assert!((direction.x - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GraspCandidate {
    grasp_pose: Isometry3<f64>,
    pre_grasp_pose: Isometry3<f64>,
    posture: GripperPosture,
}

impl GraspCandidate {
    /// Creates a candidate from world-frame poses.
    #[must_use]
    pub const fn new(
        grasp_pose: Isometry3<f64>,
        pre_grasp_pose: Isometry3<f64>,
        posture: GripperPosture,
    ) -> Self {
        Self {
            grasp_pose,
            pre_grasp_pose,
            posture,
        }
    }

    /// Returns the final end-effector pose.
    #[must_use]
    pub const fn grasp_pose(&self) -> &Isometry3<f64> {
        &self.grasp_pose
    }

    /// Returns the pose the approach starts from.
    #[must_use]
    pub const fn pre_grasp_pose(&self) -> &Isometry3<f64> {
        &self.pre_grasp_pose
    }

    /// Returns the closed finger posture.
    #[must_use]
    pub const fn posture(&self) -> &GripperPosture {
        &self.posture
    }

    /// Distance between the pre-grasp and grasp positions.
    #[must_use]
    pub fn approach_distance(&self) -> f64 {
        self.approach_vector().norm()
    }

    /// Unit direction from the pre-grasp toward the grasp position.
    ///
    /// Returns `None` if the two poses coincide.
    #[must_use]
    pub fn approach_direction(&self) -> Option<Unit<Vector3<f64>>> {
        Unit::try_new(self.approach_vector(), 1e-9)
    }

    fn approach_vector(&self) -> Vector3<f64> {
        self.grasp_pose.translation.vector - self.pre_grasp_pose.translation.vector
    }
}
