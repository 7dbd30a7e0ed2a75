//! Forward and inverse kinematics.
//!
//! The path generator only needs two things from a kinematics model: the
//! end-effector pose of a configuration, and a configuration that reaches a
//! pose without jumping far from a seed. [`ArmKinematics`] is that seam.
//! [`GantryKinematics`] is the reference model used for dry runs: each arm
//! hangs from a Cartesian gantry (x, y, z) with a wrist yaw joint, so both
//! directions have closed-form solutions.

use std::f64::consts::{PI, TAU};

use manip_types::{
    ArmSide, JointLimits, JointSpec, KinematicChain, ManipError, RobotConfiguration, Result,
};
use nalgebra::{Isometry3, UnitQuaternion, Vector3};

/// Kinematics of the robot's arms.
pub trait ArmKinematics: Send + Sync {
    /// Returns the end-effector pose of a configuration in the world frame.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::DimensionMismatch`] if the configuration has the
    /// wrong number of joints for its arm.
    fn forward(&self, configuration: &RobotConfiguration) -> Result<Isometry3<f64>>;

    /// Solves for a configuration of `chain` that reaches `target`.
    ///
    /// The solution must lie within the chain's joint bounds and differ from
    /// `seed` by at most `consistency_limit` on every joint. Returns `None`
    /// when no such solution exists.
    fn inverse(
        &self,
        chain: &KinematicChain,
        target: &Isometry3<f64>,
        seed: &RobotConfiguration,
        consistency_limit: f64,
    ) -> Option<RobotConfiguration>;
}

/// Joint order of a gantry arm.
pub const GANTRY_JOINTS: [&str; 4] = ["x", "y", "z", "yaw"];

/// Cartesian gantry arms with a wrist yaw joint.
///
/// Joint vector: `[x, y, z, yaw]`, metres and radians. The end-effector
/// position is the arm's base offset plus `(x, y, z)`; its orientation is a
/// rotation of `yaw` about world z.
///
/// # Example
///
/// ```
/// use manip_motion::{ArmKinematics, GantryKinematics};
/// use manip_types::{ArmSide, RobotConfiguration};
/// use nalgebra::Vector3;
///
/// let gantry = GantryKinematics::new().with_base(ArmSide::Left, Vector3::new(0.0, 0.5, 0.0));
/// let chain = GantryKinematics::chain(ArmSide::Left, 2.0, 1.0, 2.0);
/// let seed = RobotConfiguration::new(ArmSide::Left, vec![0.0, 0.0, 0.0, 0.0]);
///
/// let pose = gantry.forward(&seed).unwrap();
/// assert!((pose.translation.y - 0.5).abs() < 1e-12);
///
/// let solution = gantry.inverse(&chain, &pose, &seed, 0.1).unwrap();
/// assert!(solution.approx_eq(&seed, 1e-12));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GantryKinematics {
    left_base: Vector3<f64>,
    right_base: Vector3<f64>,
    orientation_tolerance: f64,
}

impl GantryKinematics {
    /// Creates a gantry with both bases at the world origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            left_base: Vector3::zeros(),
            right_base: Vector3::zeros(),
            orientation_tolerance: 1e-6,
        }
    }

    /// Sets the base offset of one arm.
    #[must_use]
    pub fn with_base(mut self, side: ArmSide, base: Vector3<f64>) -> Self {
        match side {
            ArmSide::Left => self.left_base = base,
            ArmSide::Right => self.right_base = base,
        }
        self
    }

    /// Sets how far (radians) a target may tilt off the vertical axis and
    /// still be considered reachable.
    #[must_use]
    pub const fn with_orientation_tolerance(mut self, tolerance: f64) -> Self {
        self.orientation_tolerance = tolerance;
        self
    }

    /// Returns the base offset of one arm.
    #[must_use]
    pub const fn base(&self, side: ArmSide) -> &Vector3<f64> {
        match side {
            ArmSide::Left => &self.left_base,
            ArmSide::Right => &self.right_base,
        }
    }

    /// Builds a gantry chain with symmetric travel of `reach` metres on each
    /// axis, unlimited yaw within `[-π, π]`, and uniform motion limits.
    #[must_use]
    pub fn chain(
        side: ArmSide,
        reach: f64,
        max_velocity: f64,
        max_acceleration: f64,
    ) -> KinematicChain {
        let joints = GANTRY_JOINTS
            .iter()
            .map(|axis| {
                let limits = if *axis == "yaw" {
                    JointLimits::symmetric(PI)
                } else {
                    JointLimits::symmetric(reach)
                };
                JointSpec::new(
                    format!("{}_{axis}", side.name()),
                    limits,
                    max_velocity,
                    max_acceleration,
                )
            })
            .collect();
        KinematicChain::new(side, joints)
    }
}

/// Returns the yaw of `rotation` if it is a pure rotation about z.
fn pure_yaw(rotation: &UnitQuaternion<f64>, tolerance: f64) -> Option<f64> {
    let tilted = rotation * Vector3::z();
    if (tilted - Vector3::z()).norm() > tolerance {
        return None;
    }
    let (_, _, yaw) = rotation.euler_angles();
    Some(yaw)
}

/// Shifts `angle` by whole turns to land as close as possible to `reference`.
fn unwrap_near(angle: f64, reference: f64) -> f64 {
    angle + TAU * ((reference - angle) / TAU).round()
}

impl ArmKinematics for GantryKinematics {
    fn forward(&self, configuration: &RobotConfiguration) -> Result<Isometry3<f64>> {
        let q = configuration.values();
        if q.len() != GANTRY_JOINTS.len() {
            return Err(ManipError::dimension_mismatch(GANTRY_JOINTS.len(), q.len()));
        }
        let translation = self.base(configuration.side()) + Vector3::new(q[0], q[1], q[2]);
        Ok(Isometry3::new(translation, Vector3::z() * q[3]))
    }

    fn inverse(
        &self,
        chain: &KinematicChain,
        target: &Isometry3<f64>,
        seed: &RobotConfiguration,
        consistency_limit: f64,
    ) -> Option<RobotConfiguration> {
        if chain.dof() != GANTRY_JOINTS.len() || seed.len() != GANTRY_JOINTS.len() {
            return None;
        }
        let yaw = pure_yaw(&target.rotation, self.orientation_tolerance)?;
        let yaw = unwrap_near(yaw, seed.values()[3]);
        let offset = target.translation.vector - self.base(chain.side());
        let values = vec![offset.x, offset.y, offset.z, yaw];

        if !chain.within_bounds(&values) {
            return None;
        }
        let solution = RobotConfiguration::new(chain.side(), values);
        (solution.max_joint_distance(seed) <= consistency_limit).then_some(solution)
    }
}
