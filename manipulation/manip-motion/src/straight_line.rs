//! Cartesian path generation.
//!
//! A Cartesian motion is discretized into poses no more than
//! [`StraightLineConfig::resolution`] apart. Each pose is solved with IK seeded
//! by the previous solution, so the arm cannot flip configurations mid-path,
//! and each solution is filtered through [`check_state`]. Generation stops at
//! the first pose that cannot be solved or is invalid; the caller receives the
//! path so far plus the distance it covers and decides whether that is enough.
//!
//! # Example
//!
//! ```
//! use manip_motion::{CollisionCheck, FreeSpace, GantryKinematics, StraightLinePlanner};
//! use manip_types::{ArmSide, RobotConfiguration, StraightLineConfig};
//! use nalgebra::Vector3;
//!
//! let gantry = GantryKinematics::new();
//! let chain = GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0);
//! let planner = StraightLinePlanner::new(&gantry, &FreeSpace, StraightLineConfig::default());
//!
//! let start = RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]);
//! let path = planner
//!     .compute_straight_line_path(&Vector3::x(), 0.2, &start, &chain, false, CollisionCheck::Enforce)
//!     .unwrap();
//!
//! assert!((path.achieved_length() - 0.2).abs() < 1e-9);
//! assert_eq!(path.configurations().len(), 21);
//! ```

use manip_types::{
    CartesianWaypointPath, KinematicChain, ManipError, RobotConfiguration, Result,
    StraightLineConfig,
};
use nalgebra::{Isometry3, Translation3, Unit, Vector3};
use tracing::debug;

use crate::kinematics::ArmKinematics;
use crate::validity::{CollisionCheck, StateValidity, Validity, check_state};

/// Translates `pose` by `distance` along the world-frame `direction`,
/// keeping its orientation.
///
/// # Example
///
/// ```
/// use manip_motion::project_pose;
/// use nalgebra::{Isometry3, Vector3};
///
/// let pose = Isometry3::translation(1.0, 0.0, 0.0);
/// let moved = project_pose(&pose, &Vector3::new(0.0, 0.0, 2.0), 0.5);
/// assert!((moved.translation.z - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn project_pose(
    pose: &Isometry3<f64>,
    direction: &Vector3<f64>,
    distance: f64,
) -> Isometry3<f64> {
    let Some(unit) = Unit::try_new(*direction, f64::EPSILON) else {
        return *pose;
    };
    Translation3::from(unit.into_inner() * distance) * *pose
}

/// Discretizes a straight line from `start` into poses at most `resolution`
/// apart. The start pose itself is not included; the last pose is exactly
/// `distance` away.
#[must_use]
pub fn straight_line_waypoints(
    start: &Isometry3<f64>,
    direction: &Unit<Vector3<f64>>,
    distance: f64,
    resolution: f64,
) -> CartesianWaypointPath {
    if distance <= 0.0 || resolution <= 0.0 {
        return CartesianWaypointPath::default();
    }
    let steps = step_count(distance, resolution);
    (1..=steps)
        .map(|i| {
            let travelled = (f64::from(i) * resolution).min(distance);
            project_pose(start, direction, travelled)
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn step_count(distance: f64, resolution: f64) -> u32 {
    // Guard against 0.30000000000000004 / 0.1 producing an extra step.
    ((distance / resolution) - 1e-9).ceil().max(1.0) as u32
}

/// The result of Cartesian path generation.
#[derive(Debug, Clone, PartialEq)]
pub struct StraightLinePath {
    configurations: Vec<RobotConfiguration>,
    waypoints: CartesianWaypointPath,
    achieved_length: f64,
    requested_length: f64,
}

impl StraightLinePath {
    fn empty(requested_length: f64) -> Self {
        Self {
            configurations: Vec::new(),
            waypoints: CartesianWaypointPath::default(),
            achieved_length: 0.0,
            requested_length,
        }
    }

    /// Returns the solved configurations, starting with the start configuration.
    #[must_use]
    pub fn configurations(&self) -> &[RobotConfiguration] {
        &self.configurations
    }

    /// Consumes the path, returning its configurations.
    #[must_use]
    pub fn into_configurations(self) -> Vec<RobotConfiguration> {
        self.configurations
    }

    /// Returns the end-effector poses matching [`Self::configurations`].
    #[must_use]
    pub const fn waypoints(&self) -> &CartesianWaypointPath {
        &self.waypoints
    }

    /// Returns the Cartesian distance actually covered.
    #[must_use]
    pub const fn achieved_length(&self) -> f64 {
        self.achieved_length
    }

    /// Returns the Cartesian distance requested.
    #[must_use]
    pub const fn requested_length(&self) -> f64 {
        self.requested_length
    }

    /// Returns `true` if no step could be solved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Returns `true` if the full requested distance was covered within `tolerance`.
    #[must_use]
    pub fn is_complete(&self, tolerance: f64) -> bool {
        !self.is_empty() && self.achieved_length >= self.requested_length - tolerance
    }

    /// Returns the last configuration of the path.
    #[must_use]
    pub fn last(&self) -> Option<&RobotConfiguration> {
        self.configurations.last()
    }

    fn reverse(&mut self) {
        self.configurations.reverse();
        self.waypoints.reverse();
    }
}

/// Generates validated Cartesian paths for one arm.
pub struct StraightLinePlanner<'a> {
    kinematics: &'a dyn ArmKinematics,
    validity: &'a dyn StateValidity,
    config: StraightLineConfig,
}

impl<'a> StraightLinePlanner<'a> {
    /// Creates a planner over a kinematics model and a collision oracle.
    #[must_use]
    pub fn new(
        kinematics: &'a dyn ArmKinematics,
        validity: &'a dyn StateValidity,
        config: StraightLineConfig,
    ) -> Self {
        Self {
            kinematics,
            validity,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &StraightLineConfig {
        &self.config
    }

    /// Returns the kinematics model.
    #[must_use]
    pub fn kinematics(&self) -> &'a dyn ArmKinematics {
        self.kinematics
    }

    /// Moves the end effector `distance` metres along `direction`.
    ///
    /// On success the returned path starts with `start` (or ends with it when
    /// `reverse` is set) and its achieved length may be shorter than
    /// requested; an empty path with zero length means the first step failed.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::PlanningFailed`] for a zero direction or a
    /// negative distance, and [`ManipError::DimensionMismatch`] if `start`
    /// does not fit `chain`.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_straight_line_path(
        &self,
        direction: &Vector3<f64>,
        distance: f64,
        start: &RobotConfiguration,
        chain: &KinematicChain,
        reverse: bool,
        check: CollisionCheck,
    ) -> Result<StraightLinePath> {
        let direction = Unit::try_new(*direction, 1e-9)
            .ok_or_else(|| ManipError::planning("straight-line direction has zero length"))?;
        if !distance.is_finite() || distance < 0.0 {
            return Err(ManipError::planning(format!(
                "straight-line distance must be non-negative, got {distance}"
            )));
        }
        chain.check_dimension(start.values())?;

        let start_pose = self.kinematics.forward(start)?;
        let waypoints =
            straight_line_waypoints(&start_pose, &direction, distance, self.config.resolution());
        let mut path = self.follow(&start_pose, &waypoints, start, chain, check, distance);
        if reverse {
            path.reverse();
        }
        debug!(
            side = %chain.side(),
            requested = distance,
            achieved = path.achieved_length,
            points = path.configurations.len(),
            "Computed straight-line path"
        );
        Ok(path)
    }

    /// Solves IK through arbitrary Cartesian waypoints, starting at `start`.
    ///
    /// Consecutive waypoints are interpolated (translation linearly, rotation
    /// by slerp) at the configured resolution. Achieved length is the
    /// translational distance covered along the waypoint polyline.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::DimensionMismatch`] if `start` does not fit `chain`.
    pub fn compute_waypoint_path(
        &self,
        waypoints: &CartesianWaypointPath,
        start: &RobotConfiguration,
        chain: &KinematicChain,
        check: CollisionCheck,
    ) -> Result<StraightLinePath> {
        chain.check_dimension(start.values())?;
        let start_pose = self.kinematics.forward(start)?;

        let mut dense = CartesianWaypointPath::default();
        let mut previous = start_pose;
        for target in waypoints.iter() {
            let span = (target.translation.vector - previous.translation.vector).norm();
            let steps = step_count(span, self.config.resolution());
            for i in 1..=steps {
                let t = f64::from(i) / f64::from(steps);
                dense.push(previous.lerp_slerp(target, t));
            }
            previous = *target;
        }

        let requested = std::iter::once(start_pose)
            .chain(waypoints.iter().copied())
            .collect::<CartesianWaypointPath>()
            .length();
        Ok(self.follow(&start_pose, &dense, start, chain, check, requested))
    }

    #[allow(clippy::too_many_arguments)]
    fn follow(
        &self,
        start_pose: &Isometry3<f64>,
        poses: &CartesianWaypointPath,
        start: &RobotConfiguration,
        chain: &KinematicChain,
        check: CollisionCheck,
        requested: f64,
    ) -> StraightLinePath {
        if poses.is_empty() {
            return StraightLinePath {
                configurations: vec![start.clone()],
                waypoints: CartesianWaypointPath::new(vec![*start_pose]),
                achieved_length: 0.0,
                requested_length: requested,
            };
        }

        let mut configurations = vec![start.clone()];
        let mut solved = CartesianWaypointPath::new(vec![*start_pose]);
        let mut achieved = 0.0;

        for (index, pose) in poses.iter().enumerate() {
            let seed = configurations.last().unwrap_or(start);
            let Some(solution) =
                self.kinematics
                    .inverse(chain, pose, seed, self.config.consistency_limit())
            else {
                debug!(step = index, "No consistent IK solution");
                break;
            };
            match check_state(self.validity, &solution, chain, check) {
                Validity::Valid => {}
                verdict => {
                    debug!(step = index, ?verdict, "Rejected invalid step");
                    break;
                }
            }
            if let Some(last) = solved.last() {
                achieved += (pose.translation.vector - last.translation.vector).norm();
            }
            configurations.push(solution);
            solved.push(*pose);
        }

        if configurations.len() == 1 {
            return StraightLinePath::empty(requested);
        }
        StraightLinePath {
            configurations,
            waypoints: solved,
            achieved_length: achieved,
            requested_length: requested,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kinematics::GantryKinematics;
    use crate::validity::FreeSpace;
    use approx::assert_relative_eq;
    use manip_types::ArmSide;

    fn wall_at(x: f64) -> impl StateValidity {
        move |c: &RobotConfiguration, _: &KinematicChain| {
            if c.values()[0] > x {
                Validity::Colliding {
                    links: vec!["gripper".into()],
                }
            } else {
                Validity::Valid
            }
        }
    }

    fn setup() -> (GantryKinematics, KinematicChain, RobotConfiguration) {
        (
            GantryKinematics::new(),
            GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0),
            RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]),
        )
    }

    #[test]
    fn test_full_distance_in_free_space() {
        let (gantry, chain, start) = setup();
        let planner = StraightLinePlanner::new(&gantry, &FreeSpace, StraightLineConfig::default());
        let path = planner
            .compute_straight_line_path(
                &Vector3::new(0.0, 3.0, 4.0),
                0.1,
                &start,
                &chain,
                false,
                CollisionCheck::Enforce,
            )
            .unwrap();
        assert!(path.is_complete(1e-9));
        assert_relative_eq!(path.achieved_length(), 0.1, epsilon = 1e-9);
        let last = path.last().unwrap();
        assert_relative_eq!(last.values()[1], 0.06, epsilon = 1e-9);
        assert_relative_eq!(last.values()[2], 0.08, epsilon = 1e-9);
        assert_eq!(path.configurations()[0], start);
    }

    #[test]
    fn test_stops_at_obstacle() {
        let (gantry, chain, start) = setup();
        let wall = wall_at(0.055);
        let planner = StraightLinePlanner::new(&gantry, &wall, StraightLineConfig::default());
        let path = planner
            .compute_straight_line_path(&Vector3::x(), 0.2, &start, &chain, false, CollisionCheck::Enforce)
            .unwrap();
        assert_relative_eq!(path.achieved_length(), 0.05, epsilon = 1e-9);
        assert!(!path.is_complete(1e-3));
        assert_eq!(path.configurations().len(), 6);
    }

    #[test]
    fn test_first_step_invalid_is_empty() {
        let (gantry, chain, start) = setup();
        let wall = wall_at(0.001);
        let planner = StraightLinePlanner::new(&gantry, &wall, StraightLineConfig::default());
        let path = planner
            .compute_straight_line_path(&Vector3::x(), 0.2, &start, &chain, false, CollisionCheck::Enforce)
            .unwrap();
        assert!(path.is_empty());
        assert_relative_eq!(path.achieved_length(), 0.0);
    }

    #[test]
    fn test_bypass_ignores_obstacle() {
        let (gantry, chain, start) = setup();
        let wall = wall_at(0.001);
        let planner = StraightLinePlanner::new(&gantry, &wall, StraightLineConfig::default());
        let path = planner
            .compute_straight_line_path(
                &Vector3::x(),
                0.2,
                &start,
                &chain,
                false,
                CollisionCheck::BypassForRecovery,
            )
            .unwrap();
        assert!(path.is_complete(1e-9));
    }

    #[test]
    fn test_reverse_ends_at_start() {
        let (gantry, chain, start) = setup();
        let planner = StraightLinePlanner::new(&gantry, &FreeSpace, StraightLineConfig::default());
        let path = planner
            .compute_straight_line_path(&Vector3::z(), 0.05, &start, &chain, true, CollisionCheck::Enforce)
            .unwrap();
        assert_eq!(path.last().unwrap(), &start);
        assert_relative_eq!(path.configurations()[0].values()[2], 0.05, epsilon = 1e-9);
        assert_eq!(path.waypoints().len(), path.configurations().len());
    }

    #[test]
    fn test_rejects_bad_input() {
        let (gantry, chain, start) = setup();
        let planner = StraightLinePlanner::new(&gantry, &FreeSpace, StraightLineConfig::default());
        assert!(
            planner
                .compute_straight_line_path(&Vector3::zeros(), 0.1, &start, &chain, false, CollisionCheck::Enforce)
                .is_err()
        );
        assert!(
            planner
                .compute_straight_line_path(&Vector3::x(), -0.1, &start, &chain, false, CollisionCheck::Enforce)
                .is_err()
        );
        let short = RobotConfiguration::new(ArmSide::Left, vec![0.0]);
        assert!(
            planner
                .compute_straight_line_path(&Vector3::x(), 0.1, &short, &chain, false, CollisionCheck::Enforce)
                .is_err()
        );
    }

    #[test]
    fn test_zero_distance_keeps_start() {
        let (gantry, chain, start) = setup();
        let planner = StraightLinePlanner::new(&gantry, &FreeSpace, StraightLineConfig::default());
        let path = planner
            .compute_straight_line_path(&Vector3::x(), 0.0, &start, &chain, false, CollisionCheck::Enforce)
            .unwrap();
        assert_eq!(path.configurations(), &[start]);
        assert!(path.is_complete(0.0));
    }

    #[test]
    fn test_waypoint_path_through_corner() {
        let (gantry, chain, start) = setup();
        let planner = StraightLinePlanner::new(&gantry, &FreeSpace, StraightLineConfig::default());
        let waypoints = CartesianWaypointPath::new(vec![
            Isometry3::translation(0.1, 0.0, 0.0),
            Isometry3::translation(0.1, 0.1, 0.0),
        ]);
        let path = planner
            .compute_waypoint_path(&waypoints, &start, &chain, CollisionCheck::Enforce)
            .unwrap();
        assert_relative_eq!(path.requested_length(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(path.achieved_length(), 0.2, epsilon = 1e-9);
        let last = path.last().unwrap();
        assert_relative_eq!(last.values()[0], 0.1, epsilon = 1e-9);
        assert_relative_eq!(last.values()[1], 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_step_count() {
        assert_eq!(step_count(0.3, 0.1), 3);
        assert_eq!(step_count(0.25, 0.1), 3);
        assert_eq!(step_count(0.001, 0.1), 1);
    }
}
