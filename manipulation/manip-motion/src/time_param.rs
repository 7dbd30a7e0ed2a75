//! Time parameterization of configuration sequences.
//!
//! [`TrajectoryConverter::to_trajectory`] assigns a duration to every segment
//! between consecutive configurations so that no joint exceeds its velocity or
//! acceleration limit (both scaled by the caller's velocity scale).
//!
//! # Algorithm
//!
//! 1. Each segment starts at the shortest duration that keeps every joint's
//!    segment velocity within its limit (never below the configured minimum).
//! 2. Point velocities are zero at both ends and the mean of the adjacent
//!    segment velocities in between. Point accelerations are the change in
//!    segment velocity over the mean of the adjacent durations, with the
//!    trajectory treated as starting and ending at rest.
//! 3. Points that still violate a limit stretch their two adjacent segments by
//!    the violation ratio (square root for acceleration), iterating up to
//!    `max_iterations` times.
//! 4. A final uniform stretch removes any residual violation, so the output
//!    is always within limits.
//!
//! The procedure is deterministic: the same input and scale always yield the
//! same timing.

use manip_types::{
    CartesianWaypointPath, ConfigurationTrajectory, KinematicChain, ManipError, RobotConfiguration,
    Result, TrajectoryConfig, TrajectoryPoint,
};
use tracing::debug;

use crate::validity::{CollisionCheck, StateValidity, Validity, check_state};

/// Converts validated configuration sequences into timed trajectories.
///
/// # Example
///
/// ```
/// use manip_motion::{CollisionCheck, FreeSpace, GantryKinematics, TrajectoryConverter};
/// use manip_types::{ArmSide, RobotConfiguration, TrajectoryConfig};
///
/// let chain = GantryKinematics::chain(ArmSide::Right, 1.0, 0.5, 1.0);
/// let path = vec![
///     RobotConfiguration::new(ArmSide::Right, vec![0.0, 0.0, 0.0, 0.0]),
///     RobotConfiguration::new(ArmSide::Right, vec![0.2, 0.0, 0.0, 0.0]),
/// ];
///
/// let converter = TrajectoryConverter::new(TrajectoryConfig::default());
/// let trajectory = converter
///     .to_trajectory(&path, &chain, 1.0, true, &FreeSpace, CollisionCheck::Enforce)
///     .unwrap();
///
/// assert!(trajectory.len() > 2); // densified
/// assert!(trajectory.duration_secs() >= 0.2 / 0.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TrajectoryConverter {
    config: TrajectoryConfig,
}

struct Limits {
    velocity: Vec<f64>,
    acceleration: Vec<f64>,
}

struct Timing {
    velocities: Vec<Vec<f64>>,
    accelerations: Vec<Vec<f64>>,
}

impl TrajectoryConverter {
    /// Creates a converter.
    #[must_use]
    pub const fn new(config: TrajectoryConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &TrajectoryConfig {
        &self.config
    }

    /// Time-parameterizes `configurations` for `chain`.
    ///
    /// With `densify` set, intermediate configurations are inserted so no two
    /// consecutive points differ by more than
    /// [`TrajectoryConfig::max_densify_step`] on any joint. Every output point
    /// is re-checked with [`check_state`].
    ///
    /// # Errors
    ///
    /// - [`ManipError::PlanningFailed`] if the sequence is empty or an output
    ///   point is out of bounds
    /// - [`ManipError::CollisionDetected`] if an output point collides
    /// - [`ManipError::InvalidConfig`] if the converter's settings are invalid,
    ///   the velocity scale is outside `(0, 1]`, or a joint has a zero
    ///   velocity or acceleration limit
    /// - [`ManipError::DimensionMismatch`] if a configuration does not fit `chain`
    #[allow(clippy::too_many_arguments)]
    pub fn to_trajectory(
        &self,
        configurations: &[RobotConfiguration],
        chain: &KinematicChain,
        velocity_scale: f64,
        densify: bool,
        validity: &dyn StateValidity,
        check: CollisionCheck,
    ) -> Result<ConfigurationTrajectory> {
        self.config.validate()?;
        if configurations.is_empty() {
            return Err(ManipError::planning("cannot time-parameterize an empty path"));
        }
        if !velocity_scale.is_finite() || velocity_scale <= 0.0 || velocity_scale > 1.0 {
            return Err(ManipError::invalid_config(format!(
                "velocity_scale must be in (0, 1], got {velocity_scale}"
            )));
        }
        for configuration in configurations {
            chain.check_dimension(configuration.values())?;
            if configuration.side() != chain.side() {
                return Err(ManipError::planning(format!(
                    "configuration for {} given to {} chain",
                    configuration.side(),
                    chain.side()
                )));
            }
        }
        let limits = Self::limits(chain, velocity_scale)?;

        let positions: Vec<Vec<f64>> = if densify {
            self.densify(configurations)
        } else {
            configurations.iter().map(|c| c.values().to_vec()).collect()
        };

        for values in &positions {
            let state = RobotConfiguration::new(chain.side(), values.clone());
            match check_state(validity, &state, chain, check) {
                Validity::Valid => {}
                verdict => {
                    debug!(?verdict, "Trajectory point failed validity check");
                    return Err(match verdict.into_result() {
                        Err(error) => error,
                        Ok(()) => ManipError::planning("trajectory point rejected"),
                    });
                }
            }
        }

        let durations = self.parameterize(&positions, &limits);
        let timing = Self::timing(&positions, &durations);

        let mut time = 0.0;
        let mut points = Vec::with_capacity(positions.len());
        for (index, values) in positions.into_iter().enumerate() {
            if index > 0 {
                time += durations[index - 1];
            }
            points.push(TrajectoryPoint {
                positions: values,
                velocities: timing.velocities[index].clone(),
                accelerations: timing.accelerations[index].clone(),
                time_from_start: time,
            });
        }

        let names = chain.joint_names().map(str::to_string).collect();
        let trajectory = ConfigurationTrajectory::new(chain.side(), names, points)?;
        debug!(
            side = %chain.side(),
            points = trajectory.len(),
            duration = trajectory.duration_secs(),
            "Time-parameterized trajectory"
        );
        Ok(trajectory)
    }

    /// Time-parameterizes a straight move from `start` to `goal`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::to_trajectory`].
    #[allow(clippy::too_many_arguments)]
    pub fn to_direct_trajectory(
        &self,
        start: &RobotConfiguration,
        goal: &RobotConfiguration,
        chain: &KinematicChain,
        velocity_scale: f64,
        validity: &dyn StateValidity,
        check: CollisionCheck,
    ) -> Result<ConfigurationTrajectory> {
        self.to_trajectory(
            &[start.clone(), goal.clone()],
            chain,
            velocity_scale,
            true,
            validity,
            check,
        )
    }

    fn limits(chain: &KinematicChain, velocity_scale: f64) -> Result<Limits> {
        let mut velocity = Vec::with_capacity(chain.dof());
        let mut acceleration = Vec::with_capacity(chain.dof());
        for joint in chain.joints() {
            if joint.max_velocity() <= 0.0 || joint.max_acceleration() <= 0.0 {
                return Err(ManipError::invalid_config(format!(
                    "joint {} needs positive velocity and acceleration limits",
                    joint.name()
                )));
            }
            velocity.push(joint.max_velocity() * velocity_scale);
            acceleration.push(joint.max_acceleration() * velocity_scale);
        }
        Ok(Limits {
            velocity,
            acceleration,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn densify(&self, configurations: &[RobotConfiguration]) -> Vec<Vec<f64>> {
        let max_step = self.config.max_densify_step();
        let mut out = Vec::with_capacity(configurations.len());
        out.push(configurations[0].values().to_vec());
        for pair in configurations.windows(2) {
            let diff = pair[0].max_joint_distance(&pair[1]);
            let pieces = ((diff / max_step) - 1e-9).ceil().max(1.0) as u32;
            for i in 1..=pieces {
                let t = f64::from(i) / f64::from(pieces);
                out.push(pair[0].interpolate(&pair[1], t).values().to_vec());
            }
        }
        out
    }

    fn parameterize(&self, positions: &[Vec<f64>], limits: &Limits) -> Vec<f64> {
        let min_dt = self.config.min_segment_duration();
        let mut durations: Vec<f64> = positions
            .windows(2)
            .map(|w| {
                w[0].iter()
                    .zip(&w[1])
                    .zip(&limits.velocity)
                    .map(|((a, b), vmax)| (b - a).abs() / vmax)
                    .fold(min_dt, f64::max)
            })
            .collect();
        if durations.is_empty() {
            return durations;
        }

        for _ in 0..self.config.max_iterations() {
            let timing = Self::timing(positions, &durations);
            let mut stretched = false;
            for index in 0..positions.len() {
                let ratio = violation(&timing, index, limits);
                if ratio > 1.0 + 1e-12 {
                    if index > 0 {
                        durations[index - 1] *= ratio;
                    }
                    if index < durations.len() {
                        durations[index] *= ratio;
                    }
                    stretched = true;
                }
            }
            if !stretched {
                return durations;
            }
        }

        let timing = Self::timing(positions, &durations);
        let worst = (0..positions.len())
            .map(|index| violation(&timing, index, limits))
            .fold(1.0, f64::max);
        if worst > 1.0 {
            debug!(factor = worst, "Uniformly stretching trajectory timing");
            let factor = worst * (1.0 + 1e-9);
            for duration in &mut durations {
                *duration *= factor;
            }
        }
        durations
    }

    fn timing(positions: &[Vec<f64>], durations: &[f64]) -> Timing {
        let n = positions.len();
        let dof = positions.first().map_or(0, Vec::len);
        let segment_velocity: Vec<Vec<f64>> = positions
            .windows(2)
            .zip(durations)
            .map(|(w, dt)| w[0].iter().zip(&w[1]).map(|(a, b)| (b - a) / dt).collect())
            .collect();

        let mut velocities = vec![vec![0.0; dof]; n];
        let mut accelerations = vec![vec![0.0; dof]; n];
        if n < 2 {
            return Timing {
                velocities,
                accelerations,
            };
        }
        let zero = vec![0.0; dof];
        for k in 0..n {
            let before = if k > 0 { &segment_velocity[k - 1] } else { &zero };
            let after = if k < n - 1 { &segment_velocity[k] } else { &zero };
            let dt_before = if k > 0 { durations[k - 1] } else { 0.0 };
            let dt_after = if k < n - 1 { durations[k] } else { 0.0 };
            let span = 0.5 * (dt_before + dt_after);
            for j in 0..dof {
                if k > 0 && k < n - 1 {
                    velocities[k][j] = 0.5 * (before[j] + after[j]);
                }
                accelerations[k][j] = (after[j] - before[j]) / span;
            }
        }
        Timing {
            velocities,
            accelerations,
        }
    }
}

/// How far point `index` exceeds its limits, as a time-stretch factor.
fn violation(timing: &Timing, index: usize, limits: &Limits) -> f64 {
    let velocity = timing.velocities[index]
        .iter()
        .zip(&limits.velocity)
        .map(|(v, max)| v.abs() / max);
    let acceleration = timing.accelerations[index]
        .iter()
        .zip(&limits.acceleration)
        .map(|(a, max)| (a.abs() / max).sqrt());
    velocity.chain(acceleration).fold(1.0, f64::max)
}

/// Returns the end-effector poses of a trajectory, for logging and recording.
///
/// # Errors
///
/// Returns the first forward-kinematics error.
pub fn trajectory_poses(
    trajectory: &ConfigurationTrajectory,
    kinematics: &dyn crate::kinematics::ArmKinematics,
) -> Result<CartesianWaypointPath> {
    trajectory
        .configurations()
        .map(|c| kinematics.forward(&c))
        .collect::<Result<Vec<_>>>()
        .map(CartesianWaypointPath::new)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kinematics::GantryKinematics;
    use crate::validity::FreeSpace;
    use approx::assert_relative_eq;
    use manip_types::{ArmSide, JointLimits, JointSpec};

    fn chain() -> KinematicChain {
        KinematicChain::new(
            ArmSide::Left,
            vec![
                JointSpec::new("a", JointLimits::symmetric(10.0), 1.0, 2.0),
                JointSpec::new("b", JointLimits::symmetric(10.0), 0.5, 1.0),
            ],
        )
    }

    fn config(a: f64, b: f64) -> RobotConfiguration {
        RobotConfiguration::new(ArmSide::Left, vec![a, b])
    }

    fn within_limits(trajectory: &ConfigurationTrajectory, chain: &KinematicChain, scale: f64) -> bool {
        trajectory.points().iter().all(|p| {
            chain.joints().iter().enumerate().all(|(j, joint)| {
                p.velocities[j].abs() <= joint.max_velocity() * scale + 1e-9
                    && p.accelerations[j].abs() <= joint.max_acceleration() * scale + 1e-9
            })
        })
    }

    #[test]
    fn test_rejects_empty_and_bad_scale() {
        let converter = TrajectoryConverter::default();
        let chain = chain();
        assert!(
            converter
                .to_trajectory(&[], &chain, 1.0, false, &FreeSpace, CollisionCheck::Enforce)
                .is_err()
        );
        let path = [config(0.0, 0.0), config(1.0, 0.0)];
        for scale in [0.0, 1.5, f64::NAN] {
            assert!(
                converter
                    .to_trajectory(&path, &chain, scale, false, &FreeSpace, CollisionCheck::Enforce)
                    .is_err()
            );
        }
    }

    #[test]
    fn test_single_point() {
        let converter = TrajectoryConverter::default();
        let trajectory = converter
            .to_trajectory(&[config(0.1, 0.2)], &chain(), 1.0, true, &FreeSpace, CollisionCheck::Enforce)
            .unwrap();
        assert_eq!(trajectory.len(), 1);
        assert_relative_eq!(trajectory.duration_secs(), 0.0);
    }

    #[test]
    fn test_limits_hold() {
        let converter = TrajectoryConverter::default();
        let chain = chain();
        let path = [
            config(0.0, 0.0),
            config(0.5, 0.1),
            config(1.5, -0.4),
            config(1.6, 0.3),
        ];
        for scale in [1.0, 0.5, 0.1] {
            let trajectory = converter
                .to_trajectory(&path, &chain, scale, false, &FreeSpace, CollisionCheck::Enforce)
                .unwrap();
            assert!(within_limits(&trajectory, &chain, scale));
            assert!(
                trajectory
                    .points()
                    .windows(2)
                    .all(|w| w[1].time_from_start > w[0].time_from_start)
            );
        }
    }

    #[test]
    fn test_slower_scale_takes_longer() {
        let converter = TrajectoryConverter::default();
        let chain = chain();
        let path = [config(0.0, 0.0), config(1.0, 1.0)];
        let fast = converter
            .to_trajectory(&path, &chain, 1.0, true, &FreeSpace, CollisionCheck::Enforce)
            .unwrap();
        let slow = converter
            .to_trajectory(&path, &chain, 0.25, true, &FreeSpace, CollisionCheck::Enforce)
            .unwrap();
        assert!(slow.duration_secs() > fast.duration_secs());
    }

    #[test]
    fn test_densify_bounds_step() {
        let converter =
            TrajectoryConverter::new(TrajectoryConfig::default().with_max_densify_step(0.1));
        let trajectory = converter
            .to_trajectory(
                &[config(0.0, 0.0), config(0.35, 0.0)],
                &chain(),
                1.0,
                true,
                &FreeSpace,
                CollisionCheck::Enforce,
            )
            .unwrap();
        assert_eq!(trajectory.len(), 5);
        let configs: Vec<_> = trajectory.configurations().collect();
        assert!(configs.windows(2).all(|w| w[0].max_joint_distance(&w[1]) <= 0.1 + 1e-12));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let path = [config(0.0, 0.0), config(0.35, 0.0)];
        for step in [0.0, -0.1, f64::NAN] {
            let converter =
                TrajectoryConverter::new(TrajectoryConfig::default().with_max_densify_step(step));
            let result =
                converter.to_trajectory(&path, &chain(), 1.0, true, &FreeSpace, CollisionCheck::Enforce);
            assert!(matches!(result, Err(ManipError::InvalidConfig(_))));
        }
        let converter =
            TrajectoryConverter::new(TrajectoryConfig::default().with_min_segment_duration(0.0));
        let result =
            converter.to_trajectory(&path, &chain(), 1.0, false, &FreeSpace, CollisionCheck::Enforce);
        assert!(matches!(result, Err(ManipError::InvalidConfig(_))));
    }

    #[test]
    fn test_densified_point_must_be_valid() {
        let converter =
            TrajectoryConverter::new(TrajectoryConfig::default().with_max_densify_step(0.1));
        let oracle = |c: &RobotConfiguration, _: &KinematicChain| {
            if (c.values()[0] - 0.5).abs() < 0.05 {
                Validity::Colliding {
                    links: vec!["forearm".into()],
                }
            } else {
                Validity::Valid
            }
        };
        let path = [config(0.0, 0.0), config(1.0, 0.0)];
        let result =
            converter.to_trajectory(&path, &chain(), 1.0, true, &oracle, CollisionCheck::Enforce);
        assert!(result.is_err_and(|e| e.is_collision()));

        // Sparse endpoints alone are valid.
        let result =
            converter.to_trajectory(&path, &chain(), 1.0, false, &oracle, CollisionCheck::Enforce);
        assert!(result.is_ok());
    }

    #[test]
    fn test_idempotent() {
        let converter = TrajectoryConverter::default();
        let chain = chain();
        let path = [config(0.0, 0.0), config(0.3, 0.2), config(0.9, -0.1)];
        let a = converter
            .to_trajectory(&path, &chain, 0.7, true, &FreeSpace, CollisionCheck::Enforce)
            .unwrap();
        let b = converter
            .to_trajectory(&path, &chain, 0.7, true, &FreeSpace, CollisionCheck::Enforce)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_side_mismatch() {
        let converter = TrajectoryConverter::default();
        let path = [RobotConfiguration::new(ArmSide::Right, vec![0.0, 0.0])];
        assert!(
            converter
                .to_trajectory(&path, &chain(), 1.0, false, &FreeSpace, CollisionCheck::Enforce)
                .is_err()
        );
    }

    #[test]
    fn test_trajectory_poses() {
        let converter = TrajectoryConverter::default();
        let chain = GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0);
        let path = [
            RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]),
            RobotConfiguration::new(ArmSide::Left, vec![0.1, 0.0, 0.0, 0.0]),
        ];
        let trajectory = converter
            .to_trajectory(&path, &chain, 1.0, false, &FreeSpace, CollisionCheck::Enforce)
            .unwrap();
        let poses = trajectory_poses(&trajectory, &GantryKinematics::new()).unwrap();
        assert_relative_eq!(poses.length(), 0.1, epsilon = 1e-12);
    }
}
