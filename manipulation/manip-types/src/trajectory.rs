//! Time-parameterized joint trajectories.
//!
//! A [`ConfigurationTrajectory`] can only be built through
//! [`ConfigurationTrajectory::new`], which enforces that timestamps are
//! strictly increasing and that every point has one value per joint.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::chain::ArmSide;
use crate::configuration::RobotConfiguration;
use crate::error::{ManipError, Result};

/// One point of a trajectory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryPoint {
    /// Joint positions.
    pub positions: Vec<f64>,
    /// Joint velocities at this point.
    pub velocities: Vec<f64>,
    /// Joint accelerations at this point.
    pub accelerations: Vec<f64>,
    /// Seconds since the start of the trajectory.
    pub time_from_start: f64,
}

impl TrajectoryPoint {
    /// Creates a point at rest (zero velocity and acceleration).
    #[must_use]
    pub fn at_rest(positions: Vec<f64>, time_from_start: f64) -> Self {
        let n = positions.len();
        Self {
            positions,
            velocities: vec![0.0; n],
            accelerations: vec![0.0; n],
            time_from_start,
        }
    }
}

/// An ordered sequence of configurations with per-point timing.
///
/// # Example
///
/// ```
/// use manip_types::{ArmSide, ConfigurationTrajectory, TrajectoryPoint};
///
/// let trajectory = ConfigurationTrajectory::new(
///     ArmSide::Left,
///     vec!["x".to_string()],
///     vec![
///         TrajectoryPoint::at_rest(vec![0.0], 0.0),
///         TrajectoryPoint::at_rest(vec![1.0], 2.0),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(trajectory.len(), 2);
/// assert!((trajectory.duration_secs() - 2.0).abs() < 1e-12);
///
/// // Timestamps must be strictly increasing.
/// let bad = ConfigurationTrajectory::new(
///     ArmSide::Left,
///     vec!["x".to_string()],
///     vec![
///         TrajectoryPoint::at_rest(vec![0.0], 1.0),
///         TrajectoryPoint::at_rest(vec![1.0], 1.0),
///     ],
/// );
/// assert!(bad.is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfigurationTrajectory {
    side: ArmSide,
    joint_names: Vec<String>,
    points: Vec<TrajectoryPoint>,
}

impl ConfigurationTrajectory {
    /// Creates a trajectory, validating its invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::DimensionMismatch`] if a point does not have one
    /// position/velocity/acceleration per joint, or
    /// [`ManipError::InvalidTrajectory`] if timestamps are negative,
    /// non-finite, or not strictly increasing.
    pub fn new(
        side: ArmSide,
        joint_names: Vec<String>,
        points: Vec<TrajectoryPoint>,
    ) -> Result<Self> {
        let dof = joint_names.len();
        for point in &points {
            for len in [
                point.positions.len(),
                point.velocities.len(),
                point.accelerations.len(),
            ] {
                if len != dof {
                    return Err(ManipError::dimension_mismatch(dof, len));
                }
            }
            if !point.time_from_start.is_finite() || point.time_from_start < 0.0 {
                return Err(ManipError::invalid_trajectory(format!(
                    "time_from_start {} is not a finite non-negative value",
                    point.time_from_start
                )));
            }
        }
        if let Some(index) = points
            .windows(2)
            .position(|w| w[1].time_from_start <= w[0].time_from_start)
        {
            return Err(ManipError::invalid_trajectory(format!(
                "timestamps not strictly increasing at point {}",
                index + 1
            )));
        }
        Ok(Self {
            side,
            joint_names,
            points,
        })
    }

    /// Returns which arm this trajectory drives.
    #[must_use]
    pub const fn side(&self) -> ArmSide {
        self.side
    }

    /// Returns the joint names, one per column.
    #[must_use]
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// Returns the trajectory points.
    #[must_use]
    pub fn points(&self) -> &[TrajectoryPoint] {
        &self.points
    }

    /// Returns the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the trajectory has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the time of the last point in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time_from_start)
    }

    /// Returns the duration as a [`Duration`].
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs())
    }

    /// Returns the configuration at a point index.
    #[must_use]
    pub fn configuration(&self, index: usize) -> Option<RobotConfiguration> {
        self.points
            .get(index)
            .map(|p| RobotConfiguration::new(self.side, p.positions.clone()))
    }

    /// Returns the first configuration.
    #[must_use]
    pub fn first_configuration(&self) -> Option<RobotConfiguration> {
        self.configuration(0)
    }

    /// Returns the final configuration.
    #[must_use]
    pub fn last_configuration(&self) -> Option<RobotConfiguration> {
        self.len()
            .checked_sub(1)
            .and_then(|index| self.configuration(index))
    }

    /// Returns every configuration in order.
    pub fn configurations(&self) -> impl Iterator<Item = RobotConfiguration> + '_ {
        self.points
            .iter()
            .map(|p| RobotConfiguration::new(self.side, p.positions.clone()))
    }

    /// Returns the points `start..=end` as a new trajectory whose first point
    /// is at time zero.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidTrajectory`] if the range is empty or out
    /// of bounds.
    pub fn segment(&self, start: usize, end: usize) -> Result<Self> {
        if start > end || end >= self.points.len() {
            return Err(ManipError::invalid_trajectory(format!(
                "segment {start}..={end} out of range for {} points",
                self.points.len()
            )));
        }
        let offset = self.points[start].time_from_start;
        let points = self.points[start..=end]
            .iter()
            .map(|p| TrajectoryPoint {
                time_from_start: p.time_from_start - offset,
                ..p.clone()
            })
            .collect();
        Ok(Self {
            side: self.side,
            joint_names: self.joint_names.clone(),
            points,
        })
    }
}
