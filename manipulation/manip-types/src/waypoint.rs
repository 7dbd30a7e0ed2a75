//! Cartesian end-effector waypoint paths.
//!
//! # Example
//!
//! ```
//! use manip_types::CartesianWaypointPath;
//! use nalgebra::{Isometry3, Vector3};
//!
//! let path = CartesianWaypointPath::new(vec![
//!     Isometry3::translation(0.0, 0.0, 0.0),
//!     Isometry3::translation(0.1, 0.0, 0.0),
//!     Isometry3::translation(0.1, 0.0, 0.2),
//! ]);
//!
//! assert_eq!(path.len(), 3);
//! assert!((path.length() - 0.3).abs() < 1e-12);
//! ```

use nalgebra::Isometry3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An ordered sequence of end-effector poses in the world frame.
///
/// Produced by the path generator and consumed once by IK search.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CartesianWaypointPath {
    poses: Vec<Isometry3<f64>>,
}

impl CartesianWaypointPath {
    /// Creates a path from world-frame poses.
    #[must_use]
    pub const fn new(poses: Vec<Isometry3<f64>>) -> Self {
        Self { poses }
    }

    /// Returns the number of waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Returns `true` if the path has no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Returns the poses in order.
    #[must_use]
    pub fn poses(&self) -> &[Isometry3<f64>] {
        &self.poses
    }

    /// Returns the first pose.
    #[must_use]
    pub fn first(&self) -> Option<&Isometry3<f64>> {
        self.poses.first()
    }

    /// Returns the last pose.
    #[must_use]
    pub fn last(&self) -> Option<&Isometry3<f64>> {
        self.poses.last()
    }

    /// Returns an iterator over the poses.
    pub fn iter(&self) -> impl Iterator<Item = &Isometry3<f64>> {
        self.poses.iter()
    }

    /// Total translational length of the path.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.poses
            .windows(2)
            .map(|w| (w[1].translation.vector - w[0].translation.vector).norm())
            .sum()
    }

    /// Reverses the path in place.
    pub fn reverse(&mut self) {
        self.poses.reverse();
    }

    /// Returns a reversed copy of the path.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut copy = self.clone();
        copy.reverse();
        copy
    }

    /// Appends a pose.
    pub fn push(&mut self, pose: Isometry3<f64>) {
        self.poses.push(pose);
    }
}

impl FromIterator<Isometry3<f64>> for CartesianWaypointPath {
    fn from_iter<I: IntoIterator<Item = Isometry3<f64>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for CartesianWaypointPath {
    type Item = Isometry3<f64>;
    type IntoIter = std::vec::IntoIter<Isometry3<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.into_iter()
    }
}
