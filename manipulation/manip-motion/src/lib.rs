//! Motion generation for dual-arm manipulation.
//!
//! This crate turns Cartesian intent into validated, timed joint trajectories.
//! It never commands hardware; execution lives in `manip-exec`.
//!
//! # Overview
//!
//! - **Kinematics** ([`ArmKinematics`]): the forward/inverse kinematics seam,
//!   with a closed-form reference model ([`GantryKinematics`])
//! - **Validity** ([`StateValidity`], [`check_state`]): joint-bound and
//!   collision filtering, with explicit [`CollisionCheck::BypassForRecovery`]
//! - **Path generation** ([`StraightLinePlanner`]): straight-line and
//!   waypoint Cartesian paths solved step by step with seeded IK
//! - **Time parameterization** ([`TrajectoryConverter`]): per-segment timing
//!   within joint velocity/acceleration limits, with optional densification
//! - **Arm selection** ([`ArmSelector`]): which arm services a target
//! - **Playback files** ([`save_playback`], [`load_playback`]): tabular
//!   trajectory persistence
//!
//! # Example
//!
//! ```
//! use manip_motion::{
//!     CollisionCheck, FreeSpace, GantryKinematics, StraightLinePlanner, TrajectoryConverter,
//! };
//! use manip_types::{ArmSide, RobotConfiguration, StraightLineConfig, TrajectoryConfig};
//! use nalgebra::Vector3;
//!
//! let gantry = GantryKinematics::new();
//! let chain = GantryKinematics::chain(ArmSide::Left, 1.0, 0.5, 1.0);
//! let start = RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]);
//!
//! // Approach 10 cm along +x.
//! let planner = StraightLinePlanner::new(&gantry, &FreeSpace, StraightLineConfig::default());
//! let path = planner
//!     .compute_straight_line_path(&Vector3::x(), 0.1, &start, &chain, false, CollisionCheck::Enforce)
//!     .unwrap();
//! assert!(path.is_complete(1e-9));
//!
//! // Time it at half speed.
//! let converter = TrajectoryConverter::new(TrajectoryConfig::default());
//! let trajectory = converter
//!     .to_trajectory(path.configurations(), &chain, 0.5, false, &FreeSpace, CollisionCheck::Enforce)
//!     .unwrap();
//! assert_eq!(trajectory.len(), path.configurations().len());
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for [`ArmSelector`]

#![doc(html_root_url = "https://docs.rs/manip-motion/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod arm_select;
pub mod kinematics;
pub mod playback;
pub mod straight_line;
pub mod time_param;
pub mod validity;

// Re-export main types for convenience
pub use arm_select::ArmSelector;
pub use kinematics::{ArmKinematics, GANTRY_JOINTS, GantryKinematics};
pub use playback::{load_playback, read_playback, save_playback, write_playback};
pub use straight_line::{
    StraightLinePath, StraightLinePlanner, project_pose, straight_line_waypoints,
};
pub use time_param::{TrajectoryConverter, trajectory_poses};
pub use validity::{CollisionCheck, FreeSpace, StateValidity, Validity, check_state};
