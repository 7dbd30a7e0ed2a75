//! Core types for dual-arm pick-and-place manipulation.
//!
//! This crate is the bottom layer of the manipulation workspace. It holds the
//! data model every other layer exchanges, and nothing here talks to hardware
//! or runs an algorithm.
//!
//! # Overview
//!
//! - **Robot model**: the fixed set of arms ([`ArmSide`]), their joints
//!   ([`JointSpec`], [`JointLimits`]) and chains ([`KinematicChain`], [`RobotModel`])
//! - **Motion data**: joint configurations ([`RobotConfiguration`]), Cartesian
//!   waypoint paths ([`CartesianWaypointPath`]) and timed trajectories
//!   ([`ConfigurationTrajectory`])
//! - **Task data**: grasp candidates ([`GraspCandidate`]) and work orders ([`WorkOrder`])
//! - **Results**: the outcome taxonomy ([`ExecutionOutcome`], [`OutcomeKind`])
//!   and the error type ([`ManipError`])
//! - **Sensing**: decoded tactile frames ([`TactileSample`])
//! - **Configuration**: builder configs for every layer ([`ManipulationConfig`])
//!
//! # Example
//!
//! ```
//! use manip_types::{
//!     ArmSide, JointLimits, JointSpec, KinematicChain, RobotConfiguration, RobotModel,
//! };
//!
//! let chain = KinematicChain::new(
//!     ArmSide::Left,
//!     vec![
//!         JointSpec::new("left_x", JointLimits::new(-1.0, 1.0), 0.5, 1.0),
//!         JointSpec::new("left_z", JointLimits::new(0.0, 2.0), 0.5, 1.0),
//!     ],
//! );
//! let robot = RobotModel::new().with_chain(chain);
//!
//! let chain = robot.require_chain(ArmSide::Left).unwrap();
//! let home = RobotConfiguration::for_chain(chain, vec![0.0, 1.0]).unwrap();
//! assert!(chain.within_bounds(home.values()));
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enables serialization/deserialization for all types

#![doc(html_root_url = "https://docs.rs/manip-types/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod chain;
pub mod config;
pub mod configuration;
pub mod error;
pub mod grasp;
pub mod order;
pub mod outcome;
pub mod tactile;
pub mod trajectory;
pub mod waypoint;

// Re-export main types at crate root for convenience
pub use chain::{ArmSide, JointLimits, JointSpec, KinematicChain, RobotModel};
pub use config::{
    ExecutionConfig, InsertionConfig, ManipulationConfig, MotionPolicy, OrchestratorConfig,
    StraightLineConfig, TrajectoryConfig,
};
pub use configuration::RobotConfiguration;
pub use error::{ManipError, Result};
pub use grasp::{GraspCandidate, GripperPosture};
pub use order::WorkOrder;
pub use outcome::{Diagnostic, ExecutionOutcome, OutcomeKind};
pub use tactile::{PAD_HEIGHT_M, PAD_WIDTH_M, TactileChannel, TactileSample};
pub use trajectory::{ConfigurationTrajectory, TrajectoryPoint};
pub use waypoint::CartesianWaypointPath;
