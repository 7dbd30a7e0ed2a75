//! Trajectory execution and closed-loop insertion for dual-arm manipulation.
//!
//! This crate is the only place that commands motion. Everything it
//! dispatches has been time-parameterized by `manip-motion` and re-checked
//! for validity, unless the caller explicitly bypasses collision checking for
//! a recovery motion.
//!
//! # Overview
//!
//! - **Controller seam** ([`ControllerClient`]): dispatch a command, receive
//!   its final status on a channel
//! - **Execution engine** ([`ExecutionEngine`]): validity re-check, segmented
//!   dispatch with stop checkpoints, timeouts, gripper commands, recording
//! - **Stop signal** ([`StopSignal`]): operator cancellation honored at
//!   segment boundaries
//! - **Simulated controller** ([`SimulatedController`]): in-process
//!   completion with optional scripted responses
//! - **Tactile slot** ([`tactile_channel`]): single-writer single-reader
//!   latest-sample cell
//! - **Insertion** ([`InsertionController`]): shear-corrected insertion loop
//!
//! # Example
//!
//! ```
//! use manip_exec::{ExecutionEngine, SimulatedController};
//! use manip_motion::{FreeSpace, GantryKinematics};
//! use manip_types::{ArmSide, ExecutionConfig, RobotConfiguration};
//!
//! let chain = GantryKinematics::chain(ArmSide::Left, 1.0, 0.5, 1.0);
//! let home = RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]);
//! let controller = SimulatedController::new().with_state(home);
//! let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
//!
//! let goal = RobotConfiguration::new(ArmSide::Left, vec![0.2, 0.1, 0.0, 0.0]);
//! let outcome = engine.execute_state(&goal, &chain, 0.5);
//! assert!(outcome.is_success());
//! ```

#![doc(html_root_url = "https://docs.rs/manip-exec/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod controller;
pub mod engine;
pub mod insertion;
pub mod simulated;
pub mod stop;
pub mod tactile;

// Re-export main types for convenience
pub use controller::{ControllerClient, ControllerStatus, GripperCommand, MotionCommand};
pub use engine::ExecutionEngine;
pub use insertion::{InsertionController, InsertionReport, InsertionState};
pub use simulated::{Callback, SimulatedController, StatusScript};
pub use stop::StopSignal;
pub use tactile::{TactileReader, TactileSensor, TactileWriter, tactile_channel};
