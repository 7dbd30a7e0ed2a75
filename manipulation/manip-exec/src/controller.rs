//! The low-level controller seam.
//!
//! Controllers accept a command and report how it ended on a channel. The
//! execution engine is the only caller; it owns the wait and the timeout, so a
//! controller never blocks inside [`ControllerClient::dispatch`].

use std::sync::mpsc::Receiver;

use manip_types::{ArmSide, ConfigurationTrajectory, GripperPosture, RobotConfiguration, Result};

/// A discrete gripper command.
#[derive(Debug, Clone, PartialEq)]
pub enum GripperCommand {
    /// Open the fingers fully.
    Open,
    /// Close the fingers to a posture.
    Close(GripperPosture),
}

/// Something a controller can be asked to do.
#[derive(Debug, Clone, Copy)]
pub enum MotionCommand<'a> {
    /// Follow a timed joint trajectory.
    Trajectory(&'a ConfigurationTrajectory),
    /// Actuate one arm's gripper.
    Gripper {
        /// Which arm's gripper.
        side: ArmSide,
        /// What to do.
        command: &'a GripperCommand,
    },
}

impl MotionCommand<'_> {
    /// Returns the arm the command addresses.
    #[must_use]
    pub fn side(&self) -> ArmSide {
        match self {
            Self::Trajectory(trajectory) => trajectory.side(),
            Self::Gripper { side, .. } => *side,
        }
    }
}

/// How a dispatched command ended, as reported by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerStatus {
    /// The command finished.
    Completed,
    /// The command was preempted (cancelled or superseded).
    Preempted,
    /// The controller rejected or failed the command.
    Failed {
        /// Controller-specific code.
        code: i32,
        /// Human-readable reason.
        message: String,
    },
    /// The controller stopped on contact.
    Collision {
        /// Links reported in contact.
        links: Vec<String>,
    },
}

/// A connection to the robot's joint and gripper controllers.
pub trait ControllerClient: Send + Sync {
    /// Starts a command and returns the channel its final status arrives on.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be sent at all.
    fn dispatch(&self, command: MotionCommand<'_>) -> Result<Receiver<ControllerStatus>>;

    /// Asks the controller to stop whatever `side` is doing.
    fn cancel(&self, side: ArmSide);

    /// Returns the measured joint configuration of an arm, if known.
    fn current_state(&self, side: ArmSide) -> Option<RobotConfiguration>;
}
