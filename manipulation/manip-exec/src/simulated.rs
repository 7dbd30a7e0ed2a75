//! An in-process controller for tests and dry runs.
//!
//! [`SimulatedController`] answers every command immediately. By default it
//! reports [`ControllerStatus::Completed`] and moves the arm to the last
//! point of the trajectory. A script can override the status per command, or
//! return `None` to stay silent so the engine's timeout fires. Cancelling an
//! arm preempts its silent commands.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use manip_types::{ArmSide, RobotConfiguration, Result};
use tracing::trace;

use crate::controller::{ControllerClient, ControllerStatus, MotionCommand};

/// Thread-safe callback wrapper that implements Debug.
pub struct Callback<F: ?Sized>(pub Arc<F>);

impl<F: ?Sized> Clone for Callback<F> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<F: ?Sized> fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(<fn>)")
    }
}

/// Decides how a command ends. `None` means the controller never answers.
pub type StatusScript = Callback<dyn Fn(&MotionCommand<'_>) -> Option<ControllerStatus> + Send + Sync>;

#[derive(Debug, Default)]
struct ArmStates {
    left: Option<RobotConfiguration>,
    right: Option<RobotConfiguration>,
}

impl ArmStates {
    fn get_mut(&mut self, side: ArmSide) -> &mut Option<RobotConfiguration> {
        match side {
            ArmSide::Left => &mut self.left,
            ArmSide::Right => &mut self.right,
        }
    }
}

/// A controller that completes commands in-process.
///
/// # Example
///
/// ```
/// use manip_exec::{ControllerClient, ControllerStatus, SimulatedController};
/// use manip_types::{ArmSide, RobotConfiguration};
///
/// let home = RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]);
/// let controller = SimulatedController::new()
///     .with_state(home.clone())
///     .with_script(|_| Some(ControllerStatus::Preempted));
///
/// assert_eq!(controller.current_state(ArmSide::Left), Some(home));
/// assert_eq!(controller.dispatch_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct SimulatedController {
    script: Option<StatusScript>,
    states: Mutex<ArmStates>,
    silent: Mutex<Vec<(ArmSide, Sender<ControllerStatus>)>>,
    dispatched: AtomicUsize,
    cancelled: AtomicUsize,
}

impl SimulatedController {
    /// Creates a controller that completes everything and knows no arm state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the measured state of the configuration's arm.
    #[must_use]
    pub fn with_state(self, configuration: RobotConfiguration) -> Self {
        self.set_state(configuration);
        self
    }

    /// Installs a status script.
    #[must_use]
    pub fn with_script<F>(mut self, script: F) -> Self
    where
        F: Fn(&MotionCommand<'_>) -> Option<ControllerStatus> + Send + Sync + 'static,
    {
        self.script = Some(Callback(Arc::new(script)));
        self
    }

    /// Overwrites the measured state of the configuration's arm.
    pub fn set_state(&self, configuration: RobotConfiguration) {
        let side = configuration.side();
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        *states.get_mut(side) = Some(configuration);
    }

    /// Number of commands dispatched so far.
    #[must_use]
    pub fn dispatch_count(&self) -> usize {
        self.dispatched.load(Ordering::SeqCst)
    }

    /// Number of cancel requests received so far.
    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Number of commands still waiting for a status.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.silent.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ControllerClient for SimulatedController {
    fn dispatch(&self, command: MotionCommand<'_>) -> Result<Receiver<ControllerStatus>> {
        self.dispatched.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel();
        let status = match &self.script {
            Some(script) => (script.0)(&command),
            None => Some(ControllerStatus::Completed),
        };
        let side = command.side();
        trace!(side = %side, ?status, "Simulated dispatch");

        match status {
            Some(status) => {
                if status == ControllerStatus::Completed {
                    if let MotionCommand::Trajectory(trajectory) = command {
                        if let Some(last) = trajectory.last_configuration() {
                            self.set_state(last);
                        }
                    }
                }
                // The receiver is still held by the caller.
                let _ = sender.send(status);
            }
            None => self
                .silent
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((side, sender)),
        }
        Ok(receiver)
    }

    fn cancel(&self, side: ArmSide) {
        trace!(side = %side, "Simulated cancel");
        self.cancelled.fetch_add(1, Ordering::SeqCst);
        let mut silent = self.silent.lock().unwrap_or_else(PoisonError::into_inner);
        silent.retain(|(pending, sender)| {
            if *pending != side {
                return true;
            }
            // A receiver dropped after a timeout is fine.
            let _ = sender.send(ControllerStatus::Preempted);
            false
        });
    }

    fn current_state(&self, side: ArmSide) -> Option<RobotConfiguration> {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.get_mut(side).clone()
    }
}
