//! The execution engine: the only component that commands motion.
//!
//! [`ExecutionEngine::execute`] runs a trajectory to completion and always
//! returns an [`ExecutionOutcome`]:
//!
//! 1. Every point is re-checked with [`check_state`] unless the caller passes
//!    [`CollisionCheck::BypassForRecovery`].
//! 2. The trajectory is split into segments of at most
//!    [`ExecutionConfig::segment_points`] points. A pending stop request is
//!    honored before each segment is dispatched.
//! 3. Each segment is dispatched and the engine blocks until the controller
//!    reports a status or the segment timeout elapses. A timeout cancels the
//!    arm and is reported as `ControllerTimeout`; partial completion is never
//!    assumed to be success.
//!
//! Only a stop request or a preempted goal is reported as `Aborted`. A
//! controller fault fails the motion as `PlanningFailed` with the
//! controller's error code attached, so the caller can recover.
//!
//! The input trajectory is only read, so executing the same trajectory twice
//! issues the same commands.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use manip_motion::{
    CollisionCheck, StateValidity, TrajectoryConverter, Validity, check_state, save_playback,
};
use manip_types::{
    ArmSide, ConfigurationTrajectory, ExecutionConfig, ExecutionOutcome, KinematicChain,
    ManipulationConfig, Result, RobotConfiguration,
};
use tracing::{debug, info, warn};

use crate::controller::{ControllerClient, ControllerStatus, GripperCommand, MotionCommand};
use crate::stop::StopSignal;

/// Dispatches validated trajectories and gripper commands to the controllers.
pub struct ExecutionEngine<'a> {
    controller: &'a dyn ControllerClient,
    validity: &'a dyn StateValidity,
    converter: TrajectoryConverter,
    config: ExecutionConfig,
    stop: StopSignal,
    recorded: AtomicUsize,
}

impl<'a> ExecutionEngine<'a> {
    /// Creates an engine with its own stop signal.
    #[must_use]
    pub fn new(
        controller: &'a dyn ControllerClient,
        validity: &'a dyn StateValidity,
        config: ExecutionConfig,
    ) -> Self {
        Self {
            controller,
            validity,
            converter: TrajectoryConverter::default(),
            config,
            stop: StopSignal::new(),
            recorded: AtomicUsize::new(0),
        }
    }

    /// Creates an engine from the trajectory and execution sections of a
    /// loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`](manip_types::ManipError::InvalidConfig)
    /// if either section is invalid.
    pub fn from_config(
        controller: &'a dyn ControllerClient,
        validity: &'a dyn StateValidity,
        config: &ManipulationConfig,
    ) -> Result<Self> {
        config.trajectory.validate()?;
        config.execution.validate()?;
        Ok(Self::new(controller, validity, config.execution.clone())
            .with_converter(TrajectoryConverter::new(config.trajectory.clone())))
    }

    /// Shares an externally owned stop signal.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Sets the converter used by [`Self::execute_state`] and [`Self::execute_path`].
    #[must_use]
    pub fn with_converter(mut self, converter: TrajectoryConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Returns the stop signal.
    #[must_use]
    pub const fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Returns the converter.
    #[must_use]
    pub const fn converter(&self) -> &TrajectoryConverter {
        &self.converter
    }

    /// Returns the validity oracle.
    #[must_use]
    pub fn validity(&self) -> &'a dyn StateValidity {
        self.validity
    }

    /// Returns the measured configuration of an arm.
    #[must_use]
    pub fn current_state(&self, side: ArmSide) -> Option<RobotConfiguration> {
        self.controller.current_state(side)
    }

    /// Executes a trajectory on the arm it belongs to.
    pub fn execute(
        &self,
        trajectory: &ConfigurationTrajectory,
        chain: &KinematicChain,
        check: CollisionCheck,
    ) -> ExecutionOutcome {
        if self.stop.is_stop_requested() {
            return ExecutionOutcome::aborted("stop requested before execution");
        }
        if trajectory.is_empty() {
            return ExecutionOutcome::planning_failed("trajectory has no points");
        }
        if trajectory.side() != chain.side() {
            return ExecutionOutcome::planning_failed(format!(
                "trajectory for {} executed on {} chain",
                trajectory.side(),
                chain.side()
            ));
        }
        if !check.is_enforced() {
            warn!(side = %chain.side(), "Executing trajectory without collision checking");
        }
        for (index, configuration) in trajectory.configurations().enumerate() {
            match check_state(self.validity, &configuration, chain, check) {
                Validity::Valid => {}
                Validity::Colliding { links } => {
                    warn!(point = index, ?links, "Trajectory rejected before execution");
                    return ExecutionOutcome::collision(links);
                }
                Validity::OutOfBounds { joint } => {
                    return ExecutionOutcome::planning_failed(format!(
                        "point {index}: joint {joint} out of bounds"
                    ));
                }
            }
        }

        self.record(trajectory);

        let last = trajectory.len() - 1;
        let step = self.config.segment_points().max(2) - 1;
        let mut start = 0;
        let mut segment_index = 0;
        loop {
            let end = (start + step).min(last);
            if self.stop.is_stop_requested() {
                self.controller.cancel(trajectory.side());
                info!(segment = segment_index, "Stop requested, aborting execution");
                return ExecutionOutcome::aborted(format!(
                    "stop requested at segment {segment_index}"
                ));
            }
            let segment = match trajectory.segment(start, end) {
                Ok(segment) => segment,
                Err(error) => return ExecutionOutcome::from(error),
            };
            let timeout = self.config.segment_timeout(segment.duration());
            let outcome = self.run(MotionCommand::Trajectory(&segment), timeout);
            if !outcome.is_success() {
                return outcome;
            }
            debug!(segment = segment_index, start, end, "Segment completed");
            if end == last {
                return outcome;
            }
            start = end;
            segment_index += 1;
        }
    }

    /// Moves directly from the arm's current configuration to `goal`.
    pub fn execute_state(
        &self,
        goal: &RobotConfiguration,
        chain: &KinematicChain,
        velocity_scale: f64,
    ) -> ExecutionOutcome {
        let Some(current) = self.controller.current_state(chain.side()) else {
            return ExecutionOutcome::planning_failed(format!(
                "current state of {} unknown",
                chain.side()
            ));
        };
        self.execute_path(&[current, goal.clone()], chain, velocity_scale, CollisionCheck::Enforce)
    }

    /// Time-parameterizes a configuration sequence and executes it.
    pub fn execute_path(
        &self,
        configurations: &[RobotConfiguration],
        chain: &KinematicChain,
        velocity_scale: f64,
        check: CollisionCheck,
    ) -> ExecutionOutcome {
        match self.converter.to_trajectory(
            configurations,
            chain,
            velocity_scale,
            true,
            self.validity,
            check,
        ) {
            Ok(trajectory) => self.execute(&trajectory, chain, check),
            Err(error) => ExecutionOutcome::from(error),
        }
    }

    /// Opens or closes a gripper and waits for it to finish.
    pub fn set_gripper(&self, side: ArmSide, command: &GripperCommand) -> ExecutionOutcome {
        if self.stop.is_stop_requested() {
            return ExecutionOutcome::aborted("stop requested before gripper command");
        }
        debug!(side = %side, ?command, "Gripper command");
        self.run(
            MotionCommand::Gripper { side, command },
            self.config.gripper_timeout(),
        )
    }

    fn run(&self, command: MotionCommand<'_>, timeout: Duration) -> ExecutionOutcome {
        let side = command.side();
        let receiver = match self.controller.dispatch(command) {
            Ok(receiver) => receiver,
            Err(error) => return ExecutionOutcome::from(error),
        };
        match receiver.recv_timeout(timeout) {
            Ok(ControllerStatus::Completed) => ExecutionOutcome::succeeded(),
            Ok(ControllerStatus::Preempted) => ExecutionOutcome::aborted("controller preempted"),
            Ok(ControllerStatus::Failed { code, message }) => {
                warn!(side = %side, code, %message, "Controller failed");
                ExecutionOutcome::planning_failed(format!("controller failed: {message}"))
                    .with_error_code(code)
            }
            Ok(ControllerStatus::Collision { links }) => {
                warn!(side = %side, ?links, "Controller reported collision");
                ExecutionOutcome::collision(links)
            }
            Err(RecvTimeoutError::Timeout) => {
                self.controller.cancel(side);
                warn!(side = %side, ?timeout, "Controller timed out");
                ExecutionOutcome::timeout(format!("no completion within {timeout:?}"))
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!(side = %side, "Controller hung up without a status");
                ExecutionOutcome::timeout("controller disconnected before completion")
            }
        }
    }

    fn record(&self, trajectory: &ConfigurationTrajectory) {
        let Some(dir) = self.config.record_dir() else {
            return;
        };
        let index = self.recorded.fetch_add(1, Ordering::SeqCst);
        let path: PathBuf = dir.join(format!("{}_{index:04}.csv", trajectory.side()));
        if let Err(error) = save_playback(&path, trajectory) {
            warn!(path = %path.display(), %error, "Failed to record trajectory");
        }
    }
}
