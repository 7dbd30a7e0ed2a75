//! Closed-loop tactile insertion.
//!
//! The controller pushes the tool along an insertion direction in short,
//! slow segments. Before each segment it reads the newest tactile sample and
//! steers the next target sideways along the measured shear direction.
//!
//! ```text
//! Idle ──run──▶ StreamingCorrection ──depth reached / seated──▶ Achieved
//!                        │
//!                        └──budget, faults, stop, motion failure──▶ Aborted
//! ```
//!
//! A cycle with no fresh sample holds the previous correction. Consecutive
//! silent cycles count as sensor faults; past the configured ceiling the loop
//! aborts with a sensor fault diagnostic.
//!
//! An aborted insertion reports `PlanningFailed` for budget, sensor, and IK
//! failures, the engine's outcome for a failed segment, and `Aborted` only
//! for a stop request.

use std::time::Instant;

use manip_motion::{ArmKinematics, CollisionCheck};
use manip_types::{
    ExecutionOutcome, InsertionConfig, KinematicChain, ManipError, RobotConfiguration,
    TactileSample,
};
use nalgebra::{Isometry3, Translation3, Unit, UnitQuaternion, Vector3};
use tracing::{debug, info, warn};

use crate::engine::ExecutionEngine;
use crate::tactile::{TactileReader, TactileSensor};

/// Where the insertion loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionState {
    /// Not started.
    Idle,
    /// Streaming corrected segments.
    StreamingCorrection,
    /// Target depth or seated shear reached.
    Achieved,
    /// Gave up; see the report's outcome.
    Aborted,
}

impl InsertionState {
    /// Returns `true` for `Achieved` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Achieved | Self::Aborted)
    }
}

/// What one insertion run did.
#[derive(Debug, Clone)]
pub struct InsertionReport {
    /// Terminal state.
    pub state: InsertionState,
    /// Outcome; `Succeeded` exactly when `state` is `Achieved`.
    pub outcome: ExecutionOutcome,
    /// Correction cycles executed.
    pub cycles: usize,
    /// Depth reached along the insertion direction, in metres.
    pub depth: f64,
    /// Cycles that had no fresh sample.
    pub sensor_faults: usize,
    /// Configuration the arm ended in.
    pub final_configuration: RobotConfiguration,
    /// Lateral correction applied on each cycle.
    pub applied_corrections: Vec<Vector3<f64>>,
}

/// Drives a directional insertion with tactile feedback.
pub struct InsertionController<'e, 'k> {
    engine: &'e ExecutionEngine<'e>,
    kinematics: &'k dyn ArmKinematics,
    config: InsertionConfig,
    consistency_limit: f64,
    state: InsertionState,
}

impl<'e, 'k> InsertionController<'e, 'k> {
    /// Creates an idle controller.
    #[must_use]
    pub fn new(
        engine: &'e ExecutionEngine<'e>,
        kinematics: &'k dyn ArmKinematics,
        config: InsertionConfig,
    ) -> Self {
        Self {
            engine,
            kinematics,
            config,
            consistency_limit: 0.3,
            state: InsertionState::Idle,
        }
    }

    /// Sets the IK consistency limit for each corrected target.
    #[must_use]
    pub const fn with_consistency_limit(mut self, limit: f64) -> Self {
        self.consistency_limit = limit;
        self
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> InsertionState {
        self.state
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &InsertionConfig {
        &self.config
    }

    /// Lateral correction for one sample, in the world frame.
    ///
    /// The shear magnitude is clamped to the configured ceiling before the
    /// gain is applied, and the result is capped at the per-cycle maximum.
    /// The component along `direction` is removed so corrections never change
    /// the depth.
    #[must_use]
    pub fn correction(
        &self,
        sample: &TactileSample,
        tool: &Isometry3<f64>,
        direction: &Unit<Vector3<f64>>,
    ) -> Vector3<f64> {
        let magnitude = sample.shear_magnitude().min(self.config.shear_ceiling());
        let length = (self.config.correction_gain() * magnitude).min(self.config.max_correction());
        if length <= 0.0 {
            return Vector3::zeros();
        }
        let shear = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), sample.shear_angle());
        let axis = direction.into_inner();
        let lateral = tool.rotation * (shear * Vector3::x());
        let lateral = lateral - axis * lateral.dot(&axis);
        match Unit::try_new(lateral, 1e-9) {
            Some(unit) => unit.into_inner() * length,
            None => Vector3::zeros(),
        }
    }

    /// Runs the loop from `start` until it reaches a terminal state.
    ///
    /// `direction` is the insertion direction in the world frame. The reader
    /// must be fed by the sensor while this call blocks.
    #[allow(clippy::too_many_lines)]
    pub fn run(
        &mut self,
        chain: &KinematicChain,
        start: &RobotConfiguration,
        direction: &Vector3<f64>,
        samples: &TactileReader,
        sensor: Option<&dyn TactileSensor>,
    ) -> InsertionReport {
        let mut report = InsertionReport {
            state: InsertionState::Idle,
            outcome: ExecutionOutcome::succeeded(),
            cycles: 0,
            depth: 0.0,
            sensor_faults: 0,
            final_configuration: start.clone(),
            applied_corrections: Vec::new(),
        };
        let Some(direction) = Unit::try_new(*direction, 1e-9) else {
            return self.abort(report, ExecutionOutcome::planning_failed("zero insertion direction"));
        };
        let origin = match self.kinematics.forward(start) {
            Ok(pose) => pose,
            Err(error) => return self.abort(report, ExecutionOutcome::from(error)),
        };

        if self.config.recalibrate_on_start() {
            if let Some(sensor) = sensor {
                if let Err(error) = sensor.recalibrate() {
                    warn!(%error, "Tactile recalibration failed, streaming anyway");
                }
            }
        }

        self.state = InsertionState::StreamingCorrection;
        report.state = self.state;
        info!(
            side = %chain.side(),
            target_depth = self.config.target_depth(),
            "Starting tactile insertion"
        );

        let started = Instant::now();
        let mut sequence = 0;
        let mut correction = Vector3::zeros();
        let mut consecutive_faults = 0;
        let mut current = start.clone();

        for cycle in 0..self.config.max_attempts() {
            if self.engine.stop_signal().is_stop_requested() {
                return self.abort(report, ExecutionOutcome::aborted("stop requested during insertion"));
            }
            if started.elapsed() > self.config.max_duration() {
                return self.abort(
                    report,
                    ExecutionOutcome::planning_failed(format!(
                        "insertion exceeded {:?}",
                        self.config.max_duration()
                    )),
                );
            }

            let pose = match self.kinematics.forward(&current) {
                Ok(pose) => pose,
                Err(error) => return self.abort(report, ExecutionOutcome::from(error)),
            };

            match samples.wait_newer(sequence, self.config.sample_timeout()) {
                Some((seq, sample)) => {
                    sequence = seq;
                    consecutive_faults = 0;
                    if let Some(seated) = self.config.seated_shear() {
                        if sample.shear_magnitude() >= seated {
                            info!(cycle, shear = sample.shear_magnitude(), "Insertion seated");
                            return self.achieve(report);
                        }
                    }
                    correction = self.correction(&sample, &pose, &direction);
                    debug!(
                        cycle,
                        angle = sample.shear_angle(),
                        magnitude = sample.shear_magnitude(),
                        correction = correction.norm(),
                        "Shear correction"
                    );
                }
                None => {
                    consecutive_faults += 1;
                    report.sensor_faults += 1;
                    warn!(cycle, consecutive_faults, "No fresh tactile sample, holding last correction");
                    if consecutive_faults > self.config.max_sensor_faults() {
                        let error = ManipError::sensor_fault(format!(
                            "{consecutive_faults} consecutive cycles without a tactile sample"
                        ));
                        return self.abort(report, ExecutionOutcome::from(error));
                    }
                }
            }

            let step = direction.into_inner() * self.config.step() + correction;
            let target = Translation3::from(step) * pose;
            let Some(next) = self.kinematics.inverse(chain, &target, &current, self.consistency_limit)
            else {
                return self.abort(
                    report,
                    ExecutionOutcome::planning_failed(format!("no IK for insertion cycle {cycle}")),
                );
            };

            let outcome = self.engine.execute_path(
                &[current.clone(), next.clone()],
                chain,
                self.config.velocity_scale(),
                CollisionCheck::Enforce,
            );
            if !outcome.is_success() {
                warn!(cycle, %outcome, "Insertion segment failed");
                return self.abort(report, outcome);
            }

            current = next;
            report.cycles = cycle + 1;
            report.final_configuration = current.clone();
            report.applied_corrections.push(correction);
            report.depth = (target.translation.vector - origin.translation.vector)
                .dot(&direction.into_inner());
            if report.depth >= self.config.target_depth() - 1e-12 {
                info!(cycles = report.cycles, depth = report.depth, "Insertion depth reached");
                return self.achieve(report);
            }
        }

        let attempts = self.config.max_attempts();
        self.abort(
            report,
            ExecutionOutcome::planning_failed(format!(
                "target depth not reached in {attempts} cycles"
            )),
        )
    }

    fn achieve(&mut self, mut report: InsertionReport) -> InsertionReport {
        self.state = InsertionState::Achieved;
        report.state = self.state;
        report.outcome = ExecutionOutcome::succeeded();
        report
    }

    fn abort(&mut self, mut report: InsertionReport, outcome: ExecutionOutcome) -> InsertionReport {
        warn!(%outcome, cycles = report.cycles, "Insertion aborted");
        self.state = InsertionState::Aborted;
        report.state = self.state;
        report.outcome = outcome;
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::simulated::SimulatedController;
    use crate::tactile::tactile_channel;
    use approx::assert_relative_eq;
    use manip_motion::{FreeSpace, GantryKinematics};
    use manip_types::{ArmSide, ExecutionConfig, OutcomeKind, PAD_WIDTH_M, Result};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Contact displaced `dx` pixels along image x from the centre.
    fn raw(dx: f64) -> [f64; 9] {
        [320.0 + dx, 240.0, 320.0, 240.0, 1.0, 0.0, 1.0, 480.0, 640.0]
    }

    fn chain() -> KinematicChain {
        GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 2.0)
    }

    fn start() -> RobotConfiguration {
        RobotConfiguration::new(ArmSide::Left, vec![0.0; 4])
    }

    fn config() -> InsertionConfig {
        InsertionConfig::default()
            .with_step(0.005)
            .with_target_depth(0.02)
            .with_sample_timeout(Duration::from_millis(5))
            .with_max_sensor_faults(10)
            .with_velocity_scale(1.0)
    }

    struct CountingSensor(AtomicUsize);

    impl TactileSensor for CountingSensor {
        fn recalibrate(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_correction_is_clamped_and_lateral() {
        let controller = SimulatedController::new();
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let gantry = GantryKinematics::new();
        let insertion = InsertionController::new(&engine, &gantry, config());
        let down = Unit::new_normalize(-Vector3::z());

        // 300 px of shear is far above the ceiling; the correction is capped.
        let sample = TactileSample::from_raw(0.0, &raw(300.0)).unwrap();
        let correction = insertion.correction(&sample, &Isometry3::identity(), &down);
        let expected = (0.5 * 0.004f64).min(0.002);
        assert_relative_eq!(correction.norm(), expected, epsilon = 1e-12);
        assert_relative_eq!(correction.z, 0.0, epsilon = 1e-12);
        assert!(correction.x > 0.0);

        // Small shear scales linearly.
        let sample = TactileSample::from_raw(0.0, &raw(4.0)).unwrap();
        let shear = 4.0 * PAD_WIDTH_M / 640.0;
        let correction = insertion.correction(&sample, &Isometry3::identity(), &down);
        assert_relative_eq!(correction.norm(), 0.5 * shear, epsilon = 1e-12);
    }

    #[test]
    fn test_reaches_depth_with_samples() {
        let (writer, reader) = tactile_channel();
        let writer = Mutex::new(writer);
        let tick = AtomicUsize::new(0);
        let controller = SimulatedController::new().with_script(move |_| {
            let n = tick.fetch_add(1, Ordering::SeqCst);
            writer.lock().unwrap().publish_raw(n as f64, &raw(2.0));
            Some(crate::controller::ControllerStatus::Completed)
        });
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let gantry = GantryKinematics::new();
        let sensor = CountingSensor(AtomicUsize::new(0));
        let mut insertion = InsertionController::new(&engine, &gantry, config());
        assert_eq!(insertion.state(), InsertionState::Idle);

        let report = insertion.run(&chain(), &start(), &-Vector3::z(), &reader, Some(&sensor));

        assert_eq!(report.state, InsertionState::Achieved);
        assert!(report.outcome.is_success());
        assert_eq!(report.cycles, 4);
        assert_relative_eq!(report.depth, 0.02, epsilon = 1e-9);
        assert_eq!(sensor.0.load(Ordering::SeqCst), 1);
        // First cycle had no sample yet and held a zero correction.
        assert_eq!(report.applied_corrections[0], Vector3::zeros());
        assert!(report.applied_corrections[1].x > 0.0);
        let z = report.final_configuration.values()[2];
        assert_relative_eq!(z, -0.02, epsilon = 1e-9);
    }

    #[test]
    fn test_short_sample_is_discarded_without_abort() {
        let (writer, reader) = tactile_channel();
        writer.publish_raw(0.0, &raw(2.0));
        let writer = Mutex::new(writer);
        let tick = AtomicUsize::new(0);
        let controller = SimulatedController::new().with_script(move |_| {
            let n = tick.fetch_add(1, Ordering::SeqCst);
            let sample = raw(2.0);
            let writer = writer.lock().unwrap();
            if n == 1 {
                writer.publish_raw(n as f64, &sample[..5]);
            } else {
                writer.publish_raw(n as f64, &sample);
            }
            Some(crate::controller::ControllerStatus::Completed)
        });
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let gantry = GantryKinematics::new();
        let mut insertion = InsertionController::new(&engine, &gantry, config());

        let report = insertion.run(&chain(), &start(), &-Vector3::z(), &reader, None);

        assert_eq!(report.state, InsertionState::Achieved);
        assert_eq!(reader.fault_count(), 1);
        assert!(report.sensor_faults >= 1);
        // The discarded sample left the previous correction in place.
        assert_eq!(report.applied_corrections[2], report.applied_corrections[1]);
    }

    #[test]
    fn test_silent_sensor_aborts_after_fault_ceiling() {
        let (_writer, reader) = tactile_channel();
        let controller = SimulatedController::new();
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let gantry = GantryKinematics::new();
        let config = config().with_step(0.001).with_max_sensor_faults(2);
        let mut insertion = InsertionController::new(&engine, &gantry, config);

        let report = insertion.run(&chain(), &start(), &-Vector3::z(), &reader, None);

        assert_eq!(report.state, InsertionState::Aborted);
        assert_eq!(report.outcome.kind(), OutcomeKind::PlanningFailed);
        assert_eq!(report.sensor_faults, 3);
        assert_eq!(report.cycles, 2);
    }

    #[test]
    fn test_seated_shear_ends_early() {
        let (writer, reader) = tactile_channel();
        writer.publish_raw(0.0, &raw(200.0));
        let controller = SimulatedController::new();
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let gantry = GantryKinematics::new();
        let config = config().with_seated_shear(0.001);
        let mut insertion = InsertionController::new(&engine, &gantry, config);
        let report = insertion.run(&chain(), &start(), &-Vector3::z(), &reader, None);
        assert_eq!(report.state, InsertionState::Achieved);
        assert_eq!(report.cycles, 0);
        assert_eq!(controller.dispatch_count(), 0);
    }

    #[test]
    fn test_attempt_budget() {
        let (_writer, reader) = tactile_channel();
        let controller = SimulatedController::new();
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let gantry = GantryKinematics::new();
        let config = config().with_max_attempts(2);
        let mut insertion = InsertionController::new(&engine, &gantry, config);
        let report = insertion.run(&chain(), &start(), &-Vector3::z(), &reader, None);
        assert_eq!(report.state, InsertionState::Aborted);
        assert_eq!(report.outcome.kind(), OutcomeKind::PlanningFailed);
        assert_eq!(report.cycles, 2);
        assert!(insertion.state().is_terminal());
    }

    #[test]
    fn test_blocked_segment_aborts_with_collision() {
        let (_writer, reader) = tactile_channel();
        let controller = SimulatedController::new();
        let wall = |c: &RobotConfiguration, _: &KinematicChain| {
            if c.values()[2] < -0.008 {
                manip_motion::Validity::Colliding {
                    links: vec!["peg".into(), "receptacle".into()],
                }
            } else {
                manip_motion::Validity::Valid
            }
        };
        let engine = ExecutionEngine::new(&controller, &wall, ExecutionConfig::default());
        let gantry = GantryKinematics::new();
        let mut insertion = InsertionController::new(&engine, &gantry, config());
        let report = insertion.run(&chain(), &start(), &-Vector3::z(), &reader, None);
        assert_eq!(report.state, InsertionState::Aborted);
        assert_eq!(report.outcome.kind(), OutcomeKind::CollisionDetected);
        assert_eq!(report.cycles, 1);
    }
}
