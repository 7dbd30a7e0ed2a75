//! Configuration for path generation, time parameterization, execution,
//! insertion, and pick orchestration.
//!
//! All configs are builders: start from `default()`, chain `with_*` setters,
//! then call `validate()` once before use.
//!
//! # Example
//!
//! ```
//! use manip_types::{ManipulationConfig, MotionPolicy, OrchestratorConfig};
//!
//! let config = ManipulationConfig::default().with_orchestrator(
//!     OrchestratorConfig::default()
//!         .with_max_candidates(3)
//!         .with_lift(MotionPolicy::new(0.08, 0.2, true)),
//! );
//! assert!(config.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ManipError, Result};

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ManipError::invalid_config(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

fn require_unit_scale(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ManipError::invalid_config(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}

/// Settings for straight-line Cartesian path generation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StraightLineConfig {
    /// Maximum Cartesian step between IK solves, in metres.
    resolution: f64,
    /// Maximum joint-space jump an IK solution may make from its seed.
    consistency_limit: f64,
}

impl StraightLineConfig {
    /// Creates the default configuration (1 cm steps, 0.3 rad consistency).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            resolution: 0.01,
            consistency_limit: 0.3,
        }
    }

    /// Sets the Cartesian step size.
    #[must_use]
    pub const fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Sets the per-step joint-space consistency limit.
    #[must_use]
    pub const fn with_consistency_limit(mut self, limit: f64) -> Self {
        self.consistency_limit = limit;
        self
    }

    /// Returns the Cartesian step size.
    #[must_use]
    pub const fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Returns the consistency limit.
    #[must_use]
    pub const fn consistency_limit(&self) -> f64 {
        self.consistency_limit
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] if either value is not positive.
    pub fn validate(&self) -> Result<()> {
        require_positive("resolution", self.resolution)?;
        require_positive("consistency_limit", self.consistency_limit)
    }
}

impl Default for StraightLineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for converting configurations into a timed trajectory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrajectoryConfig {
    /// Shortest allowed segment duration in seconds.
    min_segment_duration: f64,
    /// Largest joint-space step between points after densification.
    max_densify_step: f64,
    /// Iterations of the per-point limit repair pass.
    max_iterations: usize,
}

impl TrajectoryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_segment_duration: 0.01,
            max_densify_step: 0.05,
            max_iterations: 100,
        }
    }

    /// Sets the shortest segment duration.
    #[must_use]
    pub const fn with_min_segment_duration(mut self, seconds: f64) -> Self {
        self.min_segment_duration = seconds;
        self
    }

    /// Sets the densification step.
    #[must_use]
    pub const fn with_max_densify_step(mut self, step: f64) -> Self {
        self.max_densify_step = step;
        self
    }

    /// Sets the repair iteration count.
    #[must_use]
    pub const fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Returns the shortest segment duration.
    #[must_use]
    pub const fn min_segment_duration(&self) -> f64 {
        self.min_segment_duration
    }

    /// Returns the densification step.
    #[must_use]
    pub const fn max_densify_step(&self) -> f64 {
        self.max_densify_step
    }

    /// Returns the repair iteration count.
    #[must_use]
    pub const fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] on non-positive values.
    pub fn validate(&self) -> Result<()> {
        require_positive("min_segment_duration", self.min_segment_duration)?;
        require_positive("max_densify_step", self.max_densify_step)?;
        if self.max_iterations == 0 {
            return Err(ManipError::invalid_config(
                "max_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for dispatching trajectories to controllers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExecutionConfig {
    /// Maximum points per dispatched segment; stop requests are honored
    /// between segments.
    segment_points: usize,
    /// Multiplier on a segment's nominal duration before timing out.
    timeout_scale: f64,
    /// Fixed allowance added to every segment timeout.
    timeout_margin: Duration,
    /// Timeout for discrete gripper commands.
    gripper_timeout: Duration,
    /// Directory that receives a playback file per executed trajectory.
    record_dir: Option<PathBuf>,
}

impl ExecutionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            segment_points: 25,
            timeout_scale: 1.5,
            timeout_margin: Duration::from_secs(1),
            gripper_timeout: Duration::from_secs(5),
            record_dir: None,
        }
    }

    /// Sets the maximum points per segment.
    #[must_use]
    pub const fn with_segment_points(mut self, points: usize) -> Self {
        self.segment_points = points;
        self
    }

    /// Sets the timeout multiplier.
    #[must_use]
    pub const fn with_timeout_scale(mut self, scale: f64) -> Self {
        self.timeout_scale = scale;
        self
    }

    /// Sets the fixed timeout allowance.
    #[must_use]
    pub const fn with_timeout_margin(mut self, margin: Duration) -> Self {
        self.timeout_margin = margin;
        self
    }

    /// Sets the gripper command timeout.
    #[must_use]
    pub const fn with_gripper_timeout(mut self, timeout: Duration) -> Self {
        self.gripper_timeout = timeout;
        self
    }

    /// Records every executed trajectory into `dir`.
    #[must_use]
    pub fn with_record_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.record_dir = Some(dir.into());
        self
    }

    /// Returns the maximum points per segment.
    #[must_use]
    pub const fn segment_points(&self) -> usize {
        self.segment_points
    }

    /// Returns the timeout multiplier.
    #[must_use]
    pub const fn timeout_scale(&self) -> f64 {
        self.timeout_scale
    }

    /// Returns the fixed timeout allowance.
    #[must_use]
    pub const fn timeout_margin(&self) -> Duration {
        self.timeout_margin
    }

    /// Returns the gripper command timeout.
    #[must_use]
    pub const fn gripper_timeout(&self) -> Duration {
        self.gripper_timeout
    }

    /// Returns the recording directory, if any.
    #[must_use]
    pub fn record_dir(&self) -> Option<&Path> {
        self.record_dir.as_deref()
    }

    /// Timeout for a segment of the given nominal duration.
    #[must_use]
    pub fn segment_timeout(&self, nominal: Duration) -> Duration {
        nominal.mul_f64(self.timeout_scale) + self.timeout_margin
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] if segments hold fewer than two
    /// points or the timeout scale is below one.
    pub fn validate(&self) -> Result<()> {
        if self.segment_points < 2 {
            return Err(ManipError::invalid_config(
                "segment_points must be at least 2",
            ));
        }
        if !self.timeout_scale.is_finite() || self.timeout_scale < 1.0 {
            return Err(ManipError::invalid_config(format!(
                "timeout_scale must be at least 1, got {}",
                self.timeout_scale
            )));
        }
        Ok(())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Settings for the tactile closed-loop insertion.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InsertionConfig {
    /// Advance along the insertion direction per cycle, in metres.
    step: f64,
    /// Depth at which the insertion is considered achieved, in metres.
    target_depth: f64,
    /// Shear magnitude (metres on the pad) above which corrections are clamped.
    shear_ceiling: f64,
    /// Lateral correction commanded per metre of shear.
    correction_gain: f64,
    /// Largest lateral correction per cycle, in metres.
    max_correction: f64,
    /// Shear magnitude that counts as seated, ending the loop early.
    seated_shear: Option<f64>,
    /// Maximum number of correction cycles.
    max_attempts: usize,
    /// Wall-clock budget for the whole loop.
    max_duration: Duration,
    /// How long a cycle waits for a fresh sample.
    sample_timeout: Duration,
    /// Consecutive missing or malformed samples tolerated before aborting.
    max_sensor_faults: usize,
    /// Velocity scale of each correction segment.
    velocity_scale: f64,
    /// Whether to recalibrate the sensor before streaming.
    recalibrate_on_start: bool,
}

impl InsertionConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            step: 0.002,
            target_depth: 0.02,
            shear_ceiling: 0.004,
            correction_gain: 0.5,
            max_correction: 0.002,
            seated_shear: None,
            max_attempts: 50,
            max_duration: Duration::from_secs(30),
            sample_timeout: Duration::from_millis(200),
            max_sensor_faults: 5,
            velocity_scale: 0.1,
            recalibrate_on_start: true,
        }
    }

    /// Sets the per-cycle advance.
    #[must_use]
    pub const fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Sets the depth at which insertion succeeds.
    #[must_use]
    pub const fn with_target_depth(mut self, depth: f64) -> Self {
        self.target_depth = depth;
        self
    }

    /// Sets the shear clamp ceiling.
    #[must_use]
    pub const fn with_shear_ceiling(mut self, ceiling: f64) -> Self {
        self.shear_ceiling = ceiling;
        self
    }

    /// Sets the correction gain.
    #[must_use]
    pub const fn with_correction_gain(mut self, gain: f64) -> Self {
        self.correction_gain = gain;
        self
    }

    /// Sets the largest lateral correction per cycle.
    #[must_use]
    pub const fn with_max_correction(mut self, correction: f64) -> Self {
        self.max_correction = correction;
        self
    }

    /// Ends the loop once shear reaches `shear`.
    #[must_use]
    pub const fn with_seated_shear(mut self, shear: f64) -> Self {
        self.seated_shear = Some(shear);
        self
    }

    /// Sets the maximum number of cycles.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the loop's wall-clock budget.
    #[must_use]
    pub const fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = duration;
        self
    }

    /// Sets how long a cycle waits for a fresh sample.
    #[must_use]
    pub const fn with_sample_timeout(mut self, timeout: Duration) -> Self {
        self.sample_timeout = timeout;
        self
    }

    /// Sets the sensor fault ceiling.
    #[must_use]
    pub const fn with_max_sensor_faults(mut self, faults: usize) -> Self {
        self.max_sensor_faults = faults;
        self
    }

    /// Sets the velocity scale of correction segments.
    #[must_use]
    pub const fn with_velocity_scale(mut self, scale: f64) -> Self {
        self.velocity_scale = scale;
        self
    }

    /// Sets whether to recalibrate the sensor before streaming.
    #[must_use]
    pub const fn with_recalibrate_on_start(mut self, enable: bool) -> Self {
        self.recalibrate_on_start = enable;
        self
    }

    /// Returns the per-cycle advance.
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Returns the target depth.
    #[must_use]
    pub const fn target_depth(&self) -> f64 {
        self.target_depth
    }

    /// Returns the shear clamp ceiling.
    #[must_use]
    pub const fn shear_ceiling(&self) -> f64 {
        self.shear_ceiling
    }

    /// Returns the correction gain.
    #[must_use]
    pub const fn correction_gain(&self) -> f64 {
        self.correction_gain
    }

    /// Returns the largest lateral correction per cycle.
    #[must_use]
    pub const fn max_correction(&self) -> f64 {
        self.max_correction
    }

    /// Returns the seated shear threshold, if set.
    #[must_use]
    pub const fn seated_shear(&self) -> Option<f64> {
        self.seated_shear
    }

    /// Returns the maximum number of cycles.
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Returns the wall-clock budget.
    #[must_use]
    pub const fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Returns the per-cycle sample wait.
    #[must_use]
    pub const fn sample_timeout(&self) -> Duration {
        self.sample_timeout
    }

    /// Returns the sensor fault ceiling.
    #[must_use]
    pub const fn max_sensor_faults(&self) -> usize {
        self.max_sensor_faults
    }

    /// Returns the velocity scale of correction segments.
    #[must_use]
    pub const fn velocity_scale(&self) -> f64 {
        self.velocity_scale
    }

    /// Returns whether the sensor is recalibrated before streaming.
    #[must_use]
    pub const fn recalibrate_on_start(&self) -> bool {
        self.recalibrate_on_start
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] if any distance is not positive,
    /// the velocity scale is outside `(0, 1]`, or no cycle is allowed.
    pub fn validate(&self) -> Result<()> {
        require_positive("step", self.step)?;
        require_positive("target_depth", self.target_depth)?;
        require_positive("shear_ceiling", self.shear_ceiling)?;
        require_positive("max_correction", self.max_correction)?;
        require_unit_scale("insertion velocity_scale", self.velocity_scale)?;
        if !self.correction_gain.is_finite() || self.correction_gain < 0.0 {
            return Err(ManipError::invalid_config(
                "correction_gain cannot be negative",
            ));
        }
        if let Some(seated) = self.seated_shear {
            require_positive("seated_shear", seated)?;
        }
        if self.max_attempts == 0 {
            return Err(ManipError::invalid_config("max_attempts must be at least 1"));
        }
        Ok(())
    }
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How one Cartesian motion call site treats distance, speed, and shortfall.
///
/// With `best_effort` set, a path shorter than requested is still executed as
/// long as it is at least `min_distance` long. Without it, the achieved length
/// must reach the requested distance within `tolerance`.
///
/// # Example
///
/// ```
/// use manip_types::MotionPolicy;
///
/// let strict = MotionPolicy::new(0.1, 0.5, false);
/// assert!(!strict.accepts(0.05));
/// assert!(strict.accepts(0.1));
///
/// let lenient = MotionPolicy::new(0.1, 0.5, true).with_min_distance(0.02);
/// assert!(lenient.accepts(0.05));
/// assert!(!lenient.accepts(0.01));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionPolicy {
    distance: f64,
    velocity_scale: f64,
    best_effort: bool,
    min_distance: f64,
    tolerance: f64,
}

impl MotionPolicy {
    /// Creates a policy for a motion of `distance` metres.
    #[must_use]
    pub const fn new(distance: f64, velocity_scale: f64, best_effort: bool) -> Self {
        Self {
            distance,
            velocity_scale,
            best_effort,
            min_distance: 0.0,
            tolerance: 1e-4,
        }
    }

    /// Sets the requested distance.
    #[must_use]
    pub const fn with_distance(mut self, distance: f64) -> Self {
        self.distance = distance;
        self
    }

    /// Sets the velocity scale.
    #[must_use]
    pub const fn with_velocity_scale(mut self, scale: f64) -> Self {
        self.velocity_scale = scale;
        self
    }

    /// Sets whether a partial path is acceptable.
    #[must_use]
    pub const fn with_best_effort(mut self, best_effort: bool) -> Self {
        self.best_effort = best_effort;
        self
    }

    /// Sets the shortest acceptable partial path.
    #[must_use]
    pub const fn with_min_distance(mut self, distance: f64) -> Self {
        self.min_distance = distance;
        self
    }

    /// Sets the shortfall tolerated when not best-effort.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Returns the requested distance.
    #[must_use]
    pub const fn distance(&self) -> f64 {
        self.distance
    }

    /// Returns the velocity scale.
    #[must_use]
    pub const fn velocity_scale(&self) -> f64 {
        self.velocity_scale
    }

    /// Returns whether a partial path is acceptable.
    #[must_use]
    pub const fn best_effort(&self) -> bool {
        self.best_effort
    }

    /// Returns the shortest acceptable partial path.
    #[must_use]
    pub const fn min_distance(&self) -> f64 {
        self.min_distance
    }

    /// Returns the tolerated shortfall.
    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Returns `true` if a path of `achieved` metres satisfies this policy
    /// for a request of [`Self::distance`] metres.
    #[must_use]
    pub fn accepts(&self, achieved: f64) -> bool {
        self.accepts_for(self.distance, achieved)
    }

    /// Like [`Self::accepts`] with an explicit requested distance.
    #[must_use]
    pub fn accepts_for(&self, requested: f64, achieved: f64) -> bool {
        if achieved >= requested - self.tolerance {
            return true;
        }
        self.best_effort && achieved > 0.0 && achieved >= self.min_distance
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] on a negative distance or a
    /// velocity scale outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !self.distance.is_finite() || self.distance < 0.0 {
            return Err(ManipError::invalid_config(format!(
                "distance cannot be negative, got {}",
                self.distance
            )));
        }
        require_unit_scale("velocity_scale", self.velocity_scale)?;
        if self.min_distance < 0.0 || self.tolerance < 0.0 {
            return Err(ManipError::invalid_config(
                "min_distance and tolerance cannot be negative",
            ));
        }
        Ok(())
    }
}

/// Settings for the per-order pick state machine.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrchestratorConfig {
    /// Candidates tried before an order fails in planning.
    max_candidates: usize,
    /// Recovery motions tried before an order fails.
    max_recovery_attempts: usize,
    /// Approach policy; the distance comes from each grasp candidate.
    approach: MotionPolicy,
    /// Lift along world +z after grasping.
    lift: MotionPolicy,
    /// Retreat against the approach direction after lifting.
    retreat: MotionPolicy,
    /// Unchecked escape motion used by recovery.
    recovery: MotionPolicy,
    /// Velocity scale for free-space moves to the pre-grasp and home.
    free_space_velocity_scale: f64,
    /// Consult the experience cache before the planner.
    use_experience: bool,
    /// Run the tactile insertion loop in place of the open-loop approach.
    use_insertion: bool,
    /// Return to the home configuration after each order.
    return_home: bool,
}

impl OrchestratorConfig {
    /// Creates the default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_candidates: 5,
            max_recovery_attempts: 2,
            approach: MotionPolicy::new(0.0, 0.2, false).with_tolerance(5e-3),
            lift: MotionPolicy::new(0.1, 0.3, true),
            retreat: MotionPolicy::new(0.15, 0.3, true),
            recovery: MotionPolicy::new(0.05, 0.1, true),
            free_space_velocity_scale: 0.5,
            use_experience: true,
            use_insertion: false,
            return_home: true,
        }
    }

    /// Sets the maximum number of candidates tried.
    #[must_use]
    pub const fn with_max_candidates(mut self, candidates: usize) -> Self {
        self.max_candidates = candidates;
        self
    }

    /// Sets the maximum number of recovery motions.
    #[must_use]
    pub const fn with_max_recovery_attempts(mut self, attempts: usize) -> Self {
        self.max_recovery_attempts = attempts;
        self
    }

    /// Sets the approach policy.
    #[must_use]
    pub const fn with_approach(mut self, policy: MotionPolicy) -> Self {
        self.approach = policy;
        self
    }

    /// Sets the lift policy.
    #[must_use]
    pub const fn with_lift(mut self, policy: MotionPolicy) -> Self {
        self.lift = policy;
        self
    }

    /// Sets the retreat policy.
    #[must_use]
    pub const fn with_retreat(mut self, policy: MotionPolicy) -> Self {
        self.retreat = policy;
        self
    }

    /// Sets the recovery policy.
    #[must_use]
    pub const fn with_recovery(mut self, policy: MotionPolicy) -> Self {
        self.recovery = policy;
        self
    }

    /// Sets the free-space velocity scale.
    #[must_use]
    pub const fn with_free_space_velocity_scale(mut self, scale: f64) -> Self {
        self.free_space_velocity_scale = scale;
        self
    }

    /// Sets whether the experience cache is consulted.
    #[must_use]
    pub const fn with_experience(mut self, enable: bool) -> Self {
        self.use_experience = enable;
        self
    }

    /// Sets whether the tactile insertion loop drives the approach.
    #[must_use]
    pub const fn with_insertion(mut self, enable: bool) -> Self {
        self.use_insertion = enable;
        self
    }

    /// Sets whether the arm returns home after each order.
    #[must_use]
    pub const fn with_return_home(mut self, enable: bool) -> Self {
        self.return_home = enable;
        self
    }

    /// Returns the maximum number of candidates tried.
    #[must_use]
    pub const fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Returns the maximum number of recovery motions.
    #[must_use]
    pub const fn max_recovery_attempts(&self) -> usize {
        self.max_recovery_attempts
    }

    /// Returns the approach policy.
    #[must_use]
    pub const fn approach(&self) -> &MotionPolicy {
        &self.approach
    }

    /// Returns the lift policy.
    #[must_use]
    pub const fn lift(&self) -> &MotionPolicy {
        &self.lift
    }

    /// Returns the retreat policy.
    #[must_use]
    pub const fn retreat(&self) -> &MotionPolicy {
        &self.retreat
    }

    /// Returns the recovery policy.
    #[must_use]
    pub const fn recovery(&self) -> &MotionPolicy {
        &self.recovery
    }

    /// Returns the free-space velocity scale.
    #[must_use]
    pub const fn free_space_velocity_scale(&self) -> f64 {
        self.free_space_velocity_scale
    }

    /// Returns whether the experience cache is consulted.
    #[must_use]
    pub const fn use_experience(&self) -> bool {
        self.use_experience
    }

    /// Returns whether the tactile insertion loop drives the approach.
    #[must_use]
    pub const fn use_insertion(&self) -> bool {
        self.use_insertion
    }

    /// Returns whether the arm returns home after each order.
    #[must_use]
    pub const fn return_home(&self) -> bool {
        self.return_home
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::InvalidConfig`] if no candidate may be tried or a
    /// motion policy is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            return Err(ManipError::invalid_config(
                "max_candidates must be at least 1",
            ));
        }
        self.approach.validate()?;
        self.lift.validate()?;
        self.retreat.validate()?;
        self.recovery.validate()?;
        require_unit_scale("free_space_velocity_scale", self.free_space_velocity_scale)
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Every configuration section in one place, as loaded from a file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ManipulationConfig {
    /// Straight-line path generation.
    pub straight_line: StraightLineConfig,
    /// Time parameterization.
    pub trajectory: TrajectoryConfig,
    /// Controller dispatch.
    pub execution: ExecutionConfig,
    /// Tactile insertion.
    pub insertion: InsertionConfig,
    /// Pick state machine.
    pub orchestrator: OrchestratorConfig,
}

impl ManipulationConfig {
    /// Replaces the straight-line section.
    #[must_use]
    pub fn with_straight_line(mut self, config: StraightLineConfig) -> Self {
        self.straight_line = config;
        self
    }

    /// Replaces the trajectory section.
    #[must_use]
    pub fn with_trajectory(mut self, config: TrajectoryConfig) -> Self {
        self.trajectory = config;
        self
    }

    /// Replaces the execution section.
    #[must_use]
    pub fn with_execution(mut self, config: ExecutionConfig) -> Self {
        self.execution = config;
        self
    }

    /// Replaces the insertion section.
    #[must_use]
    pub fn with_insertion(mut self, config: InsertionConfig) -> Self {
        self.insertion = config;
        self
    }

    /// Replaces the orchestrator section.
    #[must_use]
    pub fn with_orchestrator(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = config;
        self
    }

    /// Validates every section.
    ///
    /// # Errors
    ///
    /// Returns the first section error found.
    pub fn validate(&self) -> Result<()> {
        self.straight_line.validate()?;
        self.trajectory.validate()?;
        self.execution.validate()?;
        self.insertion.validate()?;
        self.orchestrator.validate()
    }
}
