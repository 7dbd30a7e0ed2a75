//! Pick-and-place orchestration for a dual-arm shelf-picking robot.
//!
//! Each [`WorkOrder`](manip_types::WorkOrder) names a bin and a product. The
//! [`Orchestrator`] locates the product, chooses an arm, walks the grasp
//! candidates it is given, approaches, grasps, lifts and retreats, and
//! recovers from collisions with a bounded number of unchecked escape
//! motions. Every order ends in an
//! [`ExecutionOutcome`](manip_types::ExecutionOutcome); a failed order never
//! stops the run, an aborted one does.
//!
//! # Overview
//!
//! - **State machine** ([`Orchestrator::pick`]): per-order sequencing and
//!   recovery, reported as a [`PickReport`]
//! - **Run loop** ([`Orchestrator::run`]): order lists with start and skip
//!   options
//! - **Service seams** ([`GraspService`], [`MotionPlanner`],
//!   [`TargetLocator`]): grasp generation, free-space planning, perception
//! - **Experience cache** ([`ExperienceCache`]): reuse of executed
//!   free-space plans
//! - **Order files** ([`OrderManifest`], [`load_config`]): JSON manifests and
//!   configuration
//!
//! # Example
//!
//! ```
//! use manip_exec::{ExecutionEngine, SimulatedController};
//! use manip_motion::{FreeSpace, GantryKinematics};
//! use manip_orchestrator::{FixedTargets, Orchestrator};
//! use manip_types::{
//!     ArmSide, ExecutionConfig, GraspCandidate, GripperPosture, KinematicChain,
//!     RobotConfiguration, RobotModel, WorkOrder,
//! };
//! use nalgebra::Isometry3;
//!
//! let robot = RobotModel::new().with_chain(GantryKinematics::chain(ArmSide::Left, 2.0, 1.0, 2.0));
//! let gantry = GantryKinematics::new();
//! let controller =
//!     SimulatedController::new().with_state(RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]));
//! let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
//!
//! let grasps = |target: &Isometry3<f64>, _: &KinematicChain| {
//!     vec![GraspCandidate::new(
//!         *target,
//!         Isometry3::translation(-0.1, 0.0, 0.0) * target,
//!         GripperPosture::new(vec![0.01]),
//!     )]
//! };
//! let targets = FixedTargets::new().with_product("sponge", Isometry3::translation(0.6, 0.2, 0.3));
//!
//! let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &grasps, &targets);
//! let report = orchestrator.pick(&WorkOrder::new("bin_A", "sponge"));
//! assert!(report.is_success());
//! ```
//!
//! # Feature Flags
//!
//! None. Order manifests and configuration files are always JSON.

#![doc(html_root_url = "https://docs.rs/manip-orchestrator/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod experience;
pub mod orchestrator;
pub mod order_source;
pub mod run;
pub mod services;

// Re-export main types for convenience
pub use error::{OrchestratorError, Result};
pub use experience::{ExperienceCache, ExperienceStats};
pub use orchestrator::{Orchestrator, PickReport, PickState};
pub use order_source::{OrderManifest, load_config};
pub use run::{RunOptions, RunSummary};
pub use services::{FixedTargets, GraspService, MotionPlanner, TargetLocator};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod integration_tests {
    use super::*;
    use manip_exec::{ExecutionEngine, SimulatedController, tactile_channel};
    use manip_motion::{FreeSpace, GantryKinematics};
    use manip_types::{
        ArmSide, ExecutionConfig, GraspCandidate, GripperPosture, InsertionConfig,
        KinematicChain, ManipulationConfig, OrchestratorConfig, RobotConfiguration, RobotModel,
    };
    use nalgebra::Isometry3;
    use std::time::Duration;

    fn grasps(target: &Isometry3<f64>, _: &KinematicChain) -> Vec<GraspCandidate> {
        vec![GraspCandidate::new(
            *target,
            Isometry3::translation(0.0, 0.0, 0.04) * target,
            GripperPosture::new(vec![0.015]),
        )]
    }

    /// Manifest to run: two orders from a file, both picked by the left arm.
    #[test]
    fn test_manifest_run() {
        let manifest = OrderManifest::from_json(
            r#"{
                "bin_contents": { "bin_A": ["glue_bottle", "sponge"] },
                "work_order": [
                    { "bin": "bin_A", "item": "glue_bottle" },
                    { "bin": "bin_A", "item": "sponge" }
                ]
            }"#,
        )
        .unwrap();
        let robot = RobotModel::new().with_chain(GantryKinematics::chain(ArmSide::Left, 2.0, 1.0, 2.0));
        let gantry = GantryKinematics::new();
        let home = RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]);
        let controller = SimulatedController::new().with_state(home.clone());
        let config = ManipulationConfig::default()
            .with_execution(ExecutionConfig::default().with_segment_points(4));
        let engine = ExecutionEngine::from_config(&controller, &FreeSpace, &config).unwrap();
        let targets = FixedTargets::new()
            .with_product("glue_bottle", Isometry3::translation(0.7, 0.1, 0.5))
            .with_product("sponge", Isometry3::translation(0.7, 0.3, 0.5));

        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &grasps, &targets)
            .configure(&config)
            .unwrap()
            .with_home(home);
        let summary = orchestrator.run(manifest.orders(), &RunOptions::new());
        assert_eq!(summary.succeeded(), 2);
        assert!(summary.reports.iter().all(|r| r.home.as_ref().is_some_and(|h| h.is_success())));
    }

    /// Invalid configuration is rejected before any order runs.
    #[test]
    fn test_configure_rejects_invalid() {
        let robot = RobotModel::new();
        let gantry = GantryKinematics::new();
        let controller = SimulatedController::new();
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let targets = FixedTargets::new();
        let config = ManipulationConfig::default()
            .with_orchestrator(OrchestratorConfig::default().with_max_candidates(0));
        let result = Orchestrator::new(&robot, &gantry, &engine, &grasps, &targets).configure(&config);
        assert!(matches!(result, Err(OrchestratorError::Manip(_))));
    }

    /// With insertion enabled but no sensor samples, each approach aborts into
    /// recovery and the order fails in planning without ending the run.
    #[test]
    fn test_silent_sensor_fails_order() {
        let robot = RobotModel::new().with_chain(GantryKinematics::chain(ArmSide::Left, 2.0, 1.0, 2.0));
        let gantry = GantryKinematics::new();
        let controller =
            SimulatedController::new().with_state(RobotConfiguration::new(ArmSide::Left, vec![0.0; 4]));
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let targets = FixedTargets::new().with_product("sponge", Isometry3::translation(0.7, 0.3, 0.5));
        let (_writer, reader) = tactile_channel();
        let insertion = InsertionConfig::default()
            .with_sample_timeout(Duration::from_millis(2))
            .with_max_sensor_faults(1);
        let config = OrchestratorConfig::default()
            .with_insertion(true)
            .with_max_recovery_attempts(1);

        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &grasps, &targets)
            .with_config(config)
            .with_insertion_config(insertion)
            .with_tactile(&reader, None);
        let summary = orchestrator.run(&[manip_types::WorkOrder::new("bin_A", "sponge")], &RunOptions::new());

        assert!(!summary.stopped);
        let report = &summary.reports[0];
        assert_eq!(report.outcome.kind(), manip_types::OutcomeKind::PlanningFailed);
        assert_eq!(report.recovery_count, 1);
        assert_eq!(report.visits(PickState::StreamingCorrection), 2);
        assert_eq!(report.insertion.as_ref().unwrap().sensor_faults, 2);
    }
}
