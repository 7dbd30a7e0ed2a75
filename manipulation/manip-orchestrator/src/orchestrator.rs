//! The per-order pick state machine.
//!
//! ```text
//! SelectGrasp ─▶ PlanApproach ─▶ Approach ─▶ Grasp ─▶ Lift ─▶ Retreat ─▶ Done
//!      ▲              │              │  ╲                 │        │
//!      └── too short ─┘              │   StreamingCorrection ─▶ Grasp
//!                                    ▼                    ▼        ▼
//!                                 Recover ◀──── collision / planning failure
//!                                    │
//!                                    └──▶ PlanApproach
//! ```
//!
//! Candidate order comes from the grasp service and is never changed. A
//! short approach moves on to the next candidate, up to
//! [`OrchestratorConfig::max_candidates`]. Collisions and planning failures
//! during motion enter `Recover`, which backs out along the reverse approach
//! direction with collision checking bypassed and then plans the approach
//! again. A controller fault reports `PlanningFailed` and recovers the same
//! way. Controller timeouts and aborts end the order immediately. Every
//! order ends with an [`ExecutionOutcome`] in its [`PickReport`].

use std::fmt;

use hashbrown::HashMap;
use manip_exec::{
    ExecutionEngine, GripperCommand, InsertionController, InsertionReport, InsertionState,
    TactileReader, TactileSensor,
};
use manip_motion::{
    ArmKinematics, ArmSelector, CollisionCheck, StraightLinePlanner, check_state,
};
use manip_types::{
    ArmSide, ExecutionOutcome, GraspCandidate, InsertionConfig, KinematicChain,
    ManipulationConfig, MotionPolicy, OrchestratorConfig, OutcomeKind, RobotConfiguration,
    RobotModel, StraightLineConfig, WorkOrder,
};
use nalgebra::{Unit, Vector3};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::experience::ExperienceCache;
use crate::services::{GraspService, MotionPlanner, TargetLocator};

/// States of a single pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PickState {
    /// Take the next grasp candidate.
    SelectGrasp,
    /// Solve the pre-grasp and the straight approach for the candidate.
    PlanApproach,
    /// Move to the pre-grasp and run the approach.
    Approach,
    /// Run the tactile insertion loop in place of the open-loop approach.
    StreamingCorrection,
    /// Close the gripper.
    Grasp,
    /// Lift along world +z.
    Lift,
    /// Back out against the approach direction.
    Retreat,
    /// Escape a failed motion without collision checking.
    Recover,
    /// The item is out.
    Done,
}

impl PickState {
    /// Returns a short snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SelectGrasp => "select_grasp",
            Self::PlanApproach => "plan_approach",
            Self::Approach => "approach",
            Self::StreamingCorrection => "streaming_correction",
            Self::Grasp => "grasp",
            Self::Lift => "lift",
            Self::Retreat => "retreat",
            Self::Recover => "recover",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PickState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one work order.
#[derive(Debug, Clone)]
pub struct PickReport {
    /// The order.
    pub order: WorkOrder,
    /// The arm that serviced it, once selected.
    pub side: Option<ArmSide>,
    /// Final outcome.
    pub outcome: ExecutionOutcome,
    /// Grasp candidates taken from the list.
    pub candidates_tried: usize,
    /// Recovery motions attempted.
    pub recovery_count: usize,
    /// Every state entered, in order.
    pub states_visited: Vec<PickState>,
    /// The last insertion run, if insertion was used.
    pub insertion: Option<InsertionReport>,
    /// Outcome of the move home after the order, if one was made.
    pub home: Option<ExecutionOutcome>,
}

impl PickReport {
    fn new(order: WorkOrder) -> Self {
        Self {
            order,
            side: None,
            outcome: ExecutionOutcome::succeeded(),
            candidates_tried: 0,
            recovery_count: 0,
            states_visited: Vec::new(),
            insertion: None,
            home: None,
        }
    }

    /// Returns `true` if the item was picked.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Number of times `state` was entered.
    #[must_use]
    pub fn visits(&self, state: PickState) -> usize {
        self.states_visited.iter().filter(|s| **s == state).count()
    }
}

enum Transition {
    To(PickState),
    Finish(ExecutionOutcome),
}

#[derive(Debug, Clone)]
struct ApproachPlan {
    pre_grasp: RobotConfiguration,
    path: Vec<RobotConfiguration>,
    direction: Option<Unit<Vector3<f64>>>,
    distance: f64,
}

struct Attempt<'c> {
    side: ArmSide,
    chain: &'c KinematicChain,
    candidates: Vec<GraspCandidate>,
    next: usize,
    candidate: Option<GraspCandidate>,
    plan: Option<ApproachPlan>,
    current: RobotConfiguration,
    last_failure: Option<ExecutionOutcome>,
}

/// Sequences grasp selection, approach, grasp, lift, retreat and recovery.
pub struct Orchestrator<'a> {
    robot: &'a RobotModel,
    kinematics: &'a dyn ArmKinematics,
    engine: &'a ExecutionEngine<'a>,
    grasps: &'a dyn GraspService,
    targets: &'a dyn TargetLocator,
    planner: Option<&'a dyn MotionPlanner>,
    tactile: Option<(&'a TactileReader, Option<&'a dyn TactileSensor>)>,
    selector: ArmSelector,
    straight_line: StraightLineConfig,
    insertion: InsertionConfig,
    config: OrchestratorConfig,
    experience: ExperienceCache,
    homes: HashMap<ArmSide, RobotConfiguration>,
}

impl<'a> Orchestrator<'a> {
    /// Creates an orchestrator with default configuration, no planner, and
    /// no tactile input.
    #[must_use]
    pub fn new(
        robot: &'a RobotModel,
        kinematics: &'a dyn ArmKinematics,
        engine: &'a ExecutionEngine<'a>,
        grasps: &'a dyn GraspService,
        targets: &'a dyn TargetLocator,
    ) -> Self {
        Self {
            robot,
            kinematics,
            engine,
            grasps,
            targets,
            planner: None,
            tactile: None,
            selector: ArmSelector::default(),
            straight_line: StraightLineConfig::default(),
            insertion: InsertionConfig::default(),
            config: OrchestratorConfig::default(),
            experience: ExperienceCache::default(),
            homes: HashMap::new(),
        }
    }

    /// Applies the straight-line, insertion and orchestrator sections of a
    /// loaded configuration. The trajectory and execution sections belong to
    /// the engine; build it with [`ExecutionEngine::from_config`].
    ///
    /// # Errors
    ///
    /// Returns the first validation error of `config`.
    pub fn configure(mut self, config: &ManipulationConfig) -> Result<Self> {
        config.validate()?;
        self.straight_line = config.straight_line.clone();
        self.insertion = config.insertion.clone();
        self.config = config.orchestrator.clone();
        Ok(self)
    }

    /// Sets the pick policy.
    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the straight-line path settings.
    #[must_use]
    pub fn with_straight_line(mut self, config: StraightLineConfig) -> Self {
        self.straight_line = config;
        self
    }

    /// Sets the insertion settings.
    #[must_use]
    pub fn with_insertion_config(mut self, config: InsertionConfig) -> Self {
        self.insertion = config;
        self
    }

    /// Sets the arm selector.
    #[must_use]
    pub const fn with_selector(mut self, selector: ArmSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Plans free-space moves with `planner` instead of moving directly.
    #[must_use]
    pub fn with_planner(mut self, planner: &'a dyn MotionPlanner) -> Self {
        self.planner = Some(planner);
        self
    }

    /// Feeds the insertion loop from `reader`, recalibrating `sensor` first.
    #[must_use]
    pub fn with_tactile(
        mut self,
        reader: &'a TactileReader,
        sensor: Option<&'a dyn TactileSensor>,
    ) -> Self {
        self.tactile = Some((reader, sensor));
        self
    }

    /// Registers the home configuration of an arm.
    #[must_use]
    pub fn with_home(mut self, home: RobotConfiguration) -> Self {
        self.homes.insert(home.side(), home);
        self
    }

    /// Replaces the experience cache.
    #[must_use]
    pub fn with_experience_cache(mut self, cache: ExperienceCache) -> Self {
        self.experience = cache;
        self
    }

    /// Returns the pick policy.
    #[must_use]
    pub const fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Returns the experience cache.
    #[must_use]
    pub const fn experience(&self) -> &ExperienceCache {
        &self.experience
    }

    /// Returns the execution engine.
    #[must_use]
    pub fn engine(&self) -> &'a ExecutionEngine<'a> {
        self.engine
    }

    /// Runs one work order to a terminal outcome.
    pub fn pick(&mut self, order: &WorkOrder) -> PickReport {
        let mut report = PickReport::new(order.clone());
        info!(order = %order, "Starting pick");

        let target = match self.targets.locate(order) {
            Ok(pose) => pose,
            Err(error) => return self.finish(report, None, ExecutionOutcome::from(error)),
        };
        let robot = self.robot;
        let chain = match self
            .selector
            .select(robot, &target)
            .and_then(|side| robot.require_chain(side))
        {
            Ok(chain) => chain,
            Err(error) => return self.finish(report, None, ExecutionOutcome::from(error)),
        };
        let side = chain.side();
        report.side = Some(side);

        let Some(current) = self
            .engine
            .current_state(side)
            .or_else(|| self.homes.get(&side).cloned())
        else {
            let outcome = ExecutionOutcome::planning_failed(format!("current state of {side} unknown"));
            return self.finish(report, Some(chain), outcome);
        };

        let candidates = self.grasps.generate_and_filter(&target, chain);
        debug!(side = %side, candidates = candidates.len(), "Grasp candidates received");

        let mut attempt = Attempt {
            side,
            chain,
            candidates,
            next: 0,
            candidate: None,
            plan: None,
            current,
            last_failure: None,
        };
        let mut state = PickState::SelectGrasp;
        loop {
            report.states_visited.push(state);
            debug!(state = %state, "Entering pick state");
            let transition = match state {
                PickState::SelectGrasp => self.select_grasp(&mut attempt, &mut report),
                PickState::PlanApproach => self.plan_approach(&mut attempt),
                PickState::Approach => self.approach(&mut attempt),
                PickState::StreamingCorrection => self.stream_correction(&mut attempt, &mut report),
                PickState::Grasp => self.grasp(&mut attempt),
                PickState::Lift => {
                    let policy = *self.config.lift();
                    let outcome =
                        self.cartesian_move(&mut attempt, &Vector3::z(), &policy, CollisionCheck::Enforce);
                    self.after_motion(&mut attempt, outcome, PickState::Retreat)
                }
                PickState::Retreat => {
                    let policy = *self.config.retreat();
                    let direction = retreat_direction(attempt.plan.as_ref());
                    let outcome =
                        self.cartesian_move(&mut attempt, &direction, &policy, CollisionCheck::Enforce);
                    self.after_motion(&mut attempt, outcome, PickState::Done)
                }
                PickState::Recover => self.recover(&mut attempt, &mut report),
                PickState::Done => Transition::Finish(ExecutionOutcome::succeeded()),
            };
            match transition {
                Transition::To(next) => state = next,
                Transition::Finish(outcome) => return self.finish(report, Some(chain), outcome),
            }
        }
    }

    fn select_grasp(&self, attempt: &mut Attempt<'_>, report: &mut PickReport) -> Transition {
        if report.candidates_tried >= self.config.max_candidates()
            || attempt.next >= attempt.candidates.len()
        {
            return Transition::Finish(ExecutionOutcome::planning_failed(format!(
                "no feasible grasp after {} of {} candidates",
                report.candidates_tried,
                attempt.candidates.len()
            )));
        }
        attempt.candidate = Some(attempt.candidates[attempt.next].clone());
        attempt.plan = None;
        attempt.next += 1;
        report.candidates_tried += 1;
        info!(candidate = report.candidates_tried, "Selected grasp candidate");
        Transition::To(PickState::PlanApproach)
    }

    fn plan_approach(&self, attempt: &mut Attempt<'_>) -> Transition {
        let Some(candidate) = attempt.candidate.as_ref() else {
            return Transition::To(PickState::SelectGrasp);
        };
        let chain = attempt.chain;
        let Some(pre_grasp) =
            self.kinematics
                .inverse(chain, candidate.pre_grasp_pose(), &attempt.current, f64::INFINITY)
        else {
            debug!("Pre-grasp pose unreachable");
            return Transition::To(PickState::SelectGrasp);
        };
        let verdict = check_state(self.engine.validity(), &pre_grasp, chain, CollisionCheck::Enforce);
        if !verdict.is_valid() {
            debug!(?verdict, "Pre-grasp configuration invalid");
            return Transition::To(PickState::SelectGrasp);
        }

        let distance = candidate.approach_distance();
        let direction = candidate.approach_direction();
        let path = match direction {
            None => vec![pre_grasp.clone()],
            Some(axis) => {
                let planner = self.line_planner();
                let path = match planner.compute_straight_line_path(
                    &axis.into_inner(),
                    distance,
                    &pre_grasp,
                    chain,
                    false,
                    CollisionCheck::Enforce,
                ) {
                    Ok(path) => path,
                    Err(error) => {
                        debug!(%error, "Approach path failed");
                        return Transition::To(PickState::SelectGrasp);
                    }
                };
                let policy = self.config.approach().with_distance(distance);
                if !policy.accepts(path.achieved_length()) {
                    info!(
                        achieved = path.achieved_length(),
                        requested = distance,
                        "Approach too short, trying next candidate"
                    );
                    return Transition::To(PickState::SelectGrasp);
                }
                path.into_configurations()
            }
        };
        attempt.plan = Some(ApproachPlan {
            pre_grasp,
            path,
            direction,
            distance,
        });
        Transition::To(PickState::Approach)
    }

    fn approach(&mut self, attempt: &mut Attempt<'_>) -> Transition {
        let Some(plan) = attempt.plan.clone() else {
            return Transition::To(PickState::PlanApproach);
        };
        let chain = attempt.chain;

        let outcome = self.move_free(chain, &attempt.current, &plan.pre_grasp);
        if !outcome.is_success() {
            return self.after_motion(attempt, outcome, PickState::Approach);
        }
        attempt.current = self.measured(attempt.side, plan.pre_grasp.clone());

        let outcome = self.engine.set_gripper(attempt.side, &GripperCommand::Open);
        if !outcome.is_success() {
            return self.after_motion(attempt, outcome, PickState::Approach);
        }

        if self.config.use_insertion() && self.tactile.is_some() && plan.direction.is_some() {
            return Transition::To(PickState::StreamingCorrection);
        }
        if plan.path.len() < 2 {
            return Transition::To(PickState::Grasp);
        }
        let outcome = self.engine.execute_path(
            &plan.path,
            chain,
            self.config.approach().velocity_scale(),
            CollisionCheck::Enforce,
        );
        if outcome.is_success() {
            if let Some(last) = plan.path.last() {
                attempt.current = self.measured(attempt.side, last.clone());
            }
        }
        self.after_motion(attempt, outcome, PickState::Grasp)
    }

    fn stream_correction(&self, attempt: &mut Attempt<'_>, report: &mut PickReport) -> Transition {
        let (Some((reader, sensor)), Some(plan)) = (self.tactile, attempt.plan.as_ref()) else {
            return Transition::To(PickState::Approach);
        };
        let Some(direction) = plan.direction else {
            return Transition::To(PickState::Grasp);
        };
        let config = self.insertion.clone().with_target_depth(plan.distance);
        let mut controller = InsertionController::new(self.engine, self.kinematics, config)
            .with_consistency_limit(self.straight_line.consistency_limit());
        let result = controller.run(
            attempt.chain,
            &attempt.current,
            &direction.into_inner(),
            reader,
            sensor,
        );
        attempt.current = self.measured(attempt.side, result.final_configuration.clone());
        let achieved = result.state == InsertionState::Achieved;
        let outcome = result.outcome.clone();
        report.insertion = Some(result);

        if achieved {
            return Transition::To(PickState::Grasp);
        }
        self.after_motion(attempt, outcome, PickState::Grasp)
    }

    fn grasp(&self, attempt: &mut Attempt<'_>) -> Transition {
        let Some(candidate) = attempt.candidate.as_ref() else {
            return Transition::To(PickState::SelectGrasp);
        };
        let command = GripperCommand::Close(candidate.posture().clone());
        let outcome = self.engine.set_gripper(attempt.side, &command);
        self.after_motion(attempt, outcome, PickState::Lift)
    }

    fn recover(&self, attempt: &mut Attempt<'_>, report: &mut PickReport) -> Transition {
        if report.recovery_count >= self.config.max_recovery_attempts() {
            let outcome = attempt.last_failure.take().unwrap_or_else(|| {
                ExecutionOutcome::planning_failed("recovery attempts exhausted")
            });
            warn!(
                recoveries = report.recovery_count,
                outcome = %outcome,
                "Recovery attempts exhausted"
            );
            return Transition::Finish(outcome);
        }
        report.recovery_count += 1;
        attempt.current = self.measured(attempt.side, attempt.current.clone());

        let policy = *self.config.recovery();
        let direction = retreat_direction(attempt.plan.as_ref());
        warn!(
            attempt = report.recovery_count,
            distance = policy.distance(),
            "Recovering with unchecked retreat"
        );
        let outcome = self.cartesian_move(
            attempt,
            &direction,
            &policy,
            CollisionCheck::BypassForRecovery,
        );
        match outcome.kind() {
            OutcomeKind::Succeeded => Transition::To(PickState::PlanApproach),
            OutcomeKind::ControllerTimeout | OutcomeKind::Aborted => Transition::Finish(outcome),
            OutcomeKind::PlanningFailed | OutcomeKind::CollisionDetected => {
                debug!(outcome = %outcome, "Recovery motion failed");
                Transition::To(PickState::Recover)
            }
        }
    }

    /// Plans and executes a straight-line motion from the current state,
    /// accepting a shortfall only as far as `policy` allows.
    fn cartesian_move(
        &self,
        attempt: &mut Attempt<'_>,
        direction: &Vector3<f64>,
        policy: &MotionPolicy,
        check: CollisionCheck,
    ) -> ExecutionOutcome {
        let chain = attempt.chain;
        let path = match self.line_planner().compute_straight_line_path(
            direction,
            policy.distance(),
            &attempt.current,
            chain,
            false,
            check,
        ) {
            Ok(path) => path,
            Err(error) => return ExecutionOutcome::from(error),
        };
        if !policy.accepts(path.achieved_length()) {
            return ExecutionOutcome::planning_failed(format!(
                "straight-line motion achieved {:.4} of {:.4} m",
                path.achieved_length(),
                policy.distance()
            ));
        }
        if path.achieved_length() + policy.tolerance() < policy.distance() {
            info!(
                achieved = path.achieved_length(),
                requested = policy.distance(),
                "Executing partial straight-line motion"
            );
        }
        if path.configurations().len() < 2 {
            return ExecutionOutcome::succeeded();
        }
        let outcome =
            self.engine
                .execute_path(path.configurations(), chain, policy.velocity_scale(), check);
        if outcome.is_success() {
            if let Some(last) = path.last() {
                attempt.current = self.measured(attempt.side, last.clone());
            }
        }
        outcome
    }

    fn move_free(
        &mut self,
        chain: &KinematicChain,
        start: &RobotConfiguration,
        goal: &RobotConfiguration,
    ) -> ExecutionOutcome {
        let scale = self.config.free_space_velocity_scale();
        let Some(planner) = self.planner else {
            return self.engine.execute_path(
                &[start.clone(), goal.clone()],
                chain,
                scale,
                CollisionCheck::Enforce,
            );
        };
        let use_experience = self.config.use_experience();
        let cached = if use_experience {
            self.experience.lookup(start, goal)
        } else {
            None
        };
        let fresh = cached.is_none();
        let path = match cached {
            Some(path) => path,
            None => match planner.plan(start, goal, chain) {
                Ok(path) => path,
                Err(error) => return ExecutionOutcome::from(error),
            },
        };
        let outcome = self
            .engine
            .execute_path(&path, chain, scale, CollisionCheck::Enforce);
        if outcome.is_success() && fresh && use_experience {
            self.experience.record(start, goal, path);
        } else if !outcome.is_success() && !fresh {
            debug!(outcome = %outcome, "Cached plan failed, evicting");
            self.experience.forget(start, goal);
        }
        outcome
    }

    /// Routes a motion outcome: success continues, collisions and planning
    /// failures recover, everything else ends the order.
    fn after_motion(
        &self,
        attempt: &mut Attempt<'_>,
        outcome: ExecutionOutcome,
        next: PickState,
    ) -> Transition {
        match outcome.kind() {
            OutcomeKind::Succeeded => Transition::To(next),
            OutcomeKind::CollisionDetected | OutcomeKind::PlanningFailed => {
                warn!(outcome = %outcome, "Motion failed, entering recovery");
                attempt.current = self.measured(attempt.side, attempt.current.clone());
                attempt.last_failure = Some(outcome);
                Transition::To(PickState::Recover)
            }
            OutcomeKind::ControllerTimeout | OutcomeKind::Aborted => Transition::Finish(outcome),
        }
    }

    fn measured(&self, side: ArmSide, fallback: RobotConfiguration) -> RobotConfiguration {
        self.engine.current_state(side).unwrap_or(fallback)
    }

    fn line_planner(&self) -> StraightLinePlanner<'_> {
        StraightLinePlanner::new(
            self.kinematics,
            self.engine.validity(),
            self.straight_line.clone(),
        )
    }

    fn finish(
        &self,
        mut report: PickReport,
        chain: Option<&KinematicChain>,
        outcome: ExecutionOutcome,
    ) -> PickReport {
        let go_home = self.config.return_home()
            && !matches!(
                outcome.kind(),
                OutcomeKind::Aborted | OutcomeKind::ControllerTimeout
            );
        if let Some(chain) = chain.filter(|_| go_home) {
            if let Some(home) = self.homes.get(&chain.side()) {
                let home_outcome =
                    self.engine
                        .execute_state(home, chain, self.config.free_space_velocity_scale());
                if !home_outcome.is_success() {
                    warn!(outcome = %home_outcome, "Failed to return home");
                }
                report.home = Some(home_outcome);
            }
        }
        if outcome.is_success() {
            info!(
                order = %report.order,
                candidates = report.candidates_tried,
                recoveries = report.recovery_count,
                "Pick succeeded"
            );
        } else {
            warn!(
                order = %report.order,
                outcome = %outcome,
                candidates = report.candidates_tried,
                recoveries = report.recovery_count,
                "Pick failed"
            );
        }
        report.outcome = outcome;
        report
    }
}

fn retreat_direction(plan: Option<&ApproachPlan>) -> Vector3<f64> {
    plan.and_then(|p| p.direction)
        .map_or_else(Vector3::z, |axis| -axis.into_inner())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::FixedTargets;
    use manip_exec::{ControllerClient, ControllerStatus, MotionCommand, SimulatedController};
    use manip_motion::{FreeSpace, GantryKinematics};
    use manip_types::{ExecutionConfig, GripperPosture};
    use nalgebra::Isometry3;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn robot() -> RobotModel {
        RobotModel::new()
            .with_chain(GantryKinematics::chain(ArmSide::Left, 2.0, 1.0, 2.0))
            .with_chain(GantryKinematics::chain(ArmSide::Right, 2.0, 1.0, 2.0))
    }

    fn home(side: ArmSide) -> RobotConfiguration {
        RobotConfiguration::new(side, vec![0.0; 4])
    }

    fn front_grasps(target: &Isometry3<f64>, _: &KinematicChain) -> Vec<GraspCandidate> {
        vec![GraspCandidate::new(
            *target,
            Isometry3::translation(-0.1, 0.0, 0.0) * target,
            GripperPosture::new(vec![0.01]),
        )]
    }

    #[test]
    fn test_state_names() {
        assert_eq!(PickState::StreamingCorrection.to_string(), "streaming_correction");
        assert_eq!(PickState::Done.as_str(), "done");
    }

    #[test]
    fn test_happy_path_visits_every_stage() {
        let robot = robot();
        let gantry = GantryKinematics::new();
        let controller = SimulatedController::new().with_state(home(ArmSide::Right));
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let targets = FixedTargets::new().with_product("sponge", Isometry3::translation(0.6, -0.3, 0.2));
        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &front_grasps, &targets)
            .with_home(home(ArmSide::Right));

        let report = orchestrator.pick(&WorkOrder::new("bin_C", "sponge"));

        assert!(report.is_success(), "{}", report.outcome);
        assert_eq!(report.side, Some(ArmSide::Right));
        assert_eq!(
            report.states_visited,
            vec![
                PickState::SelectGrasp,
                PickState::PlanApproach,
                PickState::Approach,
                PickState::Grasp,
                PickState::Lift,
                PickState::Retreat,
                PickState::Done,
            ]
        );
        assert_eq!(report.candidates_tried, 1);
        assert!(report.home.as_ref().unwrap().is_success());
        assert!(
            controller
                .current_state(ArmSide::Right)
                .unwrap()
                .approx_eq(&home(ArmSide::Right), 1e-12)
        );
    }

    #[test]
    fn test_unknown_product_fails_in_planning() {
        let robot = robot();
        let gantry = GantryKinematics::new();
        let controller = SimulatedController::new();
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let targets = FixedTargets::new();
        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &front_grasps, &targets);
        let report = orchestrator.pick(&WorkOrder::new("bin_A", "ghost"));
        assert_eq!(report.outcome.kind(), OutcomeKind::PlanningFailed);
        assert!(report.states_visited.is_empty());
        assert_eq!(controller.dispatch_count(), 0);
    }

    #[test]
    fn test_no_candidates() {
        let robot = robot();
        let gantry = GantryKinematics::new();
        let controller = SimulatedController::new().with_state(home(ArmSide::Left));
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let targets = FixedTargets::new().with_product("glue", Isometry3::translation(0.5, 0.3, 0.0));
        let none = |_: &Isometry3<f64>, _: &KinematicChain| -> Vec<GraspCandidate> { Vec::new() };
        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &none, &targets);
        let report = orchestrator.pick(&WorkOrder::new("bin_A", "glue"));
        assert_eq!(report.outcome.kind(), OutcomeKind::PlanningFailed);
        assert_eq!(report.candidates_tried, 0);
    }

    #[test]
    fn test_timeout_ends_order_without_recovery() {
        let robot = robot();
        let gantry = GantryKinematics::new();
        let controller = SimulatedController::new()
            .with_state(home(ArmSide::Right))
            .with_script(|command| match command {
                MotionCommand::Gripper { .. } => None,
                MotionCommand::Trajectory(_) => Some(ControllerStatus::Completed),
            });
        let config = ExecutionConfig::default().with_gripper_timeout(std::time::Duration::from_millis(10));
        let engine = ExecutionEngine::new(&controller, &FreeSpace, config);
        let targets = FixedTargets::new().with_product("sponge", Isometry3::translation(0.6, -0.3, 0.2));
        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &front_grasps, &targets);
        let report = orchestrator.pick(&WorkOrder::new("bin_C", "sponge"));
        assert_eq!(report.outcome.kind(), OutcomeKind::ControllerTimeout);
        assert_eq!(report.recovery_count, 0);
        assert!(report.home.is_none());
    }

    #[test]
    fn test_planner_results_are_cached() {
        let robot = robot();
        let gantry = GantryKinematics::new();
        let controller = SimulatedController::new().with_state(home(ArmSide::Right));
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let targets = FixedTargets::new().with_product("sponge", Isometry3::translation(0.6, -0.3, 0.2));
        let calls = AtomicUsize::new(0);
        let planner = |start: &RobotConfiguration,
                       goal: &RobotConfiguration,
                       _: &KinematicChain|
         -> manip_types::Result<Vec<RobotConfiguration>> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![start.clone(), goal.clone()])
        };
        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &front_grasps, &targets)
            .with_planner(&planner)
            .with_home(home(ArmSide::Right));

        assert!(orchestrator.pick(&WorkOrder::new("bin_C", "sponge")).is_success());
        assert!(orchestrator.pick(&WorkOrder::new("bin_C", "sponge")).is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = orchestrator.experience().stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn test_failed_cached_plan_is_evicted() {
        let robot = robot();
        let gantry = GantryKinematics::new();
        let fail_next = Arc::new(AtomicBool::new(false));
        let trip = Arc::clone(&fail_next);
        let controller = SimulatedController::new()
            .with_state(home(ArmSide::Right))
            .with_script(move |command| match command {
                MotionCommand::Trajectory(_) if trip.swap(false, Ordering::SeqCst) => {
                    Some(ControllerStatus::Collision {
                        links: vec!["bin_lip".into()],
                    })
                }
                _ => Some(ControllerStatus::Completed),
            });
        let engine = ExecutionEngine::new(&controller, &FreeSpace, ExecutionConfig::default());
        let targets = FixedTargets::new().with_product("sponge", Isometry3::translation(0.6, -0.3, 0.2));
        let calls = AtomicUsize::new(0);
        let planner = |start: &RobotConfiguration,
                       goal: &RobotConfiguration,
                       _: &KinematicChain|
         -> manip_types::Result<Vec<RobotConfiguration>> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![start.clone(), goal.clone()])
        };
        let config = OrchestratorConfig::default().with_max_recovery_attempts(0);
        let mut orchestrator = Orchestrator::new(&robot, &gantry, &engine, &front_grasps, &targets)
            .with_config(config)
            .with_planner(&planner)
            .with_home(home(ArmSide::Right));
        let order = WorkOrder::new("bin_C", "sponge");

        assert!(orchestrator.pick(&order).is_success());
        assert_eq!(orchestrator.experience().stats().entries, 1);

        fail_next.store(true, Ordering::SeqCst);
        let report = orchestrator.pick(&order);
        assert_eq!(report.outcome.kind(), OutcomeKind::CollisionDetected);
        assert_eq!(orchestrator.experience().stats().hits, 1);
        assert_eq!(orchestrator.experience().stats().entries, 0);

        assert!(orchestrator.pick(&order).is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(orchestrator.experience().stats().entries, 1);
    }

    #[test]
    fn test_strict_lift_shortfall_recovers() {
        let robot = robot();
        let gantry = GantryKinematics::new();
        let controller = SimulatedController::new().with_state(home(ArmSide::Right));
        // A shelf roof 5 cm above the grasp height.
        let roof = |c: &RobotConfiguration, _: &KinematicChain| {
            if c.values()[2] > 0.25 {
                manip_motion::Validity::Colliding {
                    links: vec!["shelf_roof".into()],
                }
            } else {
                manip_motion::Validity::Valid
            }
        };
        let engine = ExecutionEngine::new(&controller, &roof, ExecutionConfig::default());
        let targets = FixedTargets::new().with_product("sponge", Isometry3::translation(0.6, -0.3, 0.2));
        let config = OrchestratorConfig::default()
            .with_lift(MotionPolicy::new(0.1, 0.3, false))
            .with_max_recovery_attempts(1);
        let mut orchestrator =
            Orchestrator::new(&robot, &gantry, &engine, &front_grasps, &targets).with_config(config);
        let report = orchestrator.pick(&WorkOrder::new("bin_C", "sponge"));
        assert_eq!(report.outcome.kind(), OutcomeKind::PlanningFailed);
        assert_eq!(report.recovery_count, 1);
        assert_eq!(report.visits(PickState::Lift), 2);
    }
}
