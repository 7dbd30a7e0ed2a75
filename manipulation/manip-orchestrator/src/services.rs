//! Seams to the external services a pick depends on.
//!
//! The orchestrator never generates grasps, plans free-space motion, or
//! estimates object poses itself. It consumes them through these traits.
//! Closures with the matching signature implement the grasp and planner
//! traits directly, which keeps tests and dry runs short.

use hashbrown::HashMap;
use manip_types::{
    GraspCandidate, KinematicChain, ManipError, Result, RobotConfiguration, WorkOrder,
};
use nalgebra::Isometry3;

/// Produces grasp candidates for a target, already filtered and ranked.
///
/// The orchestrator takes the list order as authoritative and never
/// re-ranks it.
pub trait GraspService: Send + Sync {
    /// Returns acceptable candidates for `target`, best first.
    fn generate_and_filter(
        &self,
        target: &Isometry3<f64>,
        chain: &KinematicChain,
    ) -> Vec<GraspCandidate>;
}

impl<F> GraspService for F
where
    F: Fn(&Isometry3<f64>, &KinematicChain) -> Vec<GraspCandidate> + Send + Sync,
{
    fn generate_and_filter(
        &self,
        target: &Isometry3<f64>,
        chain: &KinematicChain,
    ) -> Vec<GraspCandidate> {
        self(target, chain)
    }
}

/// Free-space motion planner.
pub trait MotionPlanner: Send + Sync {
    /// Plans a collision-free configuration sequence from `start` to `goal`.
    ///
    /// The result is time-parameterized and re-validated by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::PlanningFailed`] when no path exists.
    fn plan(
        &self,
        start: &RobotConfiguration,
        goal: &RobotConfiguration,
        chain: &KinematicChain,
    ) -> Result<Vec<RobotConfiguration>>;
}

impl<F> MotionPlanner for F
where
    F: Fn(&RobotConfiguration, &RobotConfiguration, &KinematicChain) -> Result<Vec<RobotConfiguration>>
        + Send
        + Sync,
{
    fn plan(
        &self,
        start: &RobotConfiguration,
        goal: &RobotConfiguration,
        chain: &KinematicChain,
    ) -> Result<Vec<RobotConfiguration>> {
        self(start, goal, chain)
    }
}

/// Resolves where the product of a work order is.
pub trait TargetLocator: Send + Sync {
    /// Returns the world pose of the order's product.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::PlanningFailed`] if the product cannot be located.
    fn locate(&self, order: &WorkOrder) -> Result<Isometry3<f64>>;
}

/// A locator backed by a fixed table of product poses.
///
/// # Example
///
/// ```
/// use manip_orchestrator::{FixedTargets, TargetLocator};
/// use manip_types::WorkOrder;
/// use nalgebra::Isometry3;
///
/// let targets = FixedTargets::new().with_product("duct_tape", Isometry3::translation(0.8, 0.2, 1.1));
///
/// assert!(targets.locate(&WorkOrder::new("bin_B", "duct_tape")).is_ok());
/// assert!(targets.locate(&WorkOrder::new("bin_B", "glue")).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FixedTargets {
    poses: HashMap<String, Isometry3<f64>>,
}

impl FixedTargets {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product pose.
    #[must_use]
    pub fn with_product(mut self, product: impl Into<String>, pose: Isometry3<f64>) -> Self {
        self.insert(product, pose);
        self
    }

    /// Adds or replaces a product pose.
    pub fn insert(&mut self, product: impl Into<String>, pose: Isometry3<f64>) {
        self.poses.insert(product.into(), pose);
    }

    /// Number of known products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Returns `true` if no product is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}

impl TargetLocator for FixedTargets {
    fn locate(&self, order: &WorkOrder) -> Result<Isometry3<f64>> {
        self.poses
            .get(order.product())
            .copied()
            .ok_or_else(|| ManipError::planning(format!("no pose known for {order}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use manip_types::{ArmSide, GripperPosture};

    #[test]
    fn test_closure_services() {
        let grasps = |target: &Isometry3<f64>, _: &KinematicChain| {
            vec![GraspCandidate::new(
                *target,
                Isometry3::translation(-0.1, 0.0, 0.0) * target,
                GripperPosture::default(),
            )]
        };
        let chain = KinematicChain::new(ArmSide::Left, vec![]);
        let target = Isometry3::translation(0.5, 0.0, 1.0);
        let candidates = grasps.generate_and_filter(&target, &chain);
        assert_eq!(candidates.len(), 1);

        let planner = |start: &RobotConfiguration,
                       goal: &RobotConfiguration,
                       _: &KinematicChain|
         -> Result<Vec<RobotConfiguration>> { Ok(vec![start.clone(), goal.clone()]) };
        let a = RobotConfiguration::new(ArmSide::Left, vec![]);
        assert_eq!(planner.plan(&a, &a, &chain).unwrap().len(), 2);
    }

    #[test]
    fn test_fixed_targets() {
        let mut targets = FixedTargets::new();
        assert!(targets.is_empty());
        targets.insert("glue", Isometry3::translation(1.0, 0.0, 0.0));
        assert_eq!(targets.len(), 1);
        let pose = targets.locate(&WorkOrder::new("bin_A", "glue")).unwrap();
        assert_eq!(pose.translation.vector.x, 1.0);
        let err = targets.locate(&WorkOrder::new("bin_A", "tape")).unwrap_err();
        assert!(err.is_planning_failure());
    }
}
