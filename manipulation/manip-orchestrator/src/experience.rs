//! Experience cache for free-space plans.
//!
//! Successful plans are stored under a key made of the arm and the start and
//! goal configurations quantized to a fixed resolution. A hit returns the
//! stored configurations with the endpoints replaced by the exact start and
//! goal of the request. The caller still time-parameterizes and re-validates
//! the result like a fresh plan. A stored plan that later fails to execute
//! is forgotten.

use hashbrown::HashMap;
use manip_types::{ArmSide, RobotConfiguration};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ExperienceKey {
    side: ArmSide,
    start: Vec<i64>,
    goal: Vec<i64>,
}

/// Lookup counters of an [`ExperienceCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExperienceStats {
    /// Lookups answered from the cache.
    pub hits: usize,
    /// Lookups that fell through to the planner.
    pub misses: usize,
    /// Stored plans.
    pub entries: usize,
}

impl ExperienceStats {
    /// Fraction of lookups that hit, or 0 with no lookups.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// In-memory store of previously executed free-space plans.
///
/// # Example
///
/// ```
/// use manip_orchestrator::ExperienceCache;
/// use manip_types::{ArmSide, RobotConfiguration};
///
/// let mut cache = ExperienceCache::new(1e-3);
/// let start = RobotConfiguration::new(ArmSide::Left, vec![0.0, 0.0]);
/// let goal = RobotConfiguration::new(ArmSide::Left, vec![0.5, 0.2]);
///
/// assert!(cache.lookup(&start, &goal).is_none());
/// cache.record(&start, &goal, vec![start.clone(), goal.clone()]);
/// assert_eq!(cache.lookup(&start, &goal).map(|p| p.len()), Some(2));
///
/// let stats = cache.stats();
/// assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
/// ```
#[derive(Debug, Clone)]
pub struct ExperienceCache {
    resolution: f64,
    plans: HashMap<ExperienceKey, Vec<RobotConfiguration>>,
    hits: usize,
    misses: usize,
}

impl ExperienceCache {
    /// Creates an empty cache keyed at `resolution` radians (or metres).
    #[must_use]
    pub fn new(resolution: f64) -> Self {
        Self {
            resolution,
            plans: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the key resolution.
    #[must_use]
    pub const fn resolution(&self) -> f64 {
        self.resolution
    }

    #[allow(clippy::cast_possible_truncation)]
    fn quantize(&self, configuration: &RobotConfiguration) -> Vec<i64> {
        configuration
            .values()
            .iter()
            .map(|v| (v / self.resolution).round() as i64)
            .collect()
    }

    fn key(&self, start: &RobotConfiguration, goal: &RobotConfiguration) -> ExperienceKey {
        ExperienceKey {
            side: start.side(),
            start: self.quantize(start),
            goal: self.quantize(goal),
        }
    }

    /// Returns a stored plan for the start/goal pair, if any.
    pub fn lookup(
        &mut self,
        start: &RobotConfiguration,
        goal: &RobotConfiguration,
    ) -> Option<Vec<RobotConfiguration>> {
        let key = self.key(start, goal);
        let Some(stored) = self.plans.get(&key) else {
            self.misses += 1;
            trace!(side = %start.side(), "Experience miss");
            return None;
        };
        let mut plan = stored.clone();
        self.hits += 1;
        trace!(side = %start.side(), points = plan.len(), "Experience hit");
        if let Some(first) = plan.first_mut() {
            *first = start.clone();
        }
        if plan.len() > 1 {
            if let Some(last) = plan.last_mut() {
                *last = goal.clone();
            }
        }
        Some(plan)
    }

    /// Stores a plan that executed successfully.
    pub fn record(
        &mut self,
        start: &RobotConfiguration,
        goal: &RobotConfiguration,
        plan: Vec<RobotConfiguration>,
    ) {
        if plan.is_empty() {
            return;
        }
        let key = self.key(start, goal);
        self.plans.insert(key, plan);
    }

    /// Drops the plan stored for the start/goal pair. Returns `true` if one
    /// was stored.
    pub fn forget(&mut self, start: &RobotConfiguration, goal: &RobotConfiguration) -> bool {
        let key = self.key(start, goal);
        let removed = self.plans.remove(&key).is_some();
        if removed {
            trace!(side = %start.side(), "Experience evicted");
        }
        removed
    }

    /// Drops every stored plan and resets the counters.
    pub fn clear(&mut self) {
        self.plans.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Returns the lookup counters.
    #[must_use]
    pub fn stats(&self) -> ExperienceStats {
        ExperienceStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.plans.len(),
        }
    }
}

impl Default for ExperienceCache {
    fn default() -> Self {
        Self::new(1e-3)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn config(side: ArmSide, values: &[f64]) -> RobotConfiguration {
        RobotConfiguration::new(side, values.to_vec())
    }

    #[test]
    fn test_nearby_request_hits_with_exact_endpoints() {
        let mut cache = ExperienceCache::new(0.01);
        let start = config(ArmSide::Right, &[0.0, 0.0]);
        let via = config(ArmSide::Right, &[0.2, 0.3]);
        let goal = config(ArmSide::Right, &[0.4, 0.1]);
        cache.record(&start, &goal, vec![start.clone(), via.clone(), goal.clone()]);

        let near_start = config(ArmSide::Right, &[0.001, -0.002]);
        let plan = cache.lookup(&near_start, &goal).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], near_start);
        assert_eq!(plan[1], via);
        assert_eq!(plan[2], goal);
    }

    #[test]
    fn test_sides_are_separate() {
        let mut cache = ExperienceCache::default();
        let start = config(ArmSide::Left, &[0.0]);
        let goal = config(ArmSide::Left, &[1.0]);
        cache.record(&start, &goal, vec![start.clone(), goal.clone()]);
        let right_start = config(ArmSide::Right, &[0.0]);
        let right_goal = config(ArmSide::Right, &[1.0]);
        assert!(cache.lookup(&right_start, &right_goal).is_none());
        assert_relative_eq!(cache.stats().hit_rate(), 0.0);
    }

    #[test]
    fn test_empty_plan_not_recorded_and_clear() {
        let mut cache = ExperienceCache::default();
        let start = config(ArmSide::Left, &[0.0]);
        let goal = config(ArmSide::Left, &[1.0]);
        cache.record(&start, &goal, vec![]);
        assert_eq!(cache.stats().entries, 0);

        cache.record(&start, &goal, vec![start.clone(), goal.clone()]);
        assert!(cache.lookup(&start, &goal).is_some());
        assert_relative_eq!(cache.stats().hit_rate(), 1.0);
        cache.clear();
        assert_eq!(cache.stats(), ExperienceStats::default());
    }

    #[test]
    fn test_forget_drops_only_that_plan() {
        let mut cache = ExperienceCache::new(0.01);
        let start = config(ArmSide::Left, &[0.0]);
        let goal = config(ArmSide::Left, &[1.0]);
        let other = config(ArmSide::Left, &[0.5]);
        cache.record(&start, &goal, vec![start.clone(), goal.clone()]);
        cache.record(&start, &other, vec![start.clone(), other.clone()]);

        let near_start = config(ArmSide::Left, &[0.002]);
        assert!(cache.forget(&near_start, &goal));
        assert!(!cache.forget(&start, &goal));
        assert_eq!(cache.stats().entries, 1);
        assert!(cache.lookup(&start, &goal).is_none());
        assert!(cache.lookup(&start, &other).is_some());
    }
}
