//! State validity checking.
//!
//! Every configuration the path generator or trajectory converter emits is
//! filtered through [`check_state`]: joint bounds first, then the external
//! collision oracle. The collision oracle may only be skipped by passing
//! [`CollisionCheck::BypassForRecovery`], which keeps unchecked motions
//! visible at every call site.

use manip_types::{KinematicChain, ManipError, RobotConfiguration};

/// The verdict of a validity check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validity {
    /// The configuration is usable.
    Valid,
    /// A joint is outside its bounds.
    OutOfBounds {
        /// Name of the first offending joint.
        joint: String,
    },
    /// The configuration is in collision.
    Colliding {
        /// Links in contact.
        links: Vec<String>,
    },
}

impl Validity {
    /// Returns `true` for [`Validity::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Converts a failing verdict into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ManipError::CollisionDetected`] for a collision and
    /// [`ManipError::PlanningFailed`] for a bound violation.
    pub fn into_result(self) -> manip_types::Result<()> {
        match self {
            Self::Valid => Ok(()),
            Self::OutOfBounds { joint } => Err(ManipError::planning(format!(
                "joint {joint} out of bounds"
            ))),
            Self::Colliding { links } => Err(ManipError::CollisionDetected { links }),
        }
    }
}

/// External collision oracle.
///
/// Any `Fn(&RobotConfiguration, &KinematicChain) -> Validity` closure is an
/// oracle, which is how tests inject obstacles.
pub trait StateValidity: Send + Sync {
    /// Checks one configuration of `chain`.
    fn check(&self, configuration: &RobotConfiguration, chain: &KinematicChain) -> Validity;

    /// Returns `true` if the configuration is valid.
    fn is_valid(&self, configuration: &RobotConfiguration, chain: &KinematicChain) -> bool {
        self.check(configuration, chain).is_valid()
    }
}

impl<F> StateValidity for F
where
    F: Fn(&RobotConfiguration, &KinematicChain) -> Validity + Send + Sync,
{
    fn check(&self, configuration: &RobotConfiguration, chain: &KinematicChain) -> Validity {
        self(configuration, chain)
    }
}

/// An oracle for an empty scene: nothing ever collides.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeSpace;

impl StateValidity for FreeSpace {
    fn check(&self, _configuration: &RobotConfiguration, _chain: &KinematicChain) -> Validity {
        Validity::Valid
    }
}

/// Whether collision checking applies to a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionCheck {
    /// Reject configurations the oracle reports in collision.
    #[default]
    Enforce,
    /// Skip the oracle so a recovery motion can leave a colliding state.
    /// Joint bounds are still enforced.
    BypassForRecovery,
}

impl CollisionCheck {
    /// Returns `true` unless this is a recovery bypass.
    #[must_use]
    pub const fn is_enforced(self) -> bool {
        matches!(self, Self::Enforce)
    }
}

/// Checks joint bounds, then (unless bypassed) the collision oracle.
///
/// # Example
///
/// ```
/// use manip_motion::{CollisionCheck, FreeSpace, GantryKinematics, Validity, check_state};
/// use manip_types::{ArmSide, RobotConfiguration};
///
/// let chain = GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0);
/// let inside = RobotConfiguration::new(ArmSide::Left, vec![0.5, 0.0, 0.0, 0.0]);
/// let outside = RobotConfiguration::new(ArmSide::Left, vec![1.5, 0.0, 0.0, 0.0]);
///
/// assert!(check_state(&FreeSpace, &inside, &chain, CollisionCheck::Enforce).is_valid());
/// assert!(matches!(
///     check_state(&FreeSpace, &outside, &chain, CollisionCheck::BypassForRecovery),
///     Validity::OutOfBounds { .. }
/// ));
/// ```
#[must_use]
pub fn check_state(
    oracle: &dyn StateValidity,
    configuration: &RobotConfiguration,
    chain: &KinematicChain,
    check: CollisionCheck,
) -> Validity {
    if configuration.len() != chain.dof() {
        return Validity::OutOfBounds {
            joint: format!("<{} values for {} joints>", configuration.len(), chain.dof()),
        };
    }
    if let Some(index) = chain.first_out_of_bounds(configuration.values()) {
        let joint = chain
            .joints()
            .get(index)
            .map_or_else(|| index.to_string(), |j| j.name().to_string());
        return Validity::OutOfBounds { joint };
    }
    if check.is_enforced() {
        oracle.check(configuration, chain)
    } else {
        Validity::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::GantryKinematics;
    use manip_types::ArmSide;

    fn blocked_above(limit: f64) -> impl StateValidity {
        move |c: &RobotConfiguration, _: &KinematicChain| {
            if c.values()[0] > limit {
                Validity::Colliding {
                    links: vec!["gripper".into(), "shelf".into()],
                }
            } else {
                Validity::Valid
            }
        }
    }

    #[test]
    fn test_closure_oracle() {
        let chain = GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0);
        let oracle = blocked_above(0.5);
        let ok = RobotConfiguration::new(ArmSide::Left, vec![0.2, 0.0, 0.0, 0.0]);
        let hit = RobotConfiguration::new(ArmSide::Left, vec![0.7, 0.0, 0.0, 0.0]);
        assert!(oracle.is_valid(&ok, &chain));
        assert!(!oracle.is_valid(&hit, &chain));
    }

    #[test]
    fn test_bypass_skips_oracle_only() {
        let chain = GantryKinematics::chain(ArmSide::Left, 1.0, 1.0, 1.0);
        let oracle = blocked_above(0.5);
        let hit = RobotConfiguration::new(ArmSide::Left, vec![0.7, 0.0, 0.0, 0.0]);
        assert!(!check_state(&oracle, &hit, &chain, CollisionCheck::Enforce).is_valid());
        assert!(check_state(&oracle, &hit, &chain, CollisionCheck::BypassForRecovery).is_valid());
    }

    #[test]
    fn test_out_of_bounds_names_joint() {
        let chain = GantryKinematics::chain(ArmSide::Right, 1.0, 1.0, 1.0);
        let config = RobotConfiguration::new(ArmSide::Right, vec![0.0, 0.0, 2.0, 0.0]);
        let verdict = check_state(&FreeSpace, &config, &chain, CollisionCheck::Enforce);
        assert_eq!(
            verdict,
            Validity::OutOfBounds {
                joint: "right_arm_z".into()
            }
        );
    }

    #[test]
    fn test_wrong_length_is_invalid() {
        let chain = GantryKinematics::chain(ArmSide::Right, 1.0, 1.0, 1.0);
        let config = RobotConfiguration::new(ArmSide::Right, vec![0.0]);
        assert!(!check_state(&FreeSpace, &config, &chain, CollisionCheck::Enforce).is_valid());
    }

    #[test]
    fn test_into_result() {
        assert!(Validity::Valid.into_result().is_ok());
        let err = Validity::Colliding {
            links: vec!["a".into()],
        }
        .into_result();
        assert!(err.is_err_and(|e| e.is_collision()));
        let err = Validity::OutOfBounds { joint: "j".into() }.into_result();
        assert!(err.is_err_and(|e| e.is_planning_failure()));
    }
}
