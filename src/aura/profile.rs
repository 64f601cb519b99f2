//! Convergence speed profiles.

use serde::{Deserialize, Serialize};

use super::state::SubjectKind;

/// Step sizes that govern how fast a channel moves toward its target.
///
/// Thresholds are compared against `delta = target - current`. Steps are
/// magnitudes: `down_step` is subtracted, `up_step` and `boundary_step`
/// are applied in the direction of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepProfile {
    /// Jump applied when a channel sits at 0 or 255 and must move away.
    pub boundary_step: i32,
    /// A delta at or below this recedes by `down_step`.
    pub down_threshold: i32,
    pub down_step: i32,
    /// A delta at or above this rises by `up_step`.
    pub up_threshold: i32,
    pub up_step: i32,
}

impl StepProfile {
    /// Individual user auras: fast off the boundaries, slow to fade.
    pub const USER: StepProfile = StepProfile {
        boundary_step: 60,
        down_threshold: -15,
        down_step: 15,
        up_threshold: 30,
        up_step: 30,
    };

    /// Group auras: sticky at the boundaries, symmetric in the middle.
    pub const GROUP: StepProfile = StepProfile {
        boundary_step: 10,
        down_threshold: -30,
        down_step: 30,
        up_threshold: 30,
        up_step: 30,
    };

    /// The profile a subject of `kind` evolves under.
    pub fn for_kind(kind: SubjectKind) -> Self {
        match kind {
            SubjectKind::User => Self::USER,
            SubjectKind::Group => Self::GROUP,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_selects_profile() {
        assert_eq!(StepProfile::for_kind(SubjectKind::User), StepProfile::USER);
        assert_eq!(StepProfile::for_kind(SubjectKind::Group), StepProfile::GROUP);
    }

    #[test]
    fn profiles_differ_only_where_expected() {
        let (u, g) = (StepProfile::USER, StepProfile::GROUP);
        assert_eq!(u.up_threshold, g.up_threshold);
        assert_eq!(u.up_step, g.up_step);
        assert_ne!(u.boundary_step, g.boundary_step);
        assert_ne!(u.down_step, g.down_step);
    }
}
