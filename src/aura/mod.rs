//! Aura values and the update rule that evolves them.
//!
//! An aura is a bounded RGB colour owned by one subject (a user or a group).
//! It only ever moves through [`update`], driven by classified message tone:
//! 1. The tone picks a "hot" channel (hostile → red, joyful → green,
//!    sorrowful → blue).
//! 2. The hot channel climbs toward 255 and the others recede toward 0.
//! 3. The [`StepProfile`] decides how fast, with separate rates near the
//!    0/255 boundaries.

pub mod algorithm;
pub mod profile;
pub mod state;

pub use algorithm::{converge, update};
pub use profile::StepProfile;
pub use state::{AuraState, SubjectId, SubjectKind};
