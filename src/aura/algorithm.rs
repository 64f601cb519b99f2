//! The aura update rule.
//!
//! This is a quantized, asymmetric convergence: each channel independently
//! moves toward 255 (hot channel) or 0 (every other channel) by a fixed
//! step, snaps exactly onto the target once it is within the profile's
//! thresholds, and uses a separate step when leaving 0 or 255.

use super::profile::StepProfile;
use super::state::{AuraState, clamp_channel};
use crate::tone::Tone;

const CHANNEL_MAX: i32 = 255;

/// Evolve `current` one step toward the colour of `tone`.
///
/// A [`Tone::Neutral`] tone has no hot channel and returns `current`
/// bit-for-bit; callers are still expected to skip the update entirely in
/// that case so nothing is written.
pub fn update(current: AuraState, tone: Tone, profile: &StepProfile) -> AuraState {
    let Some(hot) = tone.hot_channel() else {
        return current;
    };

    let mut channels = current.channels();
    for (i, channel) in channels.iter_mut().enumerate() {
        let target = if i == hot { CHANNEL_MAX } else { 0 };
        *channel = step_channel(i32::from(*channel), target, profile);
    }
    AuraState::from_channels(channels)
}

/// Apply `tone` repeatedly until the aura stops changing.
///
/// Returns the fixed point and the number of steps that moved it. Useful
/// for previews ("how many joyful messages until fully green?").
pub fn converge(start: AuraState, tone: Tone, profile: &StepProfile) -> (AuraState, usize) {
    let mut state = start;
    let mut steps = 0;
    loop {
        let next = update(state, tone, profile);
        if next == state {
            return (state, steps);
        }
        state = next;
        steps += 1;
    }
}

fn step_channel(value: i32, target: i32, profile: &StepProfile) -> u8 {
    let delta = target - value;

    let next = if value == CHANNEL_MAX {
        if delta != 0 {
            value - profile.boundary_step
        } else {
            value
        }
    } else if value == 0 {
        if delta != 0 {
            value + profile.boundary_step
        } else {
            value
        }
    } else if delta <= profile.down_threshold {
        value - profile.down_step
    } else if delta >= profile.up_threshold {
        value + profile.up_step
    } else {
        // Within both thresholds: land exactly on the target.
        value + delta
    };

    clamp_channel(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TONES: [Tone; 3] = [Tone::Hostile, Tone::Joyful, Tone::Sorrowful];
    const PROFILES: [StepProfile; 2] = [StepProfile::USER, StepProfile::GROUP];

    #[test]
    fn user_joyful_from_initial_gray() {
        let next = update(AuraState::new(211, 211, 211), Tone::Joyful, &StepProfile::USER);
        assert_eq!(next, AuraState::new(196, 241, 196));
    }

    #[test]
    fn group_hostile_from_initial_gray() {
        let next = update(AuraState::new(128, 128, 128), Tone::Hostile, &StepProfile::GROUP);
        assert_eq!(next, AuraState::new(158, 98, 98));
    }

    #[test]
    fn user_sorrowful_snaps_within_thresholds() {
        // B: delta 25 < 30 snaps to 255; R: delta -10 > -15 snaps to 0.
        let next = update(AuraState::new(10, 100, 230), Tone::Sorrowful, &StepProfile::USER);
        assert_eq!(next, AuraState::new(0, 85, 255));
    }

    #[test]
    fn neutral_leaves_state_untouched() {
        for profile in &PROFILES {
            for value in [0u8, 1, 127, 211, 254, 255] {
                let state = AuraState::new(value, 255 - value, value / 2);
                assert_eq!(update(state, Tone::Neutral, profile), state);
            }
        }
    }

    #[test]
    fn black_hot_channel_rises_by_boundary_step() {
        for profile in &PROFILES {
            for tone in TONES {
                let hot = tone.hot_channel().unwrap();
                let next = update(AuraState::new(0, 0, 0), tone, profile).channels();
                for (i, value) in next.iter().enumerate() {
                    let expected = if i == hot { profile.boundary_step as u8 } else { 0 };
                    assert_eq!(*value, expected, "tone {tone}, channel {i}");
                }
            }
        }
    }

    #[test]
    fn white_cold_channels_drop_by_boundary_step() {
        for profile in &PROFILES {
            for tone in TONES {
                let hot = tone.hot_channel().unwrap();
                let next = update(AuraState::new(255, 255, 255), tone, profile).channels();
                for (i, value) in next.iter().enumerate() {
                    let expected = if i == hot {
                        255
                    } else {
                        (255 - profile.boundary_step) as u8
                    };
                    assert_eq!(*value, expected, "tone {tone}, channel {i}");
                }
            }
        }
    }

    #[test]
    fn repeated_application_never_leaves_range_and_reaches_target() {
        for profile in &PROFILES {
            for tone in TONES {
                let mut state = AuraState::new(255, 255, 255);
                for _ in 0..64 {
                    let next = update(state, tone, profile);
                    // Cold channels only ever move down from white.
                    for i in 0..3 {
                        if Some(i) != tone.hot_channel() {
                            assert!(next.channels()[i] <= state.channels()[i]);
                        }
                    }
                    state = next;
                }
                let mut expected = [0u8; 3];
                expected[tone.hot_channel().unwrap()] = 255;
                assert_eq!(state.channels(), expected);
            }
        }
    }

    #[test]
    fn every_channel_value_converges_to_a_fixed_point() {
        // Exhaustive over a single channel: the update is per-channel.
        for profile in &PROFILES {
            for start in 0..=255u8 {
                for tone in TONES {
                    let state = AuraState::new(start, start, start);
                    let (fixed, steps) = converge(state, tone, profile);
                    let mut expected = [0u8; 3];
                    expected[tone.hot_channel().unwrap()] = 255;
                    assert_eq!(fixed.channels(), expected);
                    assert!(steps <= 40, "start {start} took {steps} steps");
                    assert_eq!(update(fixed, tone, profile), fixed);
                }
            }
        }
    }

    #[test]
    fn user_profile_step_counts() {
        let (fixed, steps) = converge(AuraState::USER_INITIAL, Tone::Joyful, &StepProfile::USER);
        assert_eq!(fixed, AuraState::new(0, 255, 0));
        // Red/blue recede 211 -> 1 in 14 steps of 15, then snap to 0.
        assert_eq!(steps, 15);
    }

    #[test]
    fn group_profile_step_counts() {
        let (fixed, steps) = converge(AuraState::GROUP_INITIAL, Tone::Hostile, &StepProfile::GROUP);
        assert_eq!(fixed, AuraState::new(255, 0, 0));
        // 128 -> 248 / 8 in four steps, then one snap.
        assert_eq!(steps, 5);
    }

    #[test]
    fn switching_tone_recedes_previous_hot_channel() {
        let green = AuraState::new(0, 255, 0);
        let user = update(green, Tone::Hostile, &StepProfile::USER);
        assert_eq!(user, AuraState::new(60, 195, 0));
        let group = update(green, Tone::Hostile, &StepProfile::GROUP);
        assert_eq!(group, AuraState::new(10, 245, 0));
    }
}
