//! Property tests for the thread-count knob space.

use proptest::prelude::*;

use crate::knob::KnobSpace;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Candidates start at the maximum and halve down to the floor.
    #[test]
    fn candidates_halve(maximum in 1usize..=4096, minimum in 1usize..=128) {
        let space = KnobSpace::new(maximum, minimum);
        let candidates = space.candidates();

        if maximum < minimum {
            prop_assert!(space.is_empty());
        } else {
            prop_assert_eq!(candidates[0], maximum);
        }
        for pair in candidates.windows(2) {
            prop_assert!(pair[1] < pair[0]);
            prop_assert_eq!(pair[1], pair[0] / 2);
        }
        prop_assert!(candidates.iter().all(|&value| value >= minimum));
        if let Some(&last) = candidates.last() {
            prop_assert!(last / 2 < minimum);
        }
    }

    /// Every candidate validates and nothing else does.
    #[test]
    fn validate_matches_candidates(maximum in 1usize..=2048, value in 0usize..=4096) {
        let space = KnobSpace::new(maximum, 32);
        prop_assert_eq!(space.validate(value).is_ok(), space.contains(value));
    }

    /// Power-of-two limits only ever yield powers of two.
    #[test]
    fn power_of_two_limits(shift in 5u32..=12) {
        let space = KnobSpace::new(1usize << shift, 32);
        prop_assert_eq!(space.len(), shift as usize - 4);
        prop_assert!(space.candidates().iter().all(|value| value.is_power_of_two()));
    }
}
