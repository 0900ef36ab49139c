use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use std::sync::OnceLock;

/// Number of point-pair comparisons, one per descriptor bit.
pub const PATTERN_PAIRS: usize = 256;

/// Largest coordinate magnitude of a pattern point before rotation.
pub const PATTERN_RADIUS: i32 = 13;

/// Fixed seed so every process samples the same pattern.
const PATTERN_SEED: u64 = 0x0b5e_55ed_b41e_f000;

/// A test pair `((x1, y1), (x2, y2))` relative to the keypoint.
pub type PointPair = ((f32, f32), (f32, f32));

/// The BRIEF sampling pattern: uniformly distributed pairs inside the
/// `[-13, 13]` square, generated once from a fixed seed.
pub fn brief_pattern() -> &'static [PointPair; PATTERN_PAIRS] {
    static PATTERN: OnceLock<[PointPair; PATTERN_PAIRS]> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let mut rng = Pcg64::seed_from_u64(PATTERN_SEED);
        let mut point = || {
            (
                rng.gen_range(-PATTERN_RADIUS..=PATTERN_RADIUS) as f32,
                rng.gen_range(-PATTERN_RADIUS..=PATTERN_RADIUS) as f32,
            )
        };
        let mut pattern = [((0.0, 0.0), (0.0, 0.0)); PATTERN_PAIRS];
        for pair in pattern.iter_mut() {
            let first = point();
            let mut second = point();
            while second == first {
                second = point();
            }
            *pair = (first, second);
        }
        pattern
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_stable_and_bounded() {
        let a = brief_pattern();
        let b = brief_pattern();
        assert_eq!(a.as_ptr(), b.as_ptr());
        let radius = PATTERN_RADIUS as f32;
        for &((x1, y1), (x2, y2)) in a.iter() {
            assert!((x1, y1) != (x2, y2));
            for v in [x1, y1, x2, y2] {
                assert!((-radius..=radius).contains(&v));
            }
        }
    }
}
