use homography::{Dlt, Homography};
use nalgebra::{Matrix3, Point2, Vector2};
use pcb_core::{sample_consensus::Model, FeatureMatch, KeyPoint};

const SAMPLE_POINTS: usize = 16;
const RESIDUAL_THRESHOLD: f64 = 1e-6;

const PERSPECTIVE_MAGNITUDE: f64 = 1e-4;
const IMAGE_SIZE: f64 = 640.0;

#[test]
fn randomized() {
    let successes = (0..1000).filter(|_| run_round()).count();
    eprintln!("successes: {}", successes);
    assert!(successes > 990);
}

fn run_round() -> bool {
    let mut success = true;
    let (truth, matches) = some_test_data();
    let estimated = Dlt::new()
        .from_matches(matches.iter().copied())
        .expect("didn't get any homography");
    for m in &matches {
        if estimated.residual(m) > RESIDUAL_THRESHOLD {
            success = false;
            eprintln!(
                "failed residual check: {} (truth residual {})",
                estimated.residual(m),
                truth.residual(m)
            );
        }
    }
    success
}

/// Gets a random near-affine homography and exact matches through it.
fn some_test_data() -> (Homography, Vec<FeatureMatch<KeyPoint>>) {
    let affine = Matrix3::<f64>::identity() + Matrix3::new_random() * 0.2 - Matrix3::repeat(0.1);
    let mut matrix = affine;
    matrix[(0, 2)] = Vector2::<f64>::new_random().x * 40.0 - 20.0;
    matrix[(1, 2)] = Vector2::<f64>::new_random().y * 40.0 - 20.0;
    matrix[(2, 0)] = (Vector2::<f64>::new_random().x - 0.5) * PERSPECTIVE_MAGNITUDE;
    matrix[(2, 1)] = (Vector2::<f64>::new_random().y - 0.5) * PERSPECTIVE_MAGNITUDE;
    matrix[(2, 2)] = 1.0;
    let truth = Homography(matrix);

    let matches = (0..SAMPLE_POINTS)
        .map(|_| {
            let from = Point2::from(Vector2::<f64>::new_random() * IMAGE_SIZE);
            let to = truth.transform_point(from).unwrap();
            FeatureMatch(KeyPoint(from), KeyPoint(to))
        })
        .collect();
    (truth, matches)
}
