mod common;

use common::*;
use image::RgbImage;
use pcb_inspect::{synth, AlignmentFailure, InspectError, Inspector, LoadError};
use std::sync::Arc;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn inspector_is_shareable() {
    assert_send_sync::<Inspector>();
    assert_send_sync::<pcb_inspect::ReferenceModel>();
}

#[test]
fn failures_stay_with_their_image() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let board = board();
    let golden = dir.path().join("golden_master.png");
    board.save(&golden).unwrap();

    let mut sparse = RgbImage::from_pixel(100, 100, synth::BOARD_COLOR);
    fill(&mut sparse, 40, 40, 20, 20, [200, 200, 200]);
    let paths = [
        dir.path().join("test_clean.png"),
        dir.path().join("test_sparse.png"),
        dir.path().join("test_missing_file.png"),
        dir.path().join("test_shifted.png"),
    ];
    board.save(&paths[0]).unwrap();
    sparse.save(&paths[1]).unwrap();
    synth::shifted(&board, 3, 2).save(&paths[3]).unwrap();

    let inspector = Inspector::new(&golden, config()).unwrap();
    let results = inspector.inspect_batch(&paths);

    assert_eq!(results.len(), 4);
    for ((path, _), expected) in results.iter().zip(&paths) {
        assert_eq!(path, expected);
    }
    assert!(results[0].1.as_ref().unwrap().passed());
    assert!(matches!(
        results[1].1,
        Err(InspectError::Alignment(AlignmentFailure::InsufficientMatches { .. }))
    ));
    assert!(matches!(
        results[2].1,
        Err(InspectError::Load(LoadError::Decode { .. }))
    ));
    assert!(results[3].1.as_ref().unwrap().passed());
}

#[test]
fn batch_matches_single_inspections() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let board = board();
    let reference = reference(&board);
    let paths = [dir.path().join("a.png"), dir.path().join("b.png")];
    synth::shifted(&board, 2, 2).save(&paths[0]).unwrap();
    synth::shifted(&board, 0, 4).save(&paths[1]).unwrap();

    let inspector = Inspector::from_reference(Arc::clone(&reference), config());
    let batch = inspector.inspect_batch(&paths);
    for (index, (path, result)) in batch.into_iter().enumerate() {
        let seeded = Inspector::from_reference(
            Arc::clone(&reference),
            pcb_inspect::InspectConfig::seeded(config().seed.unwrap() + index as u64),
        );
        let single = seeded.inspect_path(&path).unwrap();
        let result = result.unwrap();
        assert_eq!(result.transform, single.transform);
        assert_eq!(result.defects, single.defects);
    }
}

#[test]
fn unreadable_reference_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = Inspector::new(dir.path().join("nope.png"), config());
    assert!(matches!(result, Err(LoadError::Decode { .. })));
}
