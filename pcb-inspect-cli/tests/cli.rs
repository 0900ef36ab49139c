use std::process::Command;

fn run(args: &[&str]) {
    let status = Command::new(env!("CARGO_BIN_EXE_pcb-inspect"))
        .args(args)
        .status()
        .expect("failed to run pcb-inspect");
    assert!(status.success(), "pcb-inspect {:?} failed", args);
}

#[test]
fn generate_then_inspect() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = dir.path().join("dataset");
    let output = dir.path().join("output");
    let golden = dataset.join("golden_master.png");
    let golden = golden.to_str().unwrap();
    let dataset = dataset.to_str().unwrap();
    let output_str = output.to_str().unwrap();

    run(&["generate", "--reference", golden, "--output", dataset, "--seed", "3", "--synthetic", "480x360"]);
    run(&["inspect", "--reference", golden, "--dataset", dataset, "--output", output_str, "--seed", "1"]);

    let report: serde_json::Value =
        serde_json::from_reader(std::fs::File::open(output.join("report.json")).unwrap()).unwrap();
    let entries = report.as_array().unwrap();
    let names: Vec<_> = entries.iter().map(|e| e["image"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        ["test_clean.png", "test_discolor.png", "test_missing.png", "test_scratch.png"]
    );
    assert_eq!(entries[0]["passed"], true);
    assert_eq!(entries[1]["passed"], false);
    assert_eq!(entries[3]["passed"], false);
    for name in names {
        assert!(output.join(format!("result_{}", name)).is_file());
    }
}

#[test]
fn missing_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    let status = Command::new(env!("CARGO_BIN_EXE_pcb-inspect"))
        .args(["inspect", "--reference"])
        .arg(dir.path().join("missing.png"))
        .arg("--dataset")
        .arg(dir.path())
        .arg("--output")
        .arg(dir.path().join("out"))
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!dir.path().join("out").exists());
}
