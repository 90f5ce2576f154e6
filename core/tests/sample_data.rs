//! The shipped sample inputs load and compute cleanly.

use compcalc_core::{
    config::EngineConfig,
    engine::{BatchRequest, CompEngine, IssueKind},
    snapshot::InputSnapshot,
};

fn data_path(file: &str) -> String {
    format!("{}/../data/{file}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn sample_snapshot_runs_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = EngineConfig::load(&data_path("engine_config.json")).expect("config");
    let snapshot = InputSnapshot::load(&data_path("sample_snapshot.json")).expect("snapshot");
    snapshot.validate().expect("months in range");

    let report = CompEngine::new(config)
        .run_batch(&snapshot, &BatchRequest::new(2024).with_run_id("sample"))
        .unwrap();

    assert_eq!(report.computed_count(), 3);
    assert_eq!(report.metrics.len(), 36);
    assert!(report.skipped_providers().is_empty());

    // Pediatrics has no survey row in the sample.
    let missing: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.kind == IssueKind::MissingBenchmark)
        .map(|i| i.provider_id.as_str())
        .collect();
    assert_eq!(missing, vec!["P-1003"]);
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(EngineConfig::load(&data_path("no_such_config.json")).is_err());
}
