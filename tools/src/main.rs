//! comp-runner: headless batch runner for the compensation engine.
//!
//! Usage:
//!   comp-runner --year 2024 --snapshot inputs.json --db comp.db
//!   comp-runner --year 2024 --db comp.db --through 6 --workers 4
//!   comp-runner --year 2024 --snapshot inputs.json --json

use anyhow::{bail, Result};
use compcalc_core::{
    config::EngineConfig,
    engine::{BatchReport, BatchRequest, CompEngine},
    snapshot::InputSnapshot,
    store::CompStore,
    types::{Month, Year, MONTHS_PER_YEAR},
};
use std::env;

#[derive(serde::Serialize)]
struct JsonOutput<'a> {
    run_id: &'a str,
    year: Year,
    through_month: Month,
    summaries: &'a [compcalc_core::metric::ProviderYearSummary],
    issues: &'a [compcalc_core::engine::BatchIssue],
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(year) = args
        .windows(2)
        .find(|w| w[0] == "--year")
        .and_then(|w| w[1].parse::<Year>().ok())
    else {
        bail!("--year <YYYY> is required");
    };
    let through = parse_arg(&args, "--through", MONTHS_PER_YEAR);
    let workers = parse_arg(&args, "--workers", 1usize);
    let json_mode = args.iter().any(|a| a == "--json");
    let db = str_arg(&args, "--db").unwrap_or(":memory:");
    let snapshot_path = str_arg(&args, "--snapshot");
    let config_path = str_arg(&args, "--config");

    if !json_mode {
        println!("comp-runner");
        println!("  year:      {year}");
        println!("  through:   {through}");
        println!("  workers:   {workers}");
        println!("  db:        {db}");
        println!("  snapshot:  {}", snapshot_path.unwrap_or("(from db)"));
        println!("  started:   {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));
        println!();
    }

    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    let store = if db == ":memory:" {
        CompStore::in_memory()?
    } else {
        CompStore::open(db)?
    };
    store.migrate()?;
    log::info!("store ready at {}", store.path().unwrap_or(":memory:"));

    if let Some(path) = snapshot_path {
        let incoming = InputSnapshot::load(path)?;
        incoming.validate()?;
        store.import_snapshot(&incoming)?;
        log::info!(
            "imported {} providers, {} benchmark rows, {} actuals, {} adjustments from {path}",
            incoming.providers.len(),
            incoming.benchmarks.len(),
            incoming.actuals.len(),
            incoming.adjustments.len()
        );
    }

    let snapshot = store.load_snapshot(year)?;
    if snapshot.providers.is_empty() {
        bail!("no providers found; pass --snapshot or point --db at a populated database");
    }

    let engine = CompEngine::new(config);
    let request = BatchRequest::new(year).through(through);
    let report = engine.run_and_persist(&store, &snapshot, &request, workers)?;

    if json_mode {
        let out = JsonOutput {
            run_id: &report.run_id,
            year: report.year,
            through_month: report.through_month,
            summaries: &report.summaries,
            issues: &report.issues,
        };
        println!("{}", serde_json::to_string(&out)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:      {}", report.run_id);
    println!("  year:        {}", report.year);
    println!("  months:      1..={}", report.through_month);
    println!("  computed:    {}", report.computed_count());
    println!("  skipped:     {}", report.skipped_providers().len());
    println!("  metric rows: {}", report.metrics.len());

    println!();
    println!("=== PROVIDERS (YTD) ===");
    for s in &report.summaries {
        println!(
            "  {:<12} | wRVU {:>9.2} / {:>9.2} ({:>6.1}%) | prod p{:>5.1} | comp p{:>5.1} | incentive ${:.2} (held ${:.2}) | total ${:.2}",
            s.provider_id,
            s.ytd_actual,
            s.ytd_target,
            s.plan_progress,
            s.productivity_percentile,
            s.compensation_percentile,
            s.total_incentive,
            s.total_holdback,
            s.total_compensation,
        );
    }

    if !report.issues.is_empty() {
        println!();
        println!("=== ISSUES ===");
        for issue in &report.issues {
            let month = issue.month.map(|m| format!("/{m:02}")).unwrap_or_default();
            let status = if issue.skipped { "SKIPPED" } else { "note" };
            println!(
                "  {}{month} [{}] {status}: {}",
                issue.provider_id,
                issue.kind.as_str(),
                issue.reason
            );
        }
    }
}

fn str_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
