//! The batch engine: one calculation pass over an input snapshot.
//!
//! RULES:
//!   - The year is always part of the request, never ambient state.
//!   - Providers are independent: any of them may run on any worker.
//!   - A provider's months always run in order on a single worker.
//!   - A failure inside one provider is recorded as an issue and the
//!     batch moves on. Only an invalid request fails the whole batch.
//!   - Output is ordered by provider id, whatever the worker count.

use crate::{
    accumulator::{MetricsAccumulator, ProviderYearInput},
    adjustment::Adjustment,
    benchmark::BenchmarkTable,
    config::EngineConfig,
    error::{CompError, CompResult},
    event::CalcEvent,
    metric::{ProviderMetric, ProviderYearSummary},
    snapshot::{InputSnapshot, MonthlyWrvus, Provider},
    store::CompStore,
    target::RateSource,
    types::{check_month, Month, ProviderId, RunId, Year, MONTHS_PER_YEAR},
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub run_id: RunId,
    pub year: Year,
    pub through_month: Month,
}

impl BatchRequest {
    /// Full-year request under a fresh run id.
    pub fn new(year: Year) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            year,
            through_month: MONTHS_PER_YEAR,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<RunId>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn through(mut self, month: Month) -> Self {
        self.through_month = month;
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Non-positive salary, rate, or FTE, or an unrankable value.
    InvalidInput,
    /// No survey row for the specialty; fallbacks were used.
    MissingBenchmark,
    /// Anything else that kept a provider out of this pass.
    ComputationSkipped,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput       => "invalid_input",
            Self::MissingBenchmark   => "missing_benchmark",
            Self::ComputationSkipped => "computation_skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        [Self::InvalidInput, Self::MissingBenchmark, Self::ComputationSkipped]
            .into_iter()
            .find(|k| k.as_str() == s)
    }
}

/// One reported problem. `month` is `None` for provider-level issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchIssue {
    pub provider_id: ProviderId,
    pub month: Option<Month>,
    pub kind: IssueKind,
    /// True when the provider produced no metrics this pass.
    pub skipped: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub run_id: RunId,
    pub year: Year,
    pub through_month: Month,
    pub metrics: Vec<ProviderMetric>,
    pub summaries: Vec<ProviderYearSummary>,
    pub issues: Vec<BatchIssue>,
    pub events: Vec<CalcEvent>,
}

impl BatchReport {
    pub fn metrics_for(&self, provider_id: &str) -> Vec<&ProviderMetric> {
        self.metrics.iter().filter(|m| m.provider_id == provider_id).collect()
    }

    pub fn summary_for(&self, provider_id: &str) -> Option<&ProviderYearSummary> {
        self.summaries.iter().find(|s| s.provider_id == provider_id)
    }

    pub fn skipped_providers(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|i| i.skipped)
            .map(|i| i.provider_id.as_str())
            .collect()
    }

    pub fn computed_count(&self) -> usize {
        self.summaries.len()
    }
}

/// What one provider contributed to the batch.
#[derive(Debug, Default)]
struct ProviderResult {
    metrics: Vec<ProviderMetric>,
    summary: Option<ProviderYearSummary>,
    issues: Vec<BatchIssue>,
    events: Vec<CalcEvent>,
}

/// Snapshot data indexed once per batch and shared read-only by workers.
struct BatchInputs<'a> {
    snapshot: &'a InputSnapshot,
    benchmarks: BenchmarkTable,
    actuals: HashMap<&'a str, MonthlyWrvus>,
    adjustments: HashMap<&'a str, Vec<Adjustment>>,
    /// First out-of-range month seen per provider in this year's records.
    invalid_months: HashMap<&'a str, Month>,
}

impl<'a> BatchInputs<'a> {
    fn index(snapshot: &'a InputSnapshot, year: Year) -> Self {
        let mut invalid_months: HashMap<&'a str, Month> = HashMap::new();
        let dated = snapshot
            .actuals
            .iter()
            .map(|a| (a.provider_id.as_str(), a.year, a.month))
            .chain(snapshot.adjustments.iter().map(|a| (a.provider_id.as_str(), a.year, a.month)));
        for (provider_id, _, month) in dated.filter(|(_, y, _)| *y == year) {
            if check_month(month).is_err() {
                invalid_months.entry(provider_id).or_insert(month);
            }
        }

        let mut adjustments: HashMap<&'a str, Vec<Adjustment>> = HashMap::new();
        for a in snapshot.adjustments.iter().filter(|a| a.year == year) {
            adjustments.entry(a.provider_id.as_str()).or_default().push(a.clone());
        }
        Self {
            snapshot,
            benchmarks: BenchmarkTable::new(&snapshot.benchmarks),
            actuals: snapshot.actuals_by_provider(year),
            adjustments,
            invalid_months,
        }
    }
}

pub struct CompEngine {
    config: EngineConfig,
}

impl CompEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the batch on the calling thread.
    pub fn run_batch(&self, snapshot: &InputSnapshot, request: &BatchRequest) -> CompResult<BatchReport> {
        self.run_batch_parallel(snapshot, request, 1)
    }

    /// Run the batch with providers spread over `workers` scoped threads.
    pub fn run_batch_parallel(
        &self,
        snapshot: &InputSnapshot,
        request: &BatchRequest,
        workers: usize,
    ) -> CompResult<BatchReport> {
        check_month(request.through_month)?;

        let inputs = BatchInputs::index(snapshot, request.year);
        let (providers, duplicates) = unique_providers(&snapshot.providers);

        let mut events = vec![CalcEvent::BatchStarted {
            run_id: request.run_id.clone(),
            year: request.year,
            through_month: request.through_month,
            providers: providers.len(),
        }];

        let results = if workers <= 1 || providers.len() <= 1 {
            providers
                .iter()
                .map(|p| self.compute_provider(&inputs, p, request))
                .collect::<Vec<_>>()
        } else {
            let chunk_size = providers.len().div_ceil(workers);
            std::thread::scope(|scope| {
                let handles: Vec<_> = providers
                    .chunks(chunk_size)
                    .map(|chunk| {
                        let inputs = &inputs;
                        scope.spawn(move || {
                            chunk
                                .iter()
                                .map(|p| self.compute_provider(inputs, p, request))
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join()
                            .map_err(|_| CompError::Other(anyhow::anyhow!("batch worker panicked")))
                    })
                    .collect::<CompResult<Vec<_>>>()
            })?
            .into_iter()
            .flatten()
            .collect()
        };

        let mut report = BatchReport {
            run_id: request.run_id.clone(),
            year: request.year,
            through_month: request.through_month,
            metrics: Vec::new(),
            summaries: Vec::new(),
            issues: Vec::new(),
            events: Vec::new(),
        };

        for provider_id in duplicates {
            let reason = CompError::ComputationSkipped {
                provider_id: provider_id.clone(),
                reason: "duplicate provider id in snapshot, later record ignored".into(),
            }
            .to_string();
            log::warn!("{reason}");
            events.push(CalcEvent::ProviderSkipped {
                provider_id: provider_id.clone(),
                kind: IssueKind::ComputationSkipped,
                reason: reason.clone(),
            });
            report.issues.push(BatchIssue {
                provider_id,
                month: None,
                kind: IssueKind::ComputationSkipped,
                skipped: false,
                reason,
            });
        }

        for result in results {
            report.metrics.extend(result.metrics);
            report.summaries.extend(result.summary);
            report.issues.extend(result.issues);
            events.extend(result.events);
        }

        let skipped = report.issues.iter().filter(|i| i.skipped).count();
        events.push(CalcEvent::BatchCompleted {
            run_id: request.run_id.clone(),
            computed: report.summaries.len(),
            skipped,
        });
        report.events = events;

        log::info!(
            "run {} year {} through month {}: {} providers computed, {} skipped, {} metric rows",
            request.run_id,
            request.year,
            request.through_month,
            report.summaries.len(),
            skipped,
            report.metrics.len()
        );

        Ok(report)
    }

    /// Run the batch and write its results through the store in one transaction.
    pub fn run_and_persist(
        &self,
        store: &CompStore,
        snapshot: &InputSnapshot,
        request: &BatchRequest,
        workers: usize,
    ) -> CompResult<BatchReport> {
        let report = self.run_batch_parallel(snapshot, request, workers)?;
        store.persist_batch(&report)?;
        Ok(report)
    }

    fn compute_provider(
        &self,
        inputs: &BatchInputs<'_>,
        provider: &Provider,
        request: &BatchRequest,
    ) -> ProviderResult {
        let pid = provider.provider_id.as_str();
        let mut result = ProviderResult::default();

        let benchmark = inputs.benchmarks.get(&provider.specialty);
        let adjustments = inputs.adjustments.get(pid).map(Vec::as_slice).unwrap_or(&[]);
        let input = ProviderYearInput {
            provider,
            year: request.year,
            actuals: inputs.actuals.get(pid).copied().unwrap_or_default(),
            adjustments,
            benchmark,
            settings: &inputs.snapshot.settings,
        };

        let run = match inputs.invalid_months.get(pid) {
            Some(&month) => Err(CompError::InvalidMonth { month }),
            None => MetricsAccumulator::new(&self.config).run(&input, request.through_month),
        };
        let outcome = match run {
            Ok(o) => o,
            Err(e) => {
                let kind = match e {
                    CompError::InvalidInput { .. } | CompError::InvalidMonth { .. } => {
                        IssueKind::InvalidInput
                    }
                    _ => IssueKind::ComputationSkipped,
                };
                let reason = e.to_string();
                log::warn!("{pid}: skipped for {}: {reason}", request.year);
                result.events.push(CalcEvent::ProviderSkipped {
                    provider_id: pid.to_string(),
                    kind,
                    reason: reason.clone(),
                });
                result.issues.push(BatchIssue {
                    provider_id: pid.to_string(),
                    month: None,
                    kind,
                    skipped: true,
                    reason,
                });
                return result;
            }
        };

        if benchmark.is_none() {
            let reason = CompError::MissingBenchmark { specialty: provider.specialty.clone() }.to_string();
            log::warn!("{pid}: {reason}, using fallback rate {:.2}", outcome.conversion_factor.rate);
            result.issues.push(BatchIssue {
                provider_id: pid.to_string(),
                month: None,
                kind: IssueKind::MissingBenchmark,
                skipped: false,
                reason,
            });
        }
        if outcome.conversion_factor.source == RateSource::Fallback {
            result.events.push(CalcEvent::BenchmarkFallbackApplied {
                provider_id: pid.to_string(),
                specialty: provider.specialty.clone(),
                fallback_rate: outcome.conversion_factor.rate,
            });
        }

        for issue in &outcome.issues {
            log::warn!("{pid}/{}/{}: {}", request.year, issue.month, issue.reason);
            result.issues.push(BatchIssue {
                provider_id: pid.to_string(),
                month: Some(issue.month),
                kind: IssueKind::InvalidInput,
                skipped: false,
                reason: issue.reason.clone(),
            });
        }

        if let Some(summary) = &outcome.summary {
            result.events.push(CalcEvent::ProviderYearComputed {
                provider_id: pid.to_string(),
                year: request.year,
                months: outcome.metrics.len(),
                ytd_actual: summary.ytd_actual,
                ytd_target: summary.ytd_target,
                total_incentive: summary.total_incentive,
            });
        }

        result.metrics = outcome.metrics;
        result.summary = outcome.summary;
        result
    }
}

/// Providers sorted by id with duplicates removed (first record wins),
/// plus the ids that were duplicated.
fn unique_providers(providers: &[Provider]) -> (Vec<Provider>, Vec<ProviderId>) {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    let mut unique = Vec::with_capacity(providers.len());
    for p in providers {
        if seen.insert(p.provider_id.as_str()) {
            unique.push(p.clone());
        } else {
            duplicates.push(p.provider_id.clone());
        }
    }
    unique.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
    duplicates.sort();
    (unique, duplicates)
}
