use super::CompStore;
use crate::{
    engine::BatchReport,
    error::CompResult,
    metric::ProviderMetric,
    types::Year,
};
use rusqlite::{params, Row};

const METRIC_COLUMNS: &str = "provider_id, year, month, actual_wrvus, target_wrvus,
    cumulative_actual, cumulative_target, productivity_percentile,
    compensation_percentile, incentive, holdback, additional_pay,
    total_compensation, plan_progress, conversion_factor_used";

fn metric_from_row(r: &Row<'_>) -> rusqlite::Result<ProviderMetric> {
    Ok(ProviderMetric {
        provider_id: r.get(0)?,
        year: r.get(1)?,
        month: r.get(2)?,
        actual_wrvus: r.get(3)?,
        target_wrvus: r.get(4)?,
        cumulative_actual: r.get(5)?,
        cumulative_target: r.get(6)?,
        productivity_percentile: r.get(7)?,
        compensation_percentile: r.get(8)?,
        incentive: r.get(9)?,
        holdback: r.get(10)?,
        additional_pay: r.get(11)?,
        total_compensation: r.get(12)?,
        plan_progress: r.get(13)?,
        conversion_factor_used: r.get(14)?,
    })
}

impl CompStore {

/// Insert or overwrite the row for (provider, year, month).
pub fn upsert_provider_metric(&self, run_id: &str, m: &ProviderMetric) -> CompResult<()> {
    self.conn.execute(
        "INSERT INTO provider_metric (
             provider_id, year, month, actual_wrvus, target_wrvus,
             cumulative_actual, cumulative_target, productivity_percentile,
             compensation_percentile, incentive, holdback, additional_pay,
             total_compensation, plan_progress, conversion_factor_used, run_id
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16)
         ON CONFLICT(provider_id, year, month) DO UPDATE SET
             actual_wrvus = excluded.actual_wrvus,
             target_wrvus = excluded.target_wrvus,
             cumulative_actual = excluded.cumulative_actual,
             cumulative_target = excluded.cumulative_target,
             productivity_percentile = excluded.productivity_percentile,
             compensation_percentile = excluded.compensation_percentile,
             incentive = excluded.incentive,
             holdback = excluded.holdback,
             additional_pay = excluded.additional_pay,
             total_compensation = excluded.total_compensation,
             plan_progress = excluded.plan_progress,
             conversion_factor_used = excluded.conversion_factor_used,
             run_id = excluded.run_id",
        params![
            m.provider_id, m.year, m.month, m.actual_wrvus, m.target_wrvus,
            m.cumulative_actual, m.cumulative_target, m.productivity_percentile,
            m.compensation_percentile, m.incentive, m.holdback, m.additional_pay,
            m.total_compensation, m.plan_progress, m.conversion_factor_used, run_id,
        ],
    )?;
    Ok(())
}

pub fn metrics_for_provider_year(&self, provider_id: &str, year: Year) -> CompResult<Vec<ProviderMetric>> {
    let mut stmt = self.conn.prepare(&format!(
        "SELECT {METRIC_COLUMNS} FROM provider_metric
         WHERE provider_id = ?1 AND year = ?2 ORDER BY month ASC"
    ))?;
    let rows = stmt
        .query_map(params![provider_id, year], metric_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn metrics_for_year(&self, year: Year) -> CompResult<Vec<ProviderMetric>> {
    let mut stmt = self.conn.prepare(&format!(
        "SELECT {METRIC_COLUMNS} FROM provider_metric
         WHERE year = ?1 ORDER BY provider_id ASC, month ASC"
    ))?;
    let rows = stmt
        .query_map(params![year], metric_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Drop every stored month of (provider, year). Returns rows removed.
pub fn delete_provider_metrics(&self, provider_id: &str, year: Year) -> CompResult<usize> {
    Ok(self.conn.execute(
        "DELETE FROM provider_metric WHERE provider_id = ?1 AND year = ?2",
        params![provider_id, year],
    )?)
}

pub fn metric_count(&self, year: Year) -> CompResult<i64> {
    Ok(self.conn.query_row(
        "SELECT COUNT(*) FROM provider_metric WHERE year = ?1",
        params![year],
        |r| r.get(0),
    )?)
}

/// Record the run, upsert every metric, and store issues and events,
/// all in one transaction. A failure leaves no partial run behind.
///
/// Providers skipped by this run lose their stored rows for the year;
/// metrics from an earlier run no longer describe their inputs.
pub fn persist_batch(&self, report: &BatchReport) -> CompResult<()> {
    let tx = self.conn.unchecked_transaction()?;
    let now = chrono::Utc::now().to_rfc3339();

    self.insert_run(&report.run_id, report.year, report.through_month, &now)?;
    for provider_id in report.skipped_providers() {
        let removed = self.delete_provider_metrics(provider_id, report.year)?;
        if removed > 0 {
            log::info!(
                "{provider_id}: skipped in run {}, cleared {removed} stale metric rows for {}",
                report.run_id,
                report.year
            );
        }
    }
    for m in &report.metrics {
        self.upsert_provider_metric(&report.run_id, m)?;
    }
    for issue in &report.issues {
        self.insert_issue(&report.run_id, issue)?;
    }
    for (seq, event) in report.events.iter().enumerate() {
        self.append_event(&report.run_id, seq as u64, event)?;
    }
    let skipped = report.issues.iter().filter(|i| i.skipped).count();
    self.complete_run(&report.run_id, report.computed_count(), skipped, &now)?;

    tx.commit()?;
    log::debug!(
        "run {} persisted: {} metrics, {} issues, {} events",
        report.run_id,
        report.metrics.len(),
        report.issues.len(),
        report.events.len()
    );
    Ok(())
}

}
