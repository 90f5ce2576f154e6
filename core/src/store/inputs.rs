use super::CompStore;
use crate::{
    adjustment::{Adjustment, AdjustmentKind},
    benchmark::{BenchmarkCurve, MarketBenchmark},
    error::{CompError, CompResult},
    plan::CompensationPlan,
    snapshot::{InputSnapshot, MonthlyActual, OrganizationSettings, Provider},
    types::{Month, Year, MONTHS_PER_YEAR},
};
use rusqlite::{params, OptionalExtension};

impl CompStore {

// ── provider ──────────────────────────────────────────────────────────

pub fn upsert_provider(&self, p: &Provider) -> CompResult<()> {
    self.conn.execute(
        "INSERT INTO provider (
             provider_id, name, specialty, base_salary, fte, clinical_fte,
             compensation_model, target_wrvus, holdback_percent
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
         ON CONFLICT(provider_id) DO UPDATE SET
             name = excluded.name,
             specialty = excluded.specialty,
             base_salary = excluded.base_salary,
             fte = excluded.fte,
             clinical_fte = excluded.clinical_fte,
             compensation_model = excluded.compensation_model,
             target_wrvus = excluded.target_wrvus,
             holdback_percent = excluded.holdback_percent",
        params![
            p.provider_id, p.name, p.specialty, p.base_salary, p.fte,
            p.clinical_fte, p.compensation_model.as_str(), p.target_wrvus,
            p.holdback_percent,
        ],
    )?;
    Ok(())
}

pub fn providers(&self) -> CompResult<Vec<Provider>> {
    let mut stmt = self.conn.prepare(
        "SELECT provider_id, name, specialty, base_salary, fte, clinical_fte,
                compensation_model, target_wrvus, holdback_percent
         FROM provider ORDER BY provider_id ASC",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                Provider {
                    provider_id: r.get(0)?,
                    name: r.get(1)?,
                    specialty: r.get(2)?,
                    base_salary: r.get(3)?,
                    fte: r.get(4)?,
                    clinical_fte: r.get(5)?,
                    compensation_model: CompensationPlan::Standard,
                    target_wrvus: r.get(7)?,
                    holdback_percent: r.get(8)?,
                },
                r.get::<_, String>(6)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(mut provider, model)| {
            provider.compensation_model = CompensationPlan::parse(&model).ok_or_else(|| {
                CompError::Other(anyhow::anyhow!(
                    "provider '{}' has unknown compensation model '{model}'",
                    provider.provider_id
                ))
            })?;
            Ok(provider)
        })
        .collect()
}

// ── market_benchmark ──────────────────────────────────────────────────

pub fn upsert_benchmark(&self, b: &MarketBenchmark) -> CompResult<()> {
    let (c, w, f) = (&b.total_comp, &b.wrvus, &b.conversion_factor);
    self.conn.execute(
        "INSERT INTO market_benchmark (
             specialty,
             comp_p25, comp_p50, comp_p75, comp_p90,
             wrvu_p25, wrvu_p50, wrvu_p75, wrvu_p90,
             cf_p25, cf_p50, cf_p75, cf_p90
         ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
         ON CONFLICT(specialty) DO UPDATE SET
             comp_p25 = excluded.comp_p25, comp_p50 = excluded.comp_p50,
             comp_p75 = excluded.comp_p75, comp_p90 = excluded.comp_p90,
             wrvu_p25 = excluded.wrvu_p25, wrvu_p50 = excluded.wrvu_p50,
             wrvu_p75 = excluded.wrvu_p75, wrvu_p90 = excluded.wrvu_p90,
             cf_p25 = excluded.cf_p25, cf_p50 = excluded.cf_p50,
             cf_p75 = excluded.cf_p75, cf_p90 = excluded.cf_p90",
        params![
            b.specialty,
            c.p25, c.p50, c.p75, c.p90,
            w.p25, w.p50, w.p75, w.p90,
            f.p25, f.p50, f.p75, f.p90,
        ],
    )?;
    Ok(())
}

pub fn benchmarks(&self) -> CompResult<Vec<MarketBenchmark>> {
    let mut stmt = self.conn.prepare(
        "SELECT specialty,
                comp_p25, comp_p50, comp_p75, comp_p90,
                wrvu_p25, wrvu_p50, wrvu_p75, wrvu_p90,
                cf_p25, cf_p50, cf_p75, cf_p90
         FROM market_benchmark ORDER BY specialty ASC",
    )?;
    let rows = stmt
        .query_map([], |r| {
            let curve = |start: usize| -> rusqlite::Result<BenchmarkCurve> {
                Ok(BenchmarkCurve::new(
                    r.get(start)?,
                    r.get(start + 1)?,
                    r.get(start + 2)?,
                    r.get(start + 3)?,
                ))
            };
            Ok(MarketBenchmark {
                specialty: r.get(0)?,
                total_comp: curve(1)?,
                wrvus: curve(5)?,
                conversion_factor: curve(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── monthly_actual ────────────────────────────────────────────────────

pub fn upsert_monthly_actual(&self, a: &MonthlyActual) -> CompResult<()> {
    self.conn.execute(
        "INSERT INTO monthly_actual (provider_id, year, month, wrvus, hours_worked)
         VALUES (?1,?2,?3,?4,?5)
         ON CONFLICT(provider_id, year, month) DO UPDATE SET
             wrvus = excluded.wrvus,
             hours_worked = excluded.hours_worked",
        params![a.provider_id, a.year, a.month, a.wrvus, a.hours_worked],
    )?;
    Ok(())
}

pub fn actuals_for_year(&self, year: Year) -> CompResult<Vec<MonthlyActual>> {
    let mut stmt = self.conn.prepare(
        "SELECT provider_id, year, month, wrvus, hours_worked
         FROM monthly_actual WHERE year = ?1
         ORDER BY provider_id ASC, month ASC",
    )?;
    let rows = stmt
        .query_map(params![year], |r| {
            Ok(MonthlyActual {
                provider_id: r.get(0)?,
                year: r.get(1)?,
                month: r.get(2)?,
                wrvus: r.get(3)?,
                hours_worked: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── adjustment ────────────────────────────────────────────────────────

/// Delete every entry of the named series for (kind, provider, year)
/// and write all twelve months in its place, atomically.
/// Returns the number of rows removed.
pub fn replace_adjustment_series(
    &self,
    kind: AdjustmentKind,
    provider_id: &str,
    year: Year,
    name: &str,
    values: &[f64; MONTHS_PER_YEAR as usize],
) -> CompResult<usize> {
    let tx = self.conn.unchecked_transaction()?;
    let removed = self.write_adjustment_series(kind, provider_id, year, name, values)?;
    tx.commit()?;
    Ok(removed)
}

/// Series rewrite without its own transaction; callers hold one.
fn write_adjustment_series(
    &self,
    kind: AdjustmentKind,
    provider_id: &str,
    year: Year,
    name: &str,
    values: &[f64; MONTHS_PER_YEAR as usize],
) -> CompResult<usize> {
    let removed = self.conn.execute(
        "DELETE FROM adjustment
         WHERE kind = ?1 AND provider_id = ?2 AND year = ?3 AND name = ?4",
        params![kind.as_str(), provider_id, year, name],
    )?;
    for (i, value) in values.iter().enumerate() {
        self.conn.execute(
            "INSERT INTO adjustment (kind, provider_id, year, month, name, value)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![kind.as_str(), provider_id, year, i as Month + 1, name, value],
        )?;
    }
    log::debug!(
        "adjustment series '{name}' ({}) for {provider_id}/{year} replaced, {removed} rows removed",
        kind.as_str()
    );
    Ok(removed)
}

pub fn adjustments_for_year(&self, year: Year) -> CompResult<Vec<Adjustment>> {
    let mut stmt = self.conn.prepare(
        "SELECT kind, provider_id, year, month, name, value
         FROM adjustment WHERE year = ?1
         ORDER BY provider_id ASC, kind ASC, name ASC, month ASC",
    )?;
    let rows = stmt
        .query_map(params![year], |r| {
            Ok((
                r.get::<_, String>(0)?,
                Adjustment {
                    kind: AdjustmentKind::Productivity,
                    provider_id: r.get(1)?,
                    year: r.get(2)?,
                    month: r.get(3)?,
                    name: r.get(4)?,
                    value: r.get(5)?,
                },
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(kind, mut adjustment)| {
            adjustment.kind = AdjustmentKind::parse(&kind).ok_or_else(|| {
                CompError::Other(anyhow::anyhow!("unknown adjustment kind '{kind}'"))
            })?;
            Ok(adjustment)
        })
        .collect()
}

// ── organization_setting ──────────────────────────────────────────────

pub fn set_default_holdback_percent(&self, percent: Option<f64>) -> CompResult<()> {
    self.conn.execute(
        "INSERT INTO organization_setting (id, default_holdback_percent) VALUES (1, ?1)
         ON CONFLICT(id) DO UPDATE SET default_holdback_percent = excluded.default_holdback_percent",
        params![percent],
    )?;
    Ok(())
}

pub fn organization_settings(&self) -> CompResult<OrganizationSettings> {
    let percent: Option<Option<f64>> = self
        .conn
        .query_row(
            "SELECT default_holdback_percent FROM organization_setting WHERE id = 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(OrganizationSettings {
        default_holdback_percent: percent.flatten(),
    })
}

// ── snapshot ──────────────────────────────────────────────────────────

/// Everything a batch for `year` reads, in a stable order.
pub fn load_snapshot(&self, year: Year) -> CompResult<InputSnapshot> {
    Ok(InputSnapshot {
        providers: self.providers()?,
        benchmarks: self.benchmarks()?,
        actuals: self.actuals_for_year(year)?,
        adjustments: self.adjustments_for_year(year)?,
        settings: self.organization_settings()?,
    })
}

/// Write every record of `snapshot` through the upsert paths, in one
/// transaction. Adjustments are grouped into their named series first.
pub fn import_snapshot(&self, snapshot: &InputSnapshot) -> CompResult<()> {
    let tx = self.conn.unchecked_transaction()?;
    for p in &snapshot.providers {
        self.upsert_provider(p)?;
    }
    for b in &snapshot.benchmarks {
        self.upsert_benchmark(b)?;
    }
    for a in &snapshot.actuals {
        self.upsert_monthly_actual(a)?;
    }

    let mut series: std::collections::BTreeMap<(AdjustmentKind, &str, Year, &str), [f64; MONTHS_PER_YEAR as usize]> =
        std::collections::BTreeMap::new();
    for a in &snapshot.adjustments {
        let slots = series
            .entry((a.kind, a.provider_id.as_str(), a.year, a.name.as_str()))
            .or_insert([0.0; MONTHS_PER_YEAR as usize]);
        if let Some(slot) = (a.month as usize).checked_sub(1).and_then(|i| slots.get_mut(i)) {
            *slot += a.value;
        }
    }
    for ((kind, provider_id, year, name), values) in &series {
        self.write_adjustment_series(*kind, provider_id, *year, name, values)?;
    }

    self.set_default_holdback_percent(snapshot.settings.default_holdback_percent)?;
    tx.commit()?;
    Ok(())
}

}
