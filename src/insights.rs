// 💡 Insights - headline KPIs and rankings for the dashboard
// All functions are pure over a (possibly filtered) record slice.

use crate::error::Result;
use crate::growth::{format_growth, pct_change};
use crate::record::{total_registrations, Dimension, RegistrationRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Overall YoY growth above this reads as an accelerating market
const ACCELERATING_YOY_PCT: f64 = 10.0;

// ============================================================================
// KPIs
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub record_count: usize,
    pub total_registrations: u64,
    /// Mean of per-(year, month) totals
    pub avg_monthly_registrations: f64,
    pub top_category: Option<String>,
    pub top_category_registrations: u64,
    pub top_manufacturer: Option<String>,
    /// Last year's total vs. the year before it; `None` with fewer than two
    /// years of data or a zero prior year
    pub overall_yoy_growth: Option<f64>,
}

impl Kpis {
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }
}

/// Sum registrations per dimension value, sorted by value
pub fn totals_by(records: &[RegistrationRecord], dim: Dimension) -> Result<BTreeMap<String, u64>> {
    // Per-value sums are bounded by the checked total
    total_registrations(records)?;

    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(dim.value(record).to_string()).or_insert(0) += record.registrations;
    }
    Ok(totals)
}

/// Registrations per calendar year, ascending
pub fn yearly_totals(records: &[RegistrationRecord]) -> Result<BTreeMap<i32, u64>> {
    total_registrations(records)?;

    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.year).or_insert(0) += record.registrations;
    }
    Ok(totals)
}

/// Percent change of the latest year's total over the previous year present
pub fn overall_yoy_growth(yearly: &BTreeMap<i32, u64>) -> Option<f64> {
    let mut latest = yearly.values().rev();
    let current = *latest.next()?;
    let prior = *latest.next()?;
    pct_change(current, prior)
}

/// Largest total; ties go to the alphabetically first label
fn arg_max(totals: &BTreeMap<String, u64>) -> Option<(String, u64)> {
    let mut best: Option<(&String, u64)> = None;
    for (label, &total) in totals {
        match best {
            Some((_, best_total)) if total <= best_total => {}
            _ => best = Some((label, total)),
        }
    }
    best.map(|(label, total)| (label.clone(), total))
}

pub fn compute_kpis(records: &[RegistrationRecord]) -> Result<Kpis> {
    let total_registrations = total_registrations(records)?;

    let mut monthly: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    for record in records {
        *monthly.entry((record.year, record.month)).or_insert(0) += record.registrations;
    }
    let avg_monthly_registrations = if monthly.is_empty() {
        0.0
    } else {
        total_registrations as f64 / monthly.len() as f64
    };

    let top_category = arg_max(&totals_by(records, Dimension::VehicleCategory)?);
    let top_manufacturer = arg_max(&totals_by(records, Dimension::Manufacturer)?);

    Ok(Kpis {
        record_count: records.len(),
        total_registrations,
        avg_monthly_registrations,
        top_category_registrations: top_category.as_ref().map(|(_, t)| *t).unwrap_or(0),
        top_category: top_category.map(|(label, _)| label),
        top_manufacturer: top_manufacturer.map(|(label, _)| label),
        overall_yoy_growth: overall_yoy_growth(&yearly_totals(records)?),
    })
}

// ============================================================================
// RANKINGS & TRENDS
// ============================================================================

/// Top `n` manufacturers by total registrations, descending
pub fn top_manufacturers(records: &[RegistrationRecord], n: usize) -> Result<Vec<(String, u64)>> {
    let mut ranked: Vec<(String, u64)> = totals_by(records, Dimension::Manufacturer)?
        .into_iter()
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(n);
    Ok(ranked)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub label: String,
    pub registrations: u64,
}

/// Registrations per (date, dimension value), sorted by date then label
pub fn trend_by(records: &[RegistrationRecord], dim: Dimension) -> Result<Vec<TrendPoint>> {
    total_registrations(records)?;

    let mut points: BTreeMap<(NaiveDate, String), u64> = BTreeMap::new();
    for record in records {
        *points
            .entry((record.date, dim.value(record).to_string()))
            .or_insert(0) += record.registrations;
    }
    Ok(points
        .into_iter()
        .map(|((date, label), registrations)| TrendPoint {
            date,
            label,
            registrations,
        })
        .collect())
}

/// Human-readable summary bullets
pub fn insight_lines(kpis: &Kpis) -> Vec<String> {
    if kpis.is_empty() {
        return vec!["No data available for the selected filters.".to_string()];
    }

    let mut lines = vec![format!(
        "Overall market YoY growth: {}",
        format_growth(kpis.overall_yoy_growth)
    )];

    match kpis.overall_yoy_growth {
        Some(g) if g > ACCELERATING_YOY_PCT => {
            lines.push("Market growth is accelerating year over year".to_string())
        }
        Some(_) => lines.push("Market growth is steady; established segments still dominate".to_string()),
        None => {}
    }

    lines.push(format!(
        "Dataset contains {} registration records",
        kpis.record_count
    ));

    if let Some(category) = &kpis.top_category {
        lines.push(format!(
            "{} segment leads with {} registrations",
            category, kpis.top_category_registrations
        ));
    }
    if let Some(manufacturer) = &kpis.top_manufacturer {
        lines.push(format!("{} is the top manufacturer by volume", manufacturer));
    }

    lines.push("Growth columns compare quarterly totals (QoQ) and the same quarter a year earlier (YoY)".to_string());
    lines
}
