// 📈 Growth Metric Calculator
// Appends year-over-year and quarter-over-quarter percentage change to an aggregate table.
//
// Growth is computed per dimension group over the group's own time-ordered rows.
// Missing history and a zero prior value both produce `None`, never inf/NaN/0.

use crate::aggregate::{build_aggregate_table, check_dimensions, AggregateTable};
use crate::error::{Error, Result};
use crate::record::{Dimension, Quarter, RegistrationRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Period lags used for the two growth columns.
///
/// Defaults match a quarterly table: QoQ looks back 1 row, YoY looks back 4.
/// A monthly table would use `yoy_lag = 12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub qoq_lag: usize,
    pub yoy_lag: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self::quarterly()
    }
}

impl GrowthConfig {
    pub const fn quarterly() -> Self {
        GrowthConfig {
            qoq_lag: 1,
            yoy_lag: 4,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.qoq_lag == 0 {
            return Err(Error::InvalidLag {
                name: "qoq",
                lag: self.qoq_lag,
            });
        }
        if self.yoy_lag == 0 {
            return Err(Error::InvalidLag {
                name: "yoy",
                lag: self.yoy_lag,
            });
        }
        Ok(())
    }
}

// ============================================================================
// GROWTH-ENRICHED ROW / TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthRow {
    pub keys: Vec<String>,
    pub year: i32,
    pub quarter: Quarter,
    pub registrations: u64,
    /// Percent change vs. `yoy_lag` periods earlier in the same group
    pub yoy_growth: Option<f64>,
    /// Percent change vs. `qoq_lag` periods earlier in the same group
    pub qoq_growth: Option<f64>,
}

impl GrowthRow {
    pub fn period_label(&self) -> String {
        format!("{} {}", self.year, self.quarter)
    }

    /// Dimension values joined for display ("2W / Honda")
    pub fn group_label(&self) -> String {
        self.keys.join(" / ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthTable {
    pub dimensions: Vec<Dimension>,
    pub rows: Vec<GrowthRow>,
}

impl GrowthTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last row of every dimension group, in order of first appearance
    pub fn latest_per_group(&self) -> Vec<&GrowthRow> {
        let mut order: Vec<&[String]> = Vec::new();
        let mut latest: HashMap<&[String], &GrowthRow> = HashMap::new();

        for row in &self.rows {
            let key = row.keys.as_slice();
            if latest.insert(key, row).is_none() {
                order.push(key);
            }
        }

        order.into_iter().filter_map(|k| latest.get(k).copied()).collect()
    }

    /// Last `n` rows of the table
    pub fn tail(&self, n: usize) -> &[GrowthRow] {
        let start = self.rows.len().saturating_sub(n);
        &self.rows[start..]
    }
}

// ============================================================================
// CALCULATOR
// ============================================================================

/// Percent change from `prior` to `current`; `None` when `prior` is zero.
pub fn pct_change(current: u64, prior: u64) -> Option<f64> {
    if prior == 0 {
        return None;
    }
    let prior = prior as f64;
    Some((current as f64 - prior) / prior * 100.0)
}

/// Render a growth value for tables: "+25.0%", "-100.0%" or "N/A".
pub fn format_growth(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.1}%", v),
        None => "N/A".to_string(),
    }
}

fn ensure_same_grouping(table: &AggregateTable, dimensions: &[Dimension]) -> Result<()> {
    let same_set = table.dimensions.len() == dimensions.len()
        && dimensions.iter().all(|d| table.dimensions.contains(d));

    if same_set {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            requested: dimensions.iter().map(|d| d.as_str().to_string()).collect(),
            table: table.dimensions.iter().map(|d| d.as_str().to_string()).collect(),
        })
    }
}

/// Append YoY and QoQ growth to an aggregate table.
///
/// `dimensions` must be the key set the table was built with. The output has
/// the same rows in the same order.
pub fn compute_growth(
    table: &AggregateTable,
    dimensions: &[Dimension],
    config: &GrowthConfig,
) -> Result<GrowthTable> {
    check_dimensions(dimensions)?;
    config.validate()?;
    ensure_same_grouping(table, dimensions)?;

    // Pass 1: partition row indices by group, keeping table (time) order
    let mut partitions: HashMap<&[String], Vec<usize>> = HashMap::new();
    for (i, row) in table.rows.iter().enumerate() {
        partitions.entry(row.keys.as_slice()).or_default().push(i);
    }

    // Pass 2: shifted differences within each partition
    let mut yoy = vec![None; table.rows.len()];
    let mut qoq = vec![None; table.rows.len()];

    for indices in partitions.values() {
        for (pos, &row_idx) in indices.iter().enumerate() {
            let current = table.rows[row_idx].registrations;

            if pos >= config.qoq_lag {
                let prior = table.rows[indices[pos - config.qoq_lag]].registrations;
                qoq[row_idx] = pct_change(current, prior);
            }
            if pos >= config.yoy_lag {
                let prior = table.rows[indices[pos - config.yoy_lag]].registrations;
                yoy[row_idx] = pct_change(current, prior);
            }
        }
    }

    let rows: Vec<GrowthRow> = table
        .rows
        .iter()
        .zip(yoy.into_iter().zip(qoq))
        .map(|(row, (yoy_growth, qoq_growth))| GrowthRow {
            keys: row.keys.clone(),
            year: row.year,
            quarter: row.quarter,
            registrations: row.registrations,
            yoy_growth,
            qoq_growth,
        })
        .collect();

    debug!(
        rows = rows.len(),
        groups = partitions.len(),
        qoq_lag = config.qoq_lag,
        yoy_lag = config.yoy_lag,
        "computed growth metrics"
    );

    Ok(GrowthTable {
        dimensions: table.dimensions.clone(),
        rows,
    })
}

/// Aggregate records and compute growth in one step.
pub fn growth_metrics(
    records: &[RegistrationRecord],
    dimensions: &[Dimension],
    config: &GrowthConfig,
) -> Result<GrowthTable> {
    let table = build_aggregate_table(records, dimensions)?;
    compute_growth(&table, dimensions, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateRow;

    fn row(key: &str, year: i32, quarter: Quarter, registrations: u64) -> AggregateRow {
        AggregateRow {
            keys: vec![key.to_string()],
            year,
            quarter,
            registrations,
        }
    }

    fn category_table(rows: Vec<AggregateRow>) -> AggregateTable {
        AggregateTable {
            dimensions: vec![Dimension::VehicleCategory],
            rows,
        }
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let v = actual.expect("expected a defined growth value");
        assert!((v - expected).abs() < 1e-9, "{} != {}", v, expected);
    }

    #[test]
    fn test_pct_change() {
        assert_close(pct_change(150, 120), 25.0);
        assert_close(pct_change(0, 50), -100.0);
        assert_close(pct_change(50, 50), 0.0);
        assert_eq!(pct_change(50, 0), None);
        assert_eq!(pct_change(0, 0), None);
    }

    #[test]
    fn test_format_growth() {
        assert_eq!(format_growth(Some(25.0)), "+25.0%");
        assert_eq!(format_growth(Some(-100.0)), "-100.0%");
        assert_eq!(format_growth(Some(0.0)), "+0.0%");
        assert_eq!(format_growth(None), "N/A");
    }

    #[test]
    fn test_two_wheeler_five_quarter_scenario() {
        let table = category_table(vec![
            row("2W", 2021, Quarter::Q1, 100),
            row("2W", 2021, Quarter::Q2, 110),
            row("2W", 2021, Quarter::Q3, 90),
            row("2W", 2021, Quarter::Q4, 120),
            row("2W", 2022, Quarter::Q1, 150),
        ]);

        let growth =
            compute_growth(&table, &[Dimension::VehicleCategory], &GrowthConfig::default()).unwrap();

        assert_eq!(growth.len(), 5);

        let q1_2022 = &growth.rows[4];
        assert_close(q1_2022.qoq_growth, 25.0);
        assert_close(q1_2022.yoy_growth, 50.0);

        let q2_2021 = &growth.rows[1];
        assert_close(q2_2021.qoq_growth, 10.0);
        assert_eq!(q2_2021.yoy_growth, None);

        let q1_2021 = &growth.rows[0];
        assert_eq!(q1_2021.qoq_growth, None);
        assert_eq!(q1_2021.yoy_growth, None);
    }

    #[test]
    fn test_zero_prior_value_is_undefined() {
        let table = category_table(vec![
            row("3W", 2021, Quarter::Q1, 50),
            row("3W", 2021, Quarter::Q2, 0),
            row("3W", 2021, Quarter::Q3, 50),
        ]);

        let growth =
            compute_growth(&table, &[Dimension::VehicleCategory], &GrowthConfig::default()).unwrap();

        assert_eq!(growth.rows[0].qoq_growth, None);
        assert_close(growth.rows[1].qoq_growth, -100.0);
        assert_eq!(growth.rows[2].qoq_growth, None);
    }

    #[test]
    fn test_groups_are_partitioned_independently() {
        // Interleaved as the aggregate builder would emit them
        let table = category_table(vec![
            row("2W", 2021, Quarter::Q1, 100),
            row("4W", 2021, Quarter::Q1, 40),
            row("2W", 2021, Quarter::Q2, 200),
            row("4W", 2021, Quarter::Q2, 50),
            row("3W", 2021, Quarter::Q3, 7),
        ]);

        let growth =
            compute_growth(&table, &[Dimension::VehicleCategory], &GrowthConfig::default()).unwrap();

        assert_eq!(growth.rows[0].qoq_growth, None);
        assert_eq!(growth.rows[1].qoq_growth, None);
        assert_close(growth.rows[2].qoq_growth, 100.0);
        assert_close(growth.rows[3].qoq_growth, 25.0);
        // Single-period group never gets growth
        assert_eq!(growth.rows[4].qoq_growth, None);
        assert_eq!(growth.rows[4].yoy_growth, None);
    }

    #[test]
    fn test_dimension_mismatch_is_configuration_error() {
        let table = category_table(vec![row("2W", 2021, Quarter::Q1, 100)]);
        let err = compute_growth(&table, &[Dimension::Manufacturer], &GrowthConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
        assert!(err.is_configuration_error());

        let err = compute_growth(
            &table,
            &[Dimension::VehicleCategory, Dimension::Manufacturer],
            &GrowthConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn test_dimension_order_does_not_matter_for_matching() {
        let records = vec![
            RegistrationRecord::new(
                chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
                "2W",
                "Honda",
                10,
            ),
            RegistrationRecord::new(
                chrono::NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
                "2W",
                "Honda",
                15,
            ),
        ];
        let table = build_aggregate_table(
            &records,
            &[Dimension::VehicleCategory, Dimension::Manufacturer],
        )
        .unwrap();

        let growth = compute_growth(
            &table,
            &[Dimension::Manufacturer, Dimension::VehicleCategory],
            &GrowthConfig::default(),
        )
        .unwrap();
        assert_close(growth.rows[1].qoq_growth, 50.0);
    }

    #[test]
    fn test_zero_lag_rejected() {
        let table = category_table(vec![row("2W", 2021, Quarter::Q1, 100)]);
        let config = GrowthConfig {
            qoq_lag: 1,
            yoy_lag: 0,
        };
        let err = compute_growth(&table, &[Dimension::VehicleCategory], &config).unwrap_err();
        assert!(matches!(err, Error::InvalidLag { name: "yoy", lag: 0 }));
    }

    #[test]
    fn test_custom_yoy_lag() {
        let table = category_table(vec![
            row("2W", 2021, Quarter::Q1, 100),
            row("2W", 2021, Quarter::Q2, 120),
            row("2W", 2021, Quarter::Q3, 150),
        ]);
        let config = GrowthConfig {
            qoq_lag: 1,
            yoy_lag: 2,
        };
        let growth = compute_growth(&table, &[Dimension::VehicleCategory], &config).unwrap();
        assert_eq!(growth.rows[1].yoy_growth, None);
        assert_close(growth.rows[2].yoy_growth, 50.0);
    }

    #[test]
    fn test_empty_table_yields_empty_growth() {
        let growth = compute_growth(
            &category_table(vec![]),
            &[Dimension::VehicleCategory],
            &GrowthConfig::default(),
        )
        .unwrap();
        assert!(growth.is_empty());
    }

    #[test]
    fn test_recompute_is_identical() {
        let table = category_table(vec![
            row("2W", 2021, Quarter::Q1, 100),
            row("4W", 2021, Quarter::Q1, 0),
            row("2W", 2021, Quarter::Q2, 110),
            row("4W", 2021, Quarter::Q2, 30),
        ]);
        let dims = [Dimension::VehicleCategory];
        let first = compute_growth(&table, &dims, &GrowthConfig::default()).unwrap();
        let second = compute_growth(&table, &dims, &GrowthConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_latest_per_group_and_tail() {
        let table = category_table(vec![
            row("2W", 2021, Quarter::Q1, 100),
            row("4W", 2021, Quarter::Q1, 40),
            row("2W", 2021, Quarter::Q2, 200),
        ]);
        let growth =
            compute_growth(&table, &[Dimension::VehicleCategory], &GrowthConfig::default()).unwrap();

        let latest = growth.latest_per_group();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].keys, vec!["2W".to_string()]);
        assert_eq!(latest[0].quarter, Quarter::Q2);
        assert_eq!(latest[1].keys, vec!["4W".to_string()]);

        assert_eq!(growth.tail(2).len(), 2);
        assert_eq!(growth.tail(10).len(), 3);
        assert_eq!(growth.tail(1)[0].registrations, 200);
    }
}
