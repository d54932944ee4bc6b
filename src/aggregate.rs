// 📊 Aggregate Table Builder
// Groups registration records by dimension keys + (year, quarter) and sums registrations.
//
// Row order is part of the contract: ascending by (year, quarter, dimension values
// in the order supplied). Growth computation relies on it.

use crate::error::{Error, Result};
use crate::record::{total_registrations, Dimension, Quarter, RegistrationRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// AGGREGATE ROW / TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// Dimension values, positionally matching `AggregateTable::dimensions`
    pub keys: Vec<String>,
    pub year: i32,
    pub quarter: Quarter,
    pub registrations: u64,
}

impl AggregateRow {
    /// Value of one grouping column, if the row was grouped by it
    pub fn key(&self, dimensions: &[Dimension], dim: Dimension) -> Option<&str> {
        dimensions
            .iter()
            .position(|d| *d == dim)
            .and_then(|i| self.keys.get(i))
            .map(String::as_str)
    }

    /// "2023 Q2"
    pub fn period_label(&self) -> String {
        format!("{} {}", self.year, self.quarter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateTable {
    pub dimensions: Vec<Dimension>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of registrations over every row (fits in `u64` for any built table)
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.registrations).sum()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Check a dimension-key list: non-empty, no repeats.
pub(crate) fn check_dimensions(dimensions: &[Dimension]) -> Result<()> {
    if dimensions.is_empty() {
        return Err(Error::NoDimensions);
    }
    for (i, dim) in dimensions.iter().enumerate() {
        if dimensions[..i].contains(dim) {
            return Err(Error::DuplicateDimension(dim.as_str().to_string()));
        }
    }
    Ok(())
}

/// Group records by `dimensions` + (year, quarter) and sum registrations.
///
/// Empty input yields an empty table. Fails with `RegistrationOverflow` when
/// the input total does not fit in a `u64`.
pub fn build_aggregate_table(
    records: &[RegistrationRecord],
    dimensions: &[Dimension],
) -> Result<AggregateTable> {
    check_dimensions(dimensions)?;
    // Group sums are bounded by the checked total
    total_registrations(records)?;

    // BTreeMap key order == output order: (year, quarter, keys...)
    let mut groups: BTreeMap<(i32, Quarter, Vec<String>), u64> = BTreeMap::new();

    for record in records {
        let keys: Vec<String> = dimensions
            .iter()
            .map(|d| d.value(record).to_string())
            .collect();

        *groups
            .entry((record.year, record.quarter, keys))
            .or_insert(0) += record.registrations;
    }

    let rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|((year, quarter, keys), registrations)| AggregateRow {
            keys,
            year,
            quarter,
            registrations,
        })
        .collect();

    debug!(
        records = records.len(),
        rows = rows.len(),
        dimensions = ?dimensions,
        "built aggregate table"
    );

    Ok(AggregateTable {
        dimensions: dimensions.to_vec(),
        rows,
    })
}

/// Convenience wrapper taking field names instead of typed keys.
pub fn build_aggregate_table_by_names<S: AsRef<str>>(
    records: &[RegistrationRecord],
    names: &[S],
) -> Result<AggregateTable> {
    let dimensions = Dimension::parse_list(names)?;
    build_aggregate_table(records, &dimensions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rec(y: i32, m: u32, category: &str, manufacturer: &str, n: u64) -> RegistrationRecord {
        RegistrationRecord::new(
            NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
            category,
            manufacturer,
            n,
        )
    }

    fn sample() -> Vec<RegistrationRecord> {
        vec![
            rec(2022, 4, "2W", "Honda", 10),
            rec(2022, 1, "4W", "Tata", 7),
            rec(2022, 2, "2W", "Honda", 5),
            rec(2022, 1, "2W", "TVS", 3),
            rec(2021, 12, "2W", "Honda", 1),
            rec(2022, 3, "4W", "Kia", 2),
        ]
    }

    #[test]
    fn test_empty_input_yields_empty_table() {
        let table = build_aggregate_table(&[], &[Dimension::VehicleCategory]).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.dimensions, vec![Dimension::VehicleCategory]);
    }

    #[test]
    fn test_rejects_empty_and_duplicate_dimensions() {
        assert!(matches!(
            build_aggregate_table(&sample(), &[]),
            Err(Error::NoDimensions)
        ));
        assert!(matches!(
            build_aggregate_table(
                &sample(),
                &[Dimension::Manufacturer, Dimension::Manufacturer]
            ),
            Err(Error::DuplicateDimension(_))
        ));
    }

    #[test]
    fn test_unknown_field_name_is_configuration_error() {
        let err = build_aggregate_table_by_names(&sample(), &["fuel_type"]).unwrap_err();
        assert!(err.is_configuration_error());
        assert!(matches!(err, Error::UnknownDimension(name) if name == "fuel_type"));
    }

    #[test]
    fn test_groups_by_category_and_quarter() {
        let table = build_aggregate_table(&sample(), &[Dimension::VehicleCategory]).unwrap();

        let summary: Vec<(i32, Quarter, &str, u64)> = table
            .rows
            .iter()
            .map(|r| (r.year, r.quarter, r.keys[0].as_str(), r.registrations))
            .collect();

        assert_eq!(
            summary,
            vec![
                (2021, Quarter::Q4, "2W", 1),
                (2022, Quarter::Q1, "2W", 8),
                (2022, Quarter::Q1, "4W", 9),
                (2022, Quarter::Q2, "2W", 10),
            ]
        );
    }

    #[test]
    fn test_sort_uses_dimension_order_supplied() {
        let table = build_aggregate_table(
            &sample(),
            &[Dimension::Manufacturer, Dimension::VehicleCategory],
        )
        .unwrap();

        let q1_2022: Vec<Vec<String>> = table
            .rows
            .iter()
            .filter(|r| r.year == 2022 && r.quarter == Quarter::Q1)
            .map(|r| r.keys.clone())
            .collect();

        assert_eq!(
            q1_2022,
            vec![
                vec!["Honda".to_string(), "2W".to_string()],
                vec!["Kia".to_string(), "4W".to_string()],
                vec!["TVS".to_string(), "2W".to_string()],
                vec!["Tata".to_string(), "4W".to_string()],
            ]
        );
    }

    #[test]
    fn test_total_is_conserved() {
        let records = sample();
        let input_total: u64 = records.iter().map(|r| r.registrations).sum();

        for dims in [
            vec![Dimension::VehicleCategory],
            vec![Dimension::Manufacturer],
            vec![Dimension::VehicleCategory, Dimension::Manufacturer],
        ] {
            let table = build_aggregate_table(&records, &dims).unwrap();
            assert_eq!(table.total(), input_total);
        }
    }

    #[test]
    fn test_overflowing_counts_are_rejected() {
        let records = vec![
            rec(2022, 1, "2W", "Honda", u64::MAX),
            rec(2022, 2, "2W", "Honda", 1),
        ];
        let err = build_aggregate_table(&records, &[Dimension::VehicleCategory]).unwrap_err();
        assert!(matches!(err, Error::RegistrationOverflow));

        // Separate groups still overflow the table total
        let records = vec![
            rec(2022, 1, "2W", "Honda", u64::MAX),
            rec(2023, 1, "4W", "Tata", 1),
        ];
        assert!(build_aggregate_table(&records, &[Dimension::VehicleCategory]).is_err());
    }

    #[test]
    fn test_row_key_lookup() {
        let dims = [Dimension::VehicleCategory, Dimension::Manufacturer];
        let table = build_aggregate_table(&sample(), &dims).unwrap();
        let row = &table.rows[0];
        assert_eq!(row.key(&dims, Dimension::Manufacturer), Some("Honda"));
        assert_eq!(row.key(&[Dimension::VehicleCategory], Dimension::Manufacturer), None);
        assert_eq!(row.period_label(), "2021 Q4");
    }
}
