// 🔍 Record Filters - date range, category and manufacturer selection
// An empty selection is a valid result, not an error.

use crate::record::RegistrationRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Inclusive lower bound on `date`
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on `date`
    pub to: Option<NaiveDate>,
    /// Allowed vehicle categories (None = all)
    pub categories: Option<BTreeSet<String>>,
    /// Allowed manufacturers (None = all)
    pub manufacturers: Option<BTreeSet<String>>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: restrict to a date range
    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Builder pattern: restrict categories (empty iterator = no restriction)
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = categories.into_iter().map(Into::into).collect();
        self.categories = if set.is_empty() { None } else { Some(set) };
        self
    }

    /// Builder pattern: restrict manufacturers (empty iterator = no restriction)
    pub fn with_manufacturers<I, S>(mut self, manufacturers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = manufacturers.into_iter().map(Into::into).collect();
        self.manufacturers = if set.is_empty() { None } else { Some(set) };
        self
    }

    pub fn is_active(&self) -> bool {
        self.from.is_some()
            || self.to.is_some()
            || self.categories.is_some()
            || self.manufacturers.is_some()
    }

    pub fn matches(&self, record: &RegistrationRecord) -> bool {
        if let Some(from) = self.from {
            if record.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.date > to {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(&record.vehicle_category) {
                return false;
            }
        }
        if let Some(manufacturers) = &self.manufacturers {
            if !manufacturers.contains(&record.manufacturer) {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, records: &[RegistrationRecord]) -> Vec<RegistrationRecord> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

/// Distinct vehicle categories, sorted
pub fn distinct_categories(records: &[RegistrationRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.vehicle_category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct manufacturers, sorted
pub fn distinct_manufacturers(records: &[RegistrationRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.manufacturer.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// (earliest, latest) record date
pub fn date_bounds(records: &[RegistrationRecord]) -> Option<(NaiveDate, NaiveDate)> {
    let min = records.iter().map(|r| r.date).min()?;
    let max = records.iter().map(|r| r.date).max()?;
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(y: i32, m: u32, category: &str, manufacturer: &str) -> RegistrationRecord {
        RegistrationRecord::new(NaiveDate::from_ymd_opt(y, m, 1).unwrap(), category, manufacturer, 1)
    }

    fn sample() -> Vec<RegistrationRecord> {
        vec![
            rec(2022, 1, "2W", "Honda"),
            rec(2022, 6, "3W", "Bajaj"),
            rec(2023, 1, "2W", "Bajaj"),
            rec(2023, 3, "4W", "Kia"),
        ]
    }

    #[test]
    fn test_default_filter_keeps_everything() {
        let filter = RecordFilter::new();
        assert!(!filter.is_active());
        assert_eq!(filter.apply(&sample()).len(), 4);
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let filter = RecordFilter::new().with_date_range(
            NaiveDate::from_ymd_opt(2022, 6, 1),
            NaiveDate::from_ymd_opt(2023, 1, 1),
        );
        let kept = filter.apply(&sample());
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].manufacturer, "Bajaj");
        assert_eq!(kept[1].year, 2023);
    }

    #[test]
    fn test_category_and_manufacturer_selection() {
        let filter = RecordFilter::new()
            .with_categories(["2W", "3W"])
            .with_manufacturers(["Bajaj"]);
        let kept = filter.apply(&sample());
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| r.manufacturer == "Bajaj"));
    }

    #[test]
    fn test_empty_selection_is_empty_not_error() {
        let filter = RecordFilter::new().with_categories(["EV"]);
        assert!(filter.apply(&sample()).is_empty());
    }

    #[test]
    fn test_distinct_values_and_bounds() {
        let records = sample();
        assert_eq!(distinct_categories(&records), vec!["2W", "3W", "4W"]);
        assert_eq!(distinct_manufacturers(&records), vec!["Bajaj", "Honda", "Kia"]);

        let (min, max) = date_bounds(&records).unwrap();
        assert_eq!(min, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(max, NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(date_bounds(&[]), None);
    }
}
