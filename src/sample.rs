// 🎲 Sample Data Source
// Synthesizes monthly registrations per category × manufacturer.
// No live data source is contacted; output is reproducible for a given seed.

use crate::record::RegistrationRecord;
use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::Range;
use tracing::debug;

// ============================================================================
// CATALOG
// ============================================================================

/// One vehicle category with its manufacturers and base monthly volume range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub category: String,
    pub manufacturers: Vec<String>,
    /// Half-open range the base monthly registrations are drawn from
    pub base_range: Range<u64>,
}

impl CategorySpec {
    pub fn new(category: &str, manufacturers: &[&str], base_range: Range<u64>) -> Self {
        CategorySpec {
            category: category.to_string(),
            manufacturers: manufacturers.iter().map(|m| m.to_string()).collect(),
            base_range,
        }
    }
}

/// Indian market catalog: 2W / 3W / 4W with five manufacturers each
pub fn default_catalog() -> Vec<CategorySpec> {
    vec![
        CategorySpec::new(
            "2W",
            &["Hero MotoCorp", "Honda", "TVS", "Bajaj", "Yamaha"],
            8000..15000,
        ),
        CategorySpec::new(
            "3W",
            &["Bajaj", "Mahindra", "TVS", "Piaggio", "Atul Auto"],
            1000..3000,
        ),
        CategorySpec::new(
            "4W",
            &["Maruti Suzuki", "Hyundai", "Tata", "Mahindra", "Kia"],
            5000..12000,
        ),
    ]
}

// ============================================================================
// GENERATOR
// ============================================================================

/// Seasonal multiplier for a calendar month: `1 + 0.1 * sin(2π * month / 12)`
pub fn month_factor(month: u32) -> f64 {
    1.0 + 0.1 * (2.0 * PI * f64::from(month) / 12.0).sin()
}

/// Linear growth multiplier: +5% per year since the first generated year
pub fn year_growth(year: i32, start_year: i32) -> f64 {
    1.0 + 0.05 * f64::from(year - start_year)
}

/// First day of the month `months_back` months before `date`'s month
pub fn first_of_month_back(date: NaiveDate, months_back: u32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 - months_back as i32;
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
}

fn next_month(date: NaiveDate) -> Option<NaiveDate> {
    if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    }
}

#[derive(Debug, Clone)]
pub struct SampleGenerator {
    catalog: Vec<CategorySpec>,
    seed: u64,
}

impl SampleGenerator {
    pub fn new(seed: u64) -> Self {
        SampleGenerator {
            catalog: default_catalog(),
            seed,
        }
    }

    /// Builder pattern: replace the category catalog
    pub fn with_catalog(mut self, catalog: Vec<CategorySpec>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &[CategorySpec] {
        &self.catalog
    }

    /// One record per category × manufacturer for each month from `start`'s
    /// month through `end` (inclusive). Records are dated the 1st of the month.
    pub fn generate(&self, start: NaiveDate, end: NaiveDate) -> Vec<RegistrationRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut records = Vec::new();

        let Some(mut current) = first_of_month_back(start, 0) else {
            return records;
        };
        let start_year = current.year();

        while current <= end {
            let seasonal = month_factor(current.month());
            let growth = year_growth(current.year(), start_year);

            for spec in &self.catalog {
                for manufacturer in &spec.manufacturers {
                    let base = if spec.base_range.is_empty() {
                        spec.base_range.start
                    } else {
                        rng.gen_range(spec.base_range.clone())
                    };
                    let registrations = (base as f64 * seasonal * growth).floor() as u64;

                    records.push(RegistrationRecord::new(
                        current,
                        spec.category.as_str(),
                        manufacturer.as_str(),
                        registrations,
                    ));
                }
            }

            match next_month(current) {
                Some(next) => current = next,
                None => break,
            }
        }

        debug!(
            seed = self.seed,
            start = %start,
            end = %end,
            records = records.len(),
            "generated sample registrations"
        );
        records
    }

    /// The `months` calendar months ending with `today`'s month
    pub fn generate_recent(&self, today: NaiveDate, months: u32) -> Vec<RegistrationRecord> {
        match first_of_month_back(today, months.saturating_sub(1)) {
            Some(start) if months > 0 => self.generate(start, today),
            _ => Vec::new(),
        }
    }
}
