// 🚗 Registration Records - one row per (date, manufacturer, vehicle category)
// CSV layout: date,year,quarter,month,vehicle_category,manufacturer,registrations

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// QUARTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Quarter containing a calendar month: `ceil(month / 3)`
    pub fn from_month(month: u32) -> Result<Self> {
        match month {
            1..=3 => Ok(Quarter::Q1),
            4..=6 => Ok(Quarter::Q2),
            7..=9 => Ok(Quarter::Q3),
            10..=12 => Ok(Quarter::Q4),
            _ => Err(Error::invalid_record(format!("month {} out of range 1-12", month))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    /// 1-based quarter number
    pub fn number(&self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Quarter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "Q1" => Ok(Quarter::Q1),
            "Q2" => Ok(Quarter::Q2),
            "Q3" => Ok(Quarter::Q3),
            "Q4" => Ok(Quarter::Q4),
            _ => Err(Error::InvalidQuarter(s.to_string())),
        }
    }
}

// ============================================================================
// DIMENSION KEYS
// ============================================================================

/// Categorical record field usable as a grouping key.
///
/// The set of *fields* is fixed by the record schema; the *values* of each
/// field are open string labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    VehicleCategory,
    Manufacturer,
}

impl Dimension {
    pub const ALL: [Dimension; 2] = [Dimension::VehicleCategory, Dimension::Manufacturer];

    /// Field name as it appears in the CSV header
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::VehicleCategory => "vehicle_category",
            Dimension::Manufacturer => "manufacturer",
        }
    }

    /// Human-readable column title
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::VehicleCategory => "Category",
            Dimension::Manufacturer => "Manufacturer",
        }
    }

    pub fn value<'a>(&self, record: &'a RegistrationRecord) -> &'a str {
        match self {
            Dimension::VehicleCategory => &record.vehicle_category,
            Dimension::Manufacturer => &record.manufacturer,
        }
    }

    /// Parse a list of field names ("vehicle_category,manufacturer").
    ///
    /// Rejects empty lists, unknown names, and repeated names.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Dimension>> {
        let mut dims = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                continue;
            }
            let dim: Dimension = name.parse()?;
            if dims.contains(&dim) {
                return Err(Error::DuplicateDimension(dim.as_str().to_string()));
            }
            dims.push(dim);
        }

        if dims.is_empty() {
            return Err(Error::NoDimensions);
        }
        Ok(dims)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "vehicle_category" | "category" => Ok(Dimension::VehicleCategory),
            "manufacturer" => Ok(Dimension::Manufacturer),
            other => Err(Error::UnknownDimension(other.to_string())),
        }
    }
}

// ============================================================================
// REGISTRATION RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub date: NaiveDate,
    pub year: i32,
    pub quarter: Quarter,
    pub month: u32,
    pub vehicle_category: String,
    pub manufacturer: String,
    pub registrations: u64,
}

impl RegistrationRecord {
    /// Build a record, deriving year, month and quarter from the date
    pub fn new(
        date: NaiveDate,
        vehicle_category: impl Into<String>,
        manufacturer: impl Into<String>,
        registrations: u64,
    ) -> Self {
        let month = date.month();
        let quarter = match month {
            1..=3 => Quarter::Q1,
            4..=6 => Quarter::Q2,
            7..=9 => Quarter::Q3,
            _ => Quarter::Q4,
        };

        RegistrationRecord {
            date,
            year: date.year(),
            quarter,
            month,
            vehicle_category: vehicle_category.into(),
            manufacturer: manufacturer.into(),
            registrations,
        }
    }

    /// Check that the derived time fields agree with each other
    pub fn validate(&self) -> Result<()> {
        let expected_quarter = Quarter::from_month(self.month)?;
        if expected_quarter != self.quarter {
            return Err(Error::invalid_record(format!(
                "quarter {} does not match month {} (expected {})",
                self.quarter, self.month, expected_quarter
            )));
        }

        if self.date.year() != self.year {
            return Err(Error::invalid_record(format!(
                "year {} does not match date {}",
                self.year, self.date
            )));
        }

        if self.date.month() != self.month {
            return Err(Error::invalid_record(format!(
                "month {} does not match date {}",
                self.month, self.date
            )));
        }

        if self.vehicle_category.trim().is_empty() || self.manufacturer.trim().is_empty() {
            return Err(Error::invalid_record("vehicle_category and manufacturer must be non-empty"));
        }

        Ok(())
    }
}

/// Sum of registrations over `records`.
///
/// Every per-group sum is bounded by this total, so callers that check it once
/// can accumulate groups without further overflow checks.
pub fn total_registrations(records: &[RegistrationRecord]) -> Result<u64> {
    records
        .iter()
        .try_fold(0u64, |acc, r| acc.checked_add(r.registrations))
        .ok_or(Error::RegistrationOverflow)
}

// ============================================================================
// CSV I/O
// ============================================================================

pub fn load_csv(csv_path: &Path) -> Result<Vec<RegistrationRecord>> {
    let csv_err = |source| Error::Csv {
        path: csv_path.to_path_buf(),
        source,
    };

    let mut rdr = csv::Reader::from_path(csv_path).map_err(csv_err)?;
    let mut records = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let record: RegistrationRecord = result.map_err(csv_err)?;

        // Line 1 is the header
        record.validate().map_err(|e| match e {
            Error::InvalidRecord { message, .. } => Error::InvalidRecord {
                line: Some(index as u64 + 2),
                message,
            },
            other => other,
        })?;

        records.push(record);
    }

    debug!(path = %csv_path.display(), records = records.len(), "loaded registrations CSV");
    Ok(records)
}

pub fn write_csv(csv_path: &Path, records: &[RegistrationRecord]) -> Result<()> {
    let csv_err = |source| Error::Csv {
        path: csv_path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(csv_path).map_err(csv_err)?;
    for record in records {
        wtr.serialize(record).map_err(csv_err)?;
    }
    wtr.flush()?;

    debug!(path = %csv_path.display(), records = records.len(), "wrote registrations CSV");
    Ok(())
}
