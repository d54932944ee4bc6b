// 📂 Dataset loading - CSV when present, synthetic sample otherwise

use crate::config::DataConfig;
use crate::error::Result;
use crate::record::{load_csv, RegistrationRecord};
use crate::sample::SampleGenerator;
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Csv(PathBuf),
    Sample { seed: u64, months: u32 },
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Csv(path) => write!(f, "CSV {}", path.display()),
            DataSource::Sample { seed, months } => {
                write!(f, "sample data ({} months, seed {})", months, seed)
            }
        }
    }
}

/// Read `config.csv_path`, or synthesize `config.sample_months` months ending at `today`.
pub fn load_dataset(
    config: &DataConfig,
    today: NaiveDate,
) -> Result<(Vec<RegistrationRecord>, DataSource)> {
    if config.csv_path.exists() {
        let records = load_csv(&config.csv_path)?;
        info!(path = %config.csv_path.display(), records = records.len(), "loaded dataset");
        return Ok((records, DataSource::Csv(config.csv_path.clone())));
    }

    let records = SampleGenerator::new(config.sample_seed).generate_recent(today, config.sample_months);
    info!(
        records = records.len(),
        seed = config.sample_seed,
        "CSV not found, using synthetic sample data"
    );
    Ok((
        records,
        DataSource::Sample {
            seed: config.sample_seed,
            months: config.sample_months,
        },
    ))
}
