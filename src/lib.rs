// Vahan Insights - Core Library
// Vehicle-registration aggregates and period-over-period growth, shared by the CLI, TUI and API server

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod growth;
pub mod insights;
pub mod logging;
pub mod record;
pub mod sample;

// Re-export commonly used types
pub use aggregate::{build_aggregate_table, build_aggregate_table_by_names, AggregateRow, AggregateTable};
pub use cache::{fingerprint, GrowthCache};
pub use config::{Config, DataConfig, ServerConfig};
pub use dataset::{load_dataset, DataSource};
pub use error::{Error, Result};
pub use filter::{date_bounds, distinct_categories, distinct_manufacturers, RecordFilter};
pub use growth::{
    compute_growth, format_growth, growth_metrics, pct_change, GrowthConfig, GrowthRow, GrowthTable,
};
pub use insights::{
    compute_kpis, insight_lines, overall_yoy_growth, top_manufacturers, totals_by, trend_by,
    yearly_totals, Kpis, TrendPoint,
};
pub use logging::{init_logging, Verbosity};
pub use record::{load_csv, total_registrations, write_csv, Dimension, Quarter, RegistrationRecord};
pub use sample::{default_catalog, CategorySpec, SampleGenerator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
