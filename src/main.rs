// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use vahan_insights::{
    compute_kpis, format_growth, growth_metrics, init_logging, insight_lines, load_dataset,
    top_manufacturers, write_csv, Config, Dimension, GrowthTable, RecordFilter, RegistrationRecord,
    SampleGenerator, Verbosity,
};

/// vahan-insights - vehicle registration analytics
#[derive(Debug, Parser)]
#[command(name = "vahan-insights")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (default: ./vahan.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write a synthetic registrations CSV
    Generate {
        /// Output file (default: data.csv_path from config)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Number of months ending with the current month
        #[arg(long)]
        months: Option<u32>,
        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print quarterly totals with YoY and QoQ growth
    Growth {
        /// Dimension keys, comma separated (vehicle_category, manufacturer)
        #[arg(long, value_delimiter = ',', default_value = "vehicle_category")]
        by: Vec<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print headline KPIs and insights
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Interactive terminal dashboard (default)
    Ui,
}

#[derive(Debug, Clone, Default, Args)]
struct FilterArgs {
    /// Dataset CSV (overrides config)
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Keep only these vehicle categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,
    /// Keep only these manufacturers (repeatable)
    #[arg(long = "manufacturer")]
    manufacturers: Vec<String>,
    /// First date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn to_filter(&self) -> RecordFilter {
        RecordFilter::new()
            .with_date_range(self.from, self.to)
            .with_categories(self.categories.iter().cloned())
            .with_manufacturers(self.manufacturers.iter().cloned())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose));

    let mut config = Config::load_from(cli.config.as_deref()).context("Failed to load configuration")?;
    info!(?config, "configuration loaded");

    match cli.command.unwrap_or(Command::Ui) {
        Command::Generate { out, months, seed } => run_generate(&config, out, months, seed),
        Command::Growth { by, json, filter } => {
            apply_csv_override(&mut config, &filter);
            run_growth(&config, &by, json, &filter)
        }
        Command::Summary { filter } => {
            apply_csv_override(&mut config, &filter);
            run_summary(&config, &filter)
        }
        Command::Ui => run_ui_mode(&config),
    }
}

fn apply_csv_override(config: &mut Config, filter: &FilterArgs) {
    if let Some(csv) = &filter.csv {
        config.data.csv_path = csv.clone();
    }
}

fn load_filtered(config: &Config, filter: &FilterArgs) -> Result<Vec<RegistrationRecord>> {
    let today = Local::now().date_naive();
    let (records, source) = load_dataset(&config.data, today).context("Failed to load dataset")?;
    println!("📂 Source: {} ({} records)", source, records.len());

    let filtered = filter.to_filter().apply(&records);
    if filtered.len() != records.len() {
        println!("🔍 Filters kept {} of {} records", filtered.len(), records.len());
    }
    Ok(filtered)
}

fn run_generate(
    config: &Config,
    out: Option<PathBuf>,
    months: Option<u32>,
    seed: Option<u64>,
) -> Result<()> {
    let out = out.unwrap_or_else(|| config.data.csv_path.clone());
    let months = months.unwrap_or(config.data.sample_months);
    let seed = seed.unwrap_or(config.data.sample_seed);

    println!("🎲 Generating {} months of sample registrations (seed {})", months, seed);
    let records = SampleGenerator::new(seed).generate_recent(Local::now().date_naive(), months);

    write_csv(&out, &records).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("✓ Saved {} records to {}", records.len(), out.display());
    Ok(())
}

fn run_growth(config: &Config, by: &[String], json: bool, filter: &FilterArgs) -> Result<()> {
    let dimensions = Dimension::parse_list(by)?;
    let records = load_filtered(config, filter)?;

    let growth = growth_metrics(&records, &dimensions, &config.growth)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&growth)?);
        return Ok(());
    }

    if growth.is_empty() {
        println!("⚠️  No data available for the selected filters.");
        return Ok(());
    }

    print_growth_table(&growth);
    Ok(())
}

fn print_growth_table(growth: &GrowthTable) {
    let key_header: Vec<&str> = growth.dimensions.iter().map(|d| d.title()).collect();
    let key_header = key_header.join(" / ");

    println!();
    println!(
        "{:<9} {:<32} {:>14} {:>10} {:>10}",
        "Period", key_header, "Registrations", "YoY", "QoQ"
    );
    println!("{}", "━".repeat(79));

    for row in &growth.rows {
        println!(
            "{:<9} {:<32} {:>14} {:>10} {:>10}",
            row.period_label(),
            row.group_label(),
            row.registrations,
            format_growth(row.yoy_growth),
            format_growth(row.qoq_growth),
        );
    }
}

fn run_summary(config: &Config, filter: &FilterArgs) -> Result<()> {
    let records = load_filtered(config, filter)?;
    let kpis = compute_kpis(&records)?;

    println!("\n📈 Key Performance Indicators");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total Registrations:        {}", kpis.total_registrations);
    println!("Avg Monthly Registrations:  {:.0}", kpis.avg_monthly_registrations);
    println!("Top Vehicle Category:       {}", kpis.top_category.as_deref().unwrap_or("N/A"));
    println!("Top Manufacturer:           {}", kpis.top_manufacturer.as_deref().unwrap_or("N/A"));
    println!("Overall YoY Growth:         {}", format_growth(kpis.overall_yoy_growth));

    let top = top_manufacturers(&records, 10)?;
    if !top.is_empty() {
        println!("\n🏭 Top Manufacturers");
        for (i, (name, total)) in top.iter().enumerate() {
            println!("{:>3}. {:<20} {:>12}", i + 1, name, total);
        }
    }

    println!("\n💡 Insights");
    for line in insight_lines(&kpis) {
        println!("  • {}", line);
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    println!("🖥️  Loading Vahan Insights dashboard...\n");

    let today = Local::now().date_naive();
    let (records, source) = load_dataset(&config.data, today).context("Failed to load dataset")?;

    if records.is_empty() {
        eprintln!("❌ No data available. Please check your data source.");
        std::process::exit(1);
    }

    println!("✓ Loaded {} records from {}\n", records.len(), source);
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(records, config.growth)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin vahan-server --features server");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_growth_args_parse() {
        let cli = Cli::parse_from([
            "vahan-insights",
            "growth",
            "--by",
            "vehicle_category,manufacturer",
            "--category",
            "2W",
            "--from",
            "2023-01-01",
        ]);
        match cli.command {
            Some(Command::Growth { by, json, filter }) => {
                assert_eq!(by, vec!["vehicle_category", "manufacturer"]);
                assert!(!json);
                assert_eq!(filter.categories, vec!["2W"]);
                assert_eq!(filter.from, NaiveDate::from_ymd_opt(2023, 1, 1));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_defaults_to_ui() {
        let cli = Cli::parse_from(["vahan-insights", "-v"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 1);
    }

    #[test]
    fn test_filter_args_build_filter() {
        let args = FilterArgs {
            manufacturers: vec!["Honda".to_string()],
            ..FilterArgs::default()
        };
        let filter = args.to_filter();
        assert!(filter.is_active());
        assert!(filter.categories.is_none());
    }
}
