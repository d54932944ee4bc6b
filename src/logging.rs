//! Logging setup.
//!
//! Diagnostics go through `tracing`; `RUST_LOG` overrides the verbosity flag.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and errors; keeps CLI tables readable.
    #[default]
    Normal,
    /// Info and above.
    Verbose,
    /// Debug and above (row counts from every pipeline stage).
    Debug,
}

impl Verbosity {
    /// Map `-q` / `-v` counts from the CLI to a verbosity.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    #[must_use]
    pub fn to_level(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Debug => Level::DEBUG,
        }
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(verbosity: Verbosity) {
    let default_filter = format!(
        "vahan_insights={level},vahan_server={level}",
        level = verbosity.to_level()
    );

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr),
    );

    let _ = subscriber.try_init();
}
