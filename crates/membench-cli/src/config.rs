//! CLI flag parsing and the validated run configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use membench_core::ObjectVariant;
use thiserror::Error;

/// Only run type implemented so far; any other `-u` value is a configuration error.
const SIMPLE_RUN_TYPE: &str = "simple";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("-t must request at least one worker thread")]
    ZeroThreads,
    #[error("-z smoothness factor {0} is outside [0, 1]")]
    SmoothnessOutOfRange(f64),
    #[error("-u run type '{0}' is not recognized")]
    UnknownRunType(String),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ObjectVariantArg {
    #[value(name = "p")]
    Plain,
    #[value(name = "w")]
    Weak,
    #[value(name = "f")]
    Finalizable,
}

impl From<ObjectVariantArg> for ObjectVariant {
    fn from(arg: ObjectVariantArg) -> Self {
        match arg {
            ObjectVariantArg::Plain => ObjectVariant::Plain,
            ObjectVariantArg::Weak => ObjectVariant::Weak,
            ObjectVariantArg::Finalizable => ObjectVariant::Finalizable,
        }
    }
}

/// `membench`'s command-line surface. Kept to the spec's exact short-letter
/// flags; `-h` is claimed by heap size, so clap's auto-generated help falls
/// back to `--help` only.
#[derive(Debug, Parser)]
#[command(name = "membench", disable_help_flag = true)]
pub struct Cli {
    /// Print help (`-h` is claimed by heap size, so only the long form works).
    #[arg(long, action = clap::ArgAction::HelpLong)]
    help: Option<bool>,

    /// Target allocation rate, MB/s, divided equally across worker threads.
    #[arg(short = 'a', default_value_t = 1024)]
    pub target_alloc_rate_mbps: u64,

    /// Configured heap size in MB. Recorded in the result row only.
    #[arg(short = 'h', default_value_t = 1024)]
    pub heap_size_mb: u64,

    /// Long-lived store target size, MB.
    #[arg(short = 's', default_value_t = 64)]
    pub long_lived_target_mb: u64,

    /// Mid-aged (survivor ring) target size, MB.
    #[arg(short = 'm', default_value_t = 64)]
    pub mid_aged_target_mb: u64,

    /// Run duration, seconds.
    #[arg(short = 'd', default_value_t = 60.0)]
    pub duration_secs: f64,

    /// Number of worker threads.
    #[arg(short = 't', default_value_t = 4)]
    pub num_threads: usize,

    /// Minimum object size, bytes (inclusive).
    #[arg(short = 'n', default_value_t = 128)]
    pub min_object_size: usize,

    /// Maximum object size, bytes (exclusive).
    #[arg(short = 'x', default_value_t = 1024)]
    pub max_object_size: usize,

    /// Prune ratio per minute (store capacity fraction drained per minute).
    #[arg(short = 'r', default_value_t = 50)]
    pub prune_ratio_per_minute: u64,

    /// Reshuffle ratio.
    #[arg(short = 'f', default_value_t = 100)]
    pub reshuffle_ratio: u64,

    /// Assume compressed references.
    #[arg(short = 'c', default_value_t = true)]
    pub use_compressed: bool,

    /// Smoothness factor in [0, 1]. Presence selects the bursty worker
    /// variant over the strict (default) one.
    #[arg(short = 'z')]
    pub smoothness_factor: Option<f64>,

    /// Ramp-up seconds (strict worker only).
    #[arg(short = 'p', default_value_t = 0.0)]
    pub ramp_up_secs: f64,

    /// Result CSV output path.
    #[arg(short = 'l', default_value = "output.csv")]
    pub result_csv_path: PathBuf,

    /// Per-100ms allocation-rate log path.
    #[arg(short = 'b')]
    pub rate_log_path: Option<PathBuf>,

    /// Object variant: plain / weak / finalizable.
    #[arg(short = 'o', default_value = "p")]
    pub object_variant: ObjectVariantArg,

    /// Run type selector.
    #[arg(short = 'u', default_value = SIMPLE_RUN_TYPE)]
    pub run_type: String,
}

impl Cli {
    /// Validate the parsed flags, surfacing configuration errors rather
    /// than panicking. Size/overhead mismatches are deliberately not
    /// checked here: those are programmer errors the object factory
    /// itself asserts on, per the spec's error-handling design.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if let Some(z) = self.smoothness_factor {
            if !(0.0..=1.0).contains(&z) {
                return Err(ConfigError::SmoothnessOutOfRange(z));
            }
        }
        if self.run_type != SIMPLE_RUN_TYPE {
            return Err(ConfigError::UnknownRunType(self.run_type.clone()));
        }
        Ok(())
    }
}
