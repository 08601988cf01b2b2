//! Result CSV row emission.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::Cli;

/// One run's outcome, formatted exactly per the result CSV row contract
/// (including the trailing comma before the newline).
pub struct ResultRow {
    pub achieved_alloc_rate_mbps: f64,
}

impl ResultRow {
    pub fn format(&self, cli: &Cli) -> String {
        let retained_ratio =
            (cli.long_lived_target_mb + cli.mid_aged_target_mb) as f64 / cli.heap_size_mb as f64;
        format!(
            "{}, {}, {:.2}, {:.4}, {}, {}, {}, {}, {}, {},\n",
            cli.heap_size_mb,
            cli.target_alloc_rate_mbps,
            self.achieved_alloc_rate_mbps,
            retained_ratio,
            cli.use_compressed,
            cli.num_threads,
            cli.min_object_size,
            cli.max_object_size,
            cli.prune_ratio_per_minute,
            cli.reshuffle_ratio,
        )
    }

    pub fn append_to(&self, path: &Path, cli: &Cli) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(self.format(cli).as_bytes())
    }
}
