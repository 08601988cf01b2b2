mod config;
mod coordinator;
mod result_row;
mod sampler;

use clap::Parser;
use config::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            err.print().ok();
            std::process::exit(1);
        }
    };

    if let Err(err) = coordinator::run(cli) {
        tracing::error!(%err, "membench run failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
