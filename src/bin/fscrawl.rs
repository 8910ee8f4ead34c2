use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use fscrawl::{Connector, CrawlerConfig, IntervalSchedule, JsonLinesAcceptor};

/// Crawl filesystems and emit feed documents as JSON lines on stdout.
#[derive(Debug, Parser)]
#[command(name = "fscrawl", version, about)]
struct Args {
    /// Path to the crawler configuration file.
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Run a single traversal cycle and exit.
    #[arg(long)]
    once: bool,

    /// Print the configured start paths and exit.
    #[arg(long)]
    list_roots: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fscrawl failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = CrawlerConfig::load(&args.config)?;
    let schedule = Arc::new(IntervalSchedule::new(&config.schedule));
    let connector = Connector::from_config(config)?;

    if args.list_roots {
        for root in connector.start_paths() {
            println!("{root}");
        }
        return Ok(ExitCode::SUCCESS);
    }

    let acceptor = Arc::new(JsonLinesAcceptor::stdout());
    let (mut lister, _handle) = connector.lister(acceptor, schedule);

    if args.once {
        let got_error = lister.run_once();
        Ok(if got_error {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        })
    } else {
        // Runs until the process is terminated; the handle stays alive so
        // the lister is never spuriously disconnected.
        lister.run();
        Ok(ExitCode::SUCCESS)
    }
}
