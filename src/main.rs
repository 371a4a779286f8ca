//! Simple Bank CLI
//!
//! Applies transfer requests from a CSV file to a ledger and prints the
//! resulting account states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy sync --accounts accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 --accounts accounts.csv transfers.csv
//! DATABASE_URL=postgres://localhost/bank cargo run -- --store postgres transfers.csv
//! ```
//!
//! # Processing Strategies
//!
//! - **sync**: transfers applied one at a time in file order
//! - **async**: transfers run concurrently on a multi-threaded runtime (default)
//!
//! # Exit Codes
//!
//! - 0: Success (rejected transfers are logged, not fatal)
//! - 1: Error (missing arguments, file not found, invalid seed, store unreachable, etc.)

use simple_bank::cli;
use simple_bank::logging::init_logging;
use simple_bank::strategy;
use std::process;

fn main() {
    let args = cli::parse_args();

    init_logging(&args.to_logging_config());

    let backend = match args.to_store_backend() {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, backend)
    };

    // Account states go to stdout, logs to stderr
    let mut output = std::io::stdout();
    match strategy.process(&args.to_run_input(), &mut output) {
        Ok(summary) => tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Run complete"
        ),
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
