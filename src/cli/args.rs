use crate::logging::LoggingConfig;
use crate::store::{MemoryStoreConfig, PgStoreConfig};
use crate::strategy::{BatchConfig, RunInput, StoreBackend};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Apply ledger transfers atomically and report the resulting balances
#[derive(Parser, Debug)]
#[command(name = "simple-bank")]
#[command(about = "Apply ledger transfers atomically and report the resulting balances", long_about = None)]
pub struct CliArgs {
    /// Transfer requests CSV (`from,to,amount`)
    #[arg(value_name = "TRANSFERS", help = "Path to the transfer requests CSV file")]
    pub transfers_file: PathBuf,

    /// Accounts to open before any transfer runs (`owner,balance,currency`)
    #[arg(
        long = "accounts",
        value_name = "ACCOUNTS",
        help = "Path to an account seed CSV file; ids are assigned in file order"
    )]
    pub accounts_file: Option<PathBuf>,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for sequential or 'async' for concurrent transfers"
    )]
    pub strategy: StrategyType,

    /// Number of transfer requests per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfer requests read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of transfers in flight (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of transfers running concurrently (default: CPU cores)"
    )]
    pub max_concurrent: Option<usize>,

    /// Ledger Store backend
    #[arg(
        long = "store",
        value_name = "STORE",
        default_value = "memory",
        help = "Ledger store: 'memory' or 'postgres'"
    )]
    pub store: StoreType,

    /// PostgreSQL connection string (postgres store only)
    #[arg(long = "database-url", value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Connection pool size (postgres store only)
    #[arg(long = "max-connections", value_name = "COUNT", default_value_t = 10)]
    pub max_connections: u32,

    /// Row lock wait limit in milliseconds (memory store only)
    #[arg(long = "lock-timeout-ms", value_name = "MS", default_value_t = 5000)]
    pub lock_timeout_ms: u64,

    /// Log filter, overridden by RUST_LOG
    #[arg(long = "log-level", value_name = "FILTER", default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long = "log-json")]
    pub log_json: bool,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

/// Available Ledger Store backends
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreType {
    Memory,
    Postgres,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Missing values use defaults; zero values fall back to defaults with a
    /// warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent.unwrap_or(default.max_concurrent),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Select and configure the Ledger Store backend
    ///
    /// # Returns
    ///
    /// * `Ok(StoreBackend)` - the configured backend
    /// * `Err(String)` - postgres was selected without a database URL
    pub fn to_store_backend(&self) -> Result<StoreBackend, String> {
        match self.store {
            StoreType::Memory => Ok(StoreBackend::Memory(MemoryStoreConfig::new(
                Duration::from_millis(self.lock_timeout_ms),
            ))),
            StoreType::Postgres => {
                let url = self.database_url.as_deref().ok_or_else(|| {
                    "--database-url (or DATABASE_URL) is required for the postgres store"
                        .to_string()
                })?;
                Ok(StoreBackend::Postgres(PgStoreConfig::new(
                    url,
                    self.max_connections,
                )))
            }
        }
    }

    pub fn to_logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            json: self.log_json,
        }
    }

    pub fn to_run_input(&self) -> RunInput {
        RunInput {
            transfers: self.transfers_file.clone(),
            accounts: self.accounts_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::default_strategy(&["program", "transfers.csv"], StrategyType::Async)]
    #[case::explicit_sync(&["program", "--strategy", "sync", "transfers.csv"], StrategyType::Sync)]
    #[case::explicit_async(&["program", "--strategy", "async", "transfers.csv"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.strategy, expected);
    }

    #[rstest]
    #[case::batch_size(&["program", "--batch-size", "2000", "transfers.csv"], Some(2000), None)]
    #[case::max_concurrent(&["program", "--max-concurrent", "8", "transfers.csv"], None, Some(8))]
    #[case::no_options(&["program", "transfers.csv"], None, None)]
    fn test_config_options(
        #[case] args: &[&str],
        #[case] batch_size: Option<usize>,
        #[case] max_concurrent: Option<usize>,
    ) {
        let parsed = CliArgs::try_parse_from(args).unwrap();
        assert_eq!(parsed.batch_size, batch_size);
        assert_eq!(parsed.max_concurrent, max_concurrent);
    }

    #[rstest]
    #[case::all_defaults(&["program", "transfers.csv"], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["program", "--batch-size", "2000", "transfers.csv"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["program", "--max-concurrent", "8", "transfers.csv"], 1000, 8)]
    #[case::zero_batch_size(&["program", "--batch-size", "0", "transfers.csv"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["program", "--max-concurrent", "0", "transfers.csv"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = CliArgs::try_parse_from(args).unwrap().to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent, expected_max_concurrent);
    }

    #[test]
    fn test_memory_store_backend() {
        let parsed =
            CliArgs::try_parse_from(["program", "--lock-timeout-ms", "250", "transfers.csv"])
                .unwrap();

        assert_eq!(
            parsed.to_store_backend().unwrap(),
            StoreBackend::Memory(MemoryStoreConfig::new(Duration::from_millis(250)))
        );
    }

    #[test]
    fn test_postgres_store_backend() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--store",
            "postgres",
            "--database-url",
            "postgres://bank@localhost/bank",
            "--max-connections",
            "4",
            "transfers.csv",
        ])
        .unwrap();

        match parsed.to_store_backend().unwrap() {
            StoreBackend::Postgres(config) => {
                assert_eq!(config.database_url, "postgres://bank@localhost/bank");
                assert_eq!(config.max_connections, 4);
            }
            other => panic!("Expected postgres backend, got {:?}", other),
        }
    }

    #[test]
    fn test_run_input_and_logging() {
        let parsed = CliArgs::try_parse_from([
            "program",
            "--accounts",
            "accounts.csv",
            "--log-level",
            "debug",
            "--log-json",
            "transfers.csv",
        ])
        .unwrap();

        let input = parsed.to_run_input();
        assert_eq!(input.transfers, PathBuf::from("transfers.csv"));
        assert_eq!(input.accounts, Some(PathBuf::from("accounts.csv")));

        let logging = parsed.to_logging_config();
        assert_eq!(logging.level, "debug");
        assert!(logging.json);
    }

    #[rstest]
    #[case::missing_input(&["program"])]
    #[case::invalid_strategy(&["program", "--strategy", "invalid", "transfers.csv"])]
    #[case::invalid_store(&["program", "--store", "sqlite", "transfers.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
