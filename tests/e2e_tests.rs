//! End-to-end integration tests
//!
//! These tests validate the complete batch transfer pipeline using predefined
//! CSV fixtures. Each test:
//! 1. Seeds the accounts from accounts.csv
//! 2. Runs every request in transfers.csv through the coordinator
//! 3. Generates the account CSV
//! 4. Compares actual output with expected.csv
//!
//! Test fixtures are located in tests/fixtures/ and cover:
//! - Happy path and multi-account scenarios
//! - Opposite-direction traffic on one pair of accounts
//! - Rejections (insufficient funds, invalid requests, unknown accounts)
//! - Malformed rows
//!
//! Fixture outcomes do not depend on transfer order, since the async strategy
//! commits concurrent transfers in no particular order. Each fixture runs
//! under both strategies.

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use simple_bank::cli::StrategyType;
    use simple_bank::strategy::{create_strategy, BatchConfig, RunInput, StoreBackend};
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use tempfile::NamedTempFile;

    /// Run a fixture and compare the account CSV with expected.csv
    ///
    /// # Panics
    ///
    /// Panics if a fixture file is missing, the run fails, or the output
    /// doesn't match expected.csv
    fn run_test_fixture(fixture_name: &str, strategy_type: StrategyType) {
        let fixture_dir = PathBuf::from("tests/fixtures").join(fixture_name);
        let accounts_path = fixture_dir.join("accounts.csv");
        let transfers_path = fixture_dir.join("transfers.csv");
        let expected_path = fixture_dir.join("expected.csv");

        for path in [&accounts_path, &transfers_path, &expected_path] {
            assert!(path.exists(), "Fixture file not found: {}", path.display());
        }

        // Small batches and few slots so batching and the semaphore both get exercised
        let config = matches!(strategy_type, StrategyType::Async).then(|| BatchConfig::new(4, 3));
        let strategy = create_strategy(strategy_type, config, StoreBackend::default());
        let input = RunInput {
            transfers: transfers_path,
            accounts: Some(accounts_path),
        };

        let mut temp_output = NamedTempFile::new().expect("Failed to create temp file");
        strategy
            .process(&input, &mut temp_output)
            .unwrap_or_else(|e| panic!("Failed to process transfers: {}", e));
        temp_output.flush().expect("Failed to flush temp file");

        let actual_output = fs::read_to_string(temp_output.path())
            .unwrap_or_else(|e| panic!("Failed to read temp output file: {}", e));
        let expected_output = fs::read_to_string(&expected_path).unwrap_or_else(|e| {
            panic!(
                "Failed to read expected file {}: {}",
                expected_path.display(),
                e
            )
        });

        assert_eq!(
            actual_output, expected_output,
            "\n\nOutput mismatch for fixture: {} (strategy: {:?})\n\nActual output:\n{}\n\nExpected output:\n{}\n",
            fixture_name, strategy_type, actual_output, expected_output
        );
    }

    /// End-to-end test for all fixtures with both strategies
    #[rstest]
    #[case("happy_path")]
    #[case("multiple_accounts")]
    #[case("opposite_directions")]
    #[case("insufficient_funds")]
    #[case("invalid_requests")]
    #[case("malformed_data")]
    fn test_fixtures(
        #[case] fixture: &str,
        #[values(StrategyType::Sync, StrategyType::Async)] strategy: StrategyType,
    ) {
        run_test_fixture(fixture, strategy);
    }

    /// Rejections are counted, not fatal
    #[rstest]
    fn test_summary_counts(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy_type: StrategyType,
    ) {
        let fixture_dir = Path::new("tests/fixtures/invalid_requests");
        let strategy = create_strategy(strategy_type, None, StoreBackend::default());
        let input = RunInput {
            transfers: fixture_dir.join("transfers.csv"),
            accounts: Some(fixture_dir.join("accounts.csv")),
        };
        let mut output = Vec::new();

        let summary = strategy.process(&input, &mut output).unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 5);
    }

    /// Without seeds no referenced account exists, so every transfer is rejected
    #[rstest]
    fn test_run_without_seed_file(
        #[values(StrategyType::Sync, StrategyType::Async)] strategy_type: StrategyType,
    ) {
        let strategy = create_strategy(strategy_type, None, StoreBackend::default());
        let input = RunInput {
            transfers: PathBuf::from("tests/fixtures/happy_path/transfers.csv"),
            accounts: None,
        };
        let mut output = Vec::new();

        let summary = strategy.process(&input, &mut output).unwrap();

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,owner,balance,currency\n"
        );
    }
}
