//! Synchronous CSV readers
//!
//! - `read_account_seeds` loads the (small) account seed file up front.
//! - `SyncReader` streams transfer requests one row at a time.
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()` and
//!   from `read_account_seeds`
//! - A bad seed row is fatal: transfers would otherwise run against a
//!   different set of account ids than the file describes
//! - A bad transfer row is yielded as an `Err` item so the caller can log it
//!   and carry on
//! - Line numbers are included in error messages for debugging

use crate::io::csv_format::{
    convert_account_record, convert_transfer_record, AccountCsvRecord, TransferCsvRecord,
};
use crate::types::{CreateAccountParams, TransferParams};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

fn open_csv(path: &Path) -> Result<csv::Reader<File>, String> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

/// Read every account seed from `path`, in file order
///
/// # Returns
///
/// * `Ok(Vec<CreateAccountParams>)` - validated seeds
/// * `Err(String)` - the file could not be read, or a row is malformed or invalid
pub fn read_account_seeds(path: &Path) -> Result<Vec<CreateAccountParams>, String> {
    let mut reader = open_csv(path)?;
    let mut seeds = Vec::new();

    for (index, row) in reader.deserialize::<AccountCsvRecord>().enumerate() {
        // Header is line 1
        let line = index + 2;
        let record = row.map_err(|e| format!("Line {}: CSV parse error: {}", line, e))?;
        let params = convert_account_record(record).map_err(|e| format!("Line {}: {}", line, e))?;
        seeds.push(params);
    }

    Ok(seeds)
}

/// Streaming reader over transfer requests
///
/// # Examples
///
/// ```no_run
/// use simple_bank::io::sync_reader::SyncReader;
/// use std::path::Path;
///
/// let reader = SyncReader::new(Path::new("transfers.csv")).unwrap();
/// let transfers: Vec<_> = reader.filter_map(Result::ok).collect();
/// println!("Read {} transfer requests", transfers.len());
/// ```
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open a transfers CSV (`from,to,amount`)
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` if file opened successfully
    /// * `Err(String)` if file could not be opened
    pub fn new(path: &Path) -> Result<Self, String> {
        Ok(Self {
            reader: open_csv(path)?,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<TransferParams, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<TransferCsvRecord>();
        let row = deserializer.next()?;
        self.line_num += 1;

        Some(
            row.map(convert_transfer_record)
                .map_err(|e| format!("Line {}: CSV parse error: {}", self.line_num, e)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_read_account_seeds() {
        let file = create_temp_csv("owner,balance,currency\nalice, 1000 ,USD\nbob,500,EUR\n");

        let seeds = read_account_seeds(file.path()).unwrap();

        assert_eq!(
            seeds,
            vec![
                CreateAccountParams::new("alice", 1000, "USD"),
                CreateAccountParams::new("bob", 500, "EUR"),
            ]
        );
    }

    #[test]
    fn test_read_account_seeds_reports_bad_line() {
        let file = create_temp_csv("owner,balance,currency\nalice,1000,USD\nbob,-5,USD\n");

        let error = read_account_seeds(file.path()).unwrap_err();

        assert!(error.starts_with("Line 3:"), "unexpected error: {}", error);
    }

    #[test]
    fn test_read_account_seeds_missing_file() {
        let result = read_account_seeds(Path::new("/nonexistent/accounts.csv"));
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_reader_new_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("/nonexistent/transfers.csv"));
        assert!(result.is_err());
    }

    #[test]
    fn test_sync_reader_iterates_transfers() {
        let file = create_temp_csv("from,to,amount\n1,2,200\n2, 1 ,50\n");

        let transfers: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            transfers,
            vec![TransferParams::new(1, 2, 200), TransferParams::new(2, 1, 50)]
        );
    }

    #[test]
    fn test_sync_reader_includes_line_numbers_in_errors() {
        let file = create_temp_csv("from,to,amount\n1,2,200\n1,2,lots\n2,1,5\n");

        let results: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        let error = results[1].as_ref().unwrap_err();
        assert!(error.starts_with("Line 3:"), "unexpected error: {}", error);
        assert_eq!(results[2], Ok(TransferParams::new(2, 1, 5)));
    }
}
