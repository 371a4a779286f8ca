//! Asynchronous CSV reader with batch interface
//!
//! Reads transfer requests in batches for the concurrent strategy.
//!
//! # Design
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of TransferParams
//!                  ↓
//!           csv_format module
//!           (TransferCsvRecord, convert_transfer_record)
//! ```

use crate::io::csv_format::{convert_transfer_record, TransferCsvRecord};
use crate::types::TransferParams;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader over transfer requests
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read up to `batch_size` transfer requests
    ///
    /// Malformed rows are logged and skipped. Returns an empty vector at end
    /// of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<TransferParams> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<TransferCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => batch.push(convert_transfer_record(record)),
                Some(Err(e)) => tracing::warn!(error = %e, "Skipping malformed transfer row"),
                None => break,
            }
        }

        batch
    }
}
