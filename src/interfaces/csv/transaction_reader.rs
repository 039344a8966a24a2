use crate::domain::transaction::{TransactionRecord, TransactionRequest};
use crate::error::{PinpadError, Result};
use std::io::Read;

/// Reads transaction requests from a CSV source with a `payload,amount`
/// header.
///
/// Payloads are hex strings; `amount` may be left blank to take it from the
/// payload.
pub struct TransactionReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> TransactionReader<R> {
    /// Creates a new `TransactionReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and validates one request per row.
    pub fn transactions(self) -> impl Iterator<Item = Result<TransactionRequest>> {
        self.reader.into_deserialize().map(|result| {
            let record: TransactionRecord = result.map_err(PinpadError::from)?;
            TransactionRequest::try_from(record)
        })
    }
}
