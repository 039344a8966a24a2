use crate::domain::outcome::TransactionOutcome;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OutcomeRecord<'a> {
    payload: String,
    success: bool,
    state: &'a str,
    reason: String,
    result: String,
    pin_prompts: u32,
}

/// Writes one CSV row per transaction outcome.
pub struct OutcomeWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> OutcomeWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// `payload` is the request that produced `outcome`; it is written as hex.
    pub fn write_outcome(&mut self, payload: &[u8], outcome: &TransactionOutcome) -> Result<()> {
        self.writer.serialize(OutcomeRecord {
            payload: hex::encode_upper(payload),
            success: outcome.success,
            state: outcome.state.as_str(),
            reason: outcome
                .reason
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            result: outcome
                .payload
                .as_deref()
                .map(hex::encode_upper)
                .unwrap_or_default(),
            pin_prompts: outcome.pin_prompts,
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
