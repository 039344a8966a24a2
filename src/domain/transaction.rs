use crate::error::{PinpadError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;

/// EMV tag 9F02, Amount Authorised (n12, two implied decimals).
pub const TAG_AMOUNT_AUTHORISED: u16 = 0x9F02;

/// The message handed to the engine for one attempt, plus the amount shown
/// to the operator when a PIN is needed.
///
/// Immutable once built; the worker owns it for the lifetime of the attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRequest {
    payload: Vec<u8>,
    amount: String,
}

impl TransactionRequest {
    /// Builds a request from a raw payload.
    ///
    /// When `amount` is `None` the prompt amount is read from the
    /// Amount Authorised tag if the payload carries one.
    pub fn new(payload: Vec<u8>, amount: Option<String>) -> Result<Self> {
        if payload.is_empty() {
            return Err(PinpadError::InvalidRequest(
                "Transaction payload is empty".to_string(),
            ));
        }

        let amount = match amount {
            Some(amount) => amount,
            None => amount_from_payload(&payload).unwrap_or_default(),
        };

        Ok(Self { payload, amount })
    }

    /// Builds a request from a hex-encoded payload such as `9F0206000000000100`.
    pub fn from_hex(payload: &str, amount: Option<String>) -> Result<Self> {
        let bytes = hex::decode(payload.trim())
            .map_err(|e| PinpadError::InvalidRequest(format!("Invalid hex payload: {e}")))?;
        Self::new(bytes, amount)
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}

/// A row of a transaction batch file.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TransactionRecord {
    pub payload: String,
    #[serde(default)]
    pub amount: Option<String>,
}

impl TryFrom<TransactionRecord> for TransactionRequest {
    type Error = PinpadError;

    fn try_from(record: TransactionRecord) -> Result<Self> {
        let amount = record.amount.filter(|a| !a.is_empty());
        Self::from_hex(&record.payload, amount)
    }
}

/// Reads the authorised amount out of a BER-TLV payload.
///
/// Returns `None` when the payload is not well-formed TLV or carries no
/// valid amount; the rest of the payload is never interpreted.
pub fn amount_from_payload(payload: &[u8]) -> Option<String> {
    authorised_amount(payload).map(|amount| amount.to_string())
}

/// Decodes the Amount Authorised tag as a decimal with two places.
pub fn authorised_amount(payload: &[u8]) -> Option<Decimal> {
    find_tag(payload, TAG_AMOUNT_AUTHORISED).and_then(decode_bcd_amount)
}

fn find_tag(mut data: &[u8], wanted: u16) -> Option<&[u8]> {
    while !data.is_empty() {
        let (tag, rest) = read_tag(data)?;
        let (len, rest) = read_length(rest)?;
        if rest.len() < len {
            return None;
        }
        let (value, rest) = rest.split_at(len);
        if tag == wanted as u32 {
            return Some(value);
        }
        data = rest;
    }
    None
}

fn read_tag(data: &[u8]) -> Option<(u32, &[u8])> {
    let (&first, mut rest) = data.split_first()?;
    let mut tag = first as u32;
    if first & 0x1F == 0x1F {
        loop {
            let (&next, tail) = rest.split_first()?;
            tag = (tag << 8) | next as u32;
            rest = tail;
            if next & 0x80 == 0 {
                break;
            }
            // Tags longer than four bytes are not valid BER.
            if tag > 0x00FF_FFFF {
                return None;
            }
        }
    }
    Some((tag, rest))
}

fn read_length(data: &[u8]) -> Option<(usize, &[u8])> {
    let (&first, rest) = data.split_first()?;
    match first {
        0x00..=0x7F => Some((first as usize, rest)),
        0x81 => {
            let (&len, rest) = rest.split_first()?;
            Some((len as usize, rest))
        }
        0x82 => {
            if rest.len() < 2 {
                return None;
            }
            let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
            Some((len, &rest[2..]))
        }
        _ => None,
    }
}

fn decode_bcd_amount(value: &[u8]) -> Option<Decimal> {
    if value.len() != 6 {
        return None;
    }
    let mut minor_units: i64 = 0;
    for byte in value {
        for nibble in [byte >> 4, byte & 0x0F] {
            if nibble > 9 {
                return None;
            }
            minor_units = minor_units * 10 + nibble as i64;
        }
    }
    Some(Decimal::new(minor_units, 2))
}
