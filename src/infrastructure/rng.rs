use crate::domain::ports::RandomSource;
use crate::error::{PinpadError, Result};
use rand::RngCore;
use rand::rngs::OsRng;

/// Random bytes from the operating system.
#[derive(Default, Clone)]
pub struct OsRandomSource;

impl OsRandomSource {
    pub fn new() -> Self {
        Self
    }
}

impl RandomSource for OsRandomSource {
    /// Checks that the OS generator is usable before any transaction runs.
    fn init(&self) -> Result<()> {
        let mut probe = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut probe)
            .map_err(|e| PinpadError::Random(e.to_string()))
    }

    fn random_bytes(&self, n: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; n];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| PinpadError::Random(e.to_string()))?;
        Ok(bytes)
    }
}
