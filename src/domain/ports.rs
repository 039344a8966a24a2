use super::pin::{Pin, PinRequest, PinResponse};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// What the engine reports after each step of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineResult {
    Success(Vec<u8>),
    /// The engine is paused until a PIN is submitted.
    NeedsPin { prompt_code: i32 },
    Failure(i32),
}

/// One transaction session with the cryptographic engine.
///
/// A session serves exactly one attempt. Implementations wrapping a blocking
/// native routine should move the call onto `tokio::task::spawn_blocking`.
#[async_trait]
pub trait TransactionEngine: Send {
    async fn transact(&mut self, payload: &[u8]) -> Result<EngineResult>;
    /// Continues a transaction paused on [`EngineResult::NeedsPin`].
    async fn submit_pin(&mut self, pin: Pin) -> Result<EngineResult>;
}

pub type EngineBox = Box<dyn TransactionEngine>;

/// Process-wide handle on the engine library.
#[async_trait]
pub trait EngineProvider: Send + Sync {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    fn session(&self) -> Result<EngineBox>;

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

pub type EngineProviderRef = Arc<dyn EngineProvider>;

/// The human-facing side of the PIN exchange.
#[async_trait]
pub trait InteractionSurface: Send + Sync {
    async fn collect_pin(&self, request: &PinRequest) -> Result<PinResponse>;
}

pub type InteractionSurfaceRef = Arc<dyn InteractionSurface>;

pub trait RandomSource: Send + Sync {
    fn init(&self) -> Result<()>;
    fn random_bytes(&self, n: usize) -> Result<Vec<u8>>;
}

pub type RandomSourceRef = Arc<dyn RandomSource>;
