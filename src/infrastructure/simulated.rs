use crate::domain::pin::Pin;
use crate::domain::ports::{
    EngineBox, EngineProvider, EngineResult, RandomSourceRef, TransactionEngine,
};
use crate::domain::transaction::authorised_amount;
use crate::error::{PinpadError, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};

/// The payload carries no readable Amount Authorised.
pub const FAILURE_MALFORMED_REQUEST: i32 = 1;
/// Every PIN try was used up.
pub const FAILURE_PIN_BLOCKED: i32 = 2;

/// Authorisation Response Code "00" (approved).
const ARC_APPROVED: [u8; 2] = *b"00";
const CRYPTOGRAM_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct SimulatedEngineConfig {
    pub expected_pin: String,
    /// Amounts above this need a PIN.
    pub floor_limit: Decimal,
    /// Wrong PINs tolerated before the transaction is declined.
    pub pin_try_limit: i32,
}

impl Default for SimulatedEngineConfig {
    fn default() -> Self {
        Self {
            expected_pin: "1234".to_string(),
            floor_limit: Decimal::ZERO,
            pin_try_limit: 3,
        }
    }
}

/// A software stand-in for the native transaction library.
///
/// Decides on the Amount Authorised alone: at or below the floor limit it
/// approves outright, above it asks for a PIN and counts down the PIN try
/// counter, which it reports as the prompt code. An approval carries a TLV
/// result with a random application cryptogram.
pub struct SimulatedEngine {
    config: SimulatedEngineConfig,
    rng: RandomSourceRef,
    loaded: AtomicBool,
}

impl SimulatedEngine {
    pub fn new(config: SimulatedEngineConfig, rng: RandomSourceRef) -> Self {
        Self {
            config,
            rng,
            loaded: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EngineProvider for SimulatedEngine {
    async fn init(&self) -> Result<()> {
        if self.loaded.swap(true, Ordering::AcqRel) {
            tracing::debug!("Simulated engine already loaded");
        }
        Ok(())
    }

    fn session(&self) -> Result<EngineBox> {
        if !self.loaded.load(Ordering::Acquire) {
            return Err(PinpadError::NotInitialized);
        }
        Ok(Box::new(SimulatedSession {
            config: self.config.clone(),
            rng: self.rng.clone(),
            tries_left: self.config.pin_try_limit,
            paused: false,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.loaded.store(false, Ordering::Release);
        Ok(())
    }
}

struct SimulatedSession {
    config: SimulatedEngineConfig,
    rng: RandomSourceRef,
    tries_left: i32,
    /// Waiting for `submit_pin`.
    paused: bool,
}

impl SimulatedSession {
    fn approve(&mut self) -> Result<EngineResult> {
        self.paused = false;
        let cryptogram = self.rng.random_bytes(CRYPTOGRAM_LEN)?;

        let mut result = Vec::with_capacity(6 + 3 + CRYPTOGRAM_LEN);
        // 8A: Authorisation Response Code
        result.extend_from_slice(&[0x8A, 0x02]);
        result.extend_from_slice(&ARC_APPROVED);
        // 9F26: Application Cryptogram
        result.extend_from_slice(&[0x9F, 0x26, CRYPTOGRAM_LEN as u8]);
        result.extend_from_slice(&cryptogram);
        Ok(EngineResult::Success(result))
    }
}

#[async_trait]
impl TransactionEngine for SimulatedSession {
    async fn transact(&mut self, payload: &[u8]) -> Result<EngineResult> {
        if self.paused {
            return Err(PinpadError::Engine(
                "transaction already in progress".to_string(),
            ));
        }

        let Some(amount) = authorised_amount(payload) else {
            return Ok(EngineResult::Failure(FAILURE_MALFORMED_REQUEST));
        };

        if amount <= self.config.floor_limit {
            return self.approve();
        }

        self.paused = true;
        Ok(EngineResult::NeedsPin {
            prompt_code: self.tries_left,
        })
    }

    async fn submit_pin(&mut self, pin: Pin) -> Result<EngineResult> {
        if !self.paused {
            return Err(PinpadError::Engine(
                "no transaction is waiting for a PIN".to_string(),
            ));
        }

        if pin.expose() == self.config.expected_pin {
            return self.approve();
        }

        self.tries_left -= 1;
        if self.tries_left <= 0 {
            self.paused = false;
            return Ok(EngineResult::Failure(FAILURE_PIN_BLOCKED));
        }
        Ok(EngineResult::NeedsPin {
            prompt_code: self.tries_left,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rng::OsRandomSource;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn engine(config: SimulatedEngineConfig) -> SimulatedEngine {
        let engine = SimulatedEngine::new(config, Arc::new(OsRandomSource::new()));
        engine.init().await.unwrap();
        engine
    }

    fn payload() -> Vec<u8> {
        hex::decode("9F0206000000000100").unwrap()
    }

    #[tokio::test]
    async fn test_session_requires_init() {
        let engine = SimulatedEngine::new(
            SimulatedEngineConfig::default(),
            Arc::new(OsRandomSource::new()),
        );
        assert!(matches!(engine.session(), Err(PinpadError::NotInitialized)));

        engine.init().await.unwrap();
        assert!(engine.session().is_ok());

        engine.shutdown().await.unwrap();
        assert!(matches!(engine.session(), Err(PinpadError::NotInitialized)));
    }

    #[tokio::test]
    async fn test_below_floor_limit_approves_without_pin() {
        let engine = engine(SimulatedEngineConfig {
            floor_limit: dec!(5.00),
            ..SimulatedEngineConfig::default()
        })
        .await;
        let mut session = engine.session().unwrap();

        match session.transact(&payload()).await.unwrap() {
            EngineResult::Success(result) => {
                assert_eq!(&result[..4], &[0x8A, 0x02, b'0', b'0']);
                assert_eq!(&result[4..7], &[0x9F, 0x26, 0x08]);
                assert_eq!(result.len(), 15);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pin_try_counter_counts_down() {
        let engine = engine(SimulatedEngineConfig::default()).await;
        let mut session = engine.session().unwrap();

        assert_eq!(
            session.transact(&payload()).await.unwrap(),
            EngineResult::NeedsPin { prompt_code: 3 }
        );
        assert_eq!(
            session.submit_pin(Pin::new("0000")).await.unwrap(),
            EngineResult::NeedsPin { prompt_code: 2 }
        );
        assert_eq!(
            session.submit_pin(Pin::new("1111")).await.unwrap(),
            EngineResult::NeedsPin { prompt_code: 1 }
        );
        assert_eq!(
            session.submit_pin(Pin::new("2222")).await.unwrap(),
            EngineResult::Failure(FAILURE_PIN_BLOCKED)
        );
    }

    #[tokio::test]
    async fn test_correct_pin_approves() {
        let engine = engine(SimulatedEngineConfig::default()).await;
        let mut session = engine.session().unwrap();

        session.transact(&payload()).await.unwrap();
        let result = session.submit_pin(Pin::new("1234")).await.unwrap();
        assert!(matches!(result, EngineResult::Success(_)));
    }

    #[tokio::test]
    async fn test_payload_without_amount_is_declined() {
        let engine = engine(SimulatedEngineConfig::default()).await;
        let mut session = engine.session().unwrap();

        assert_eq!(
            session.transact(&[0xDE, 0xAD]).await.unwrap(),
            EngineResult::Failure(FAILURE_MALFORMED_REQUEST)
        );
    }

    #[tokio::test]
    async fn test_pin_without_pause_is_engine_error() {
        let engine = engine(SimulatedEngineConfig::default()).await;
        let mut session = engine.session().unwrap();

        let result = session.submit_pin(Pin::new("1234")).await;
        assert!(matches!(result, Err(PinpadError::Engine(_))));
    }
}
