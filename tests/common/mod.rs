#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pinpad::application::coordinator::Coordinator;
use pinpad::config::CoordinatorConfig;
use pinpad::domain::pin::Pin;
use pinpad::domain::ports::{EngineBox, EngineProvider, EngineResult, TransactionEngine};
use pinpad::error::{PinpadError, Result};
use pinpad::infrastructure::rng::OsRandomSource;
use std::collections::VecDeque;
use std::sync::Arc;

/// A call the worker made into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Transact(Vec<u8>),
    SubmitPin(String),
}

/// Engine double that replays scripted results and records every call.
#[derive(Clone, Default)]
pub struct RecordingEngine {
    script: Arc<Mutex<VecDeque<EngineResult>>>,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl RecordingEngine {
    pub fn new(script: Vec<EngineResult>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    fn step(&self, call: EngineCall) -> Result<EngineResult> {
        self.calls.lock().push(call);
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| PinpadError::Engine("unexpected engine call".to_string()))
    }
}

#[async_trait]
impl EngineProvider for RecordingEngine {
    fn session(&self) -> Result<EngineBox> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl TransactionEngine for RecordingEngine {
    async fn transact(&mut self, payload: &[u8]) -> Result<EngineResult> {
        self.step(EngineCall::Transact(payload.to_vec()))
    }

    async fn submit_pin(&mut self, pin: Pin) -> Result<EngineResult> {
        self.step(EngineCall::SubmitPin(pin.expose().to_string()))
    }
}

pub async fn coordinator(engine: &RecordingEngine) -> Coordinator {
    Coordinator::init(
        Arc::new(engine.clone()),
        Arc::new(OsRandomSource::new()),
        CoordinatorConfig::default(),
    )
    .await
    .unwrap()
}

pub fn sample_payload() -> Vec<u8> {
    hex::decode("9F0206000000000100").unwrap()
}
