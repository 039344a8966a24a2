use super::channel::PinChannel;
use super::dispatcher::{OutcomeReceiver, ResultDispatcher};
use super::surface::drive_surface;
use super::worker::TransactionWorker;
use crate::config::CoordinatorConfig;
use crate::domain::outcome::{TransactionOutcome, WorkerState};
use crate::domain::ports::{EngineProviderRef, InteractionSurfaceRef, RandomSourceRef};
use crate::error::{PinpadError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::Instrument;

/// Process-wide entry point.
///
/// Creating a `Coordinator` initializes the random source and the engine
/// library; every transaction worker is started through it. Each attempt
/// gets its own engine session, [`PinChannel`], and worker task.
pub struct Coordinator {
    engine: EngineProviderRef,
    rng: RandomSourceRef,
    config: CoordinatorConfig,
    next_attempt: AtomicU64,
    shut_down: AtomicBool,
}

/// The caller's view of a running attempt.
pub struct TransactionHandle {
    id: u64,
    channel: Arc<PinChannel>,
    states: watch::Receiver<WorkerState>,
    outcome: OutcomeReceiver,
}

impl Coordinator {
    /// Initializes the engine and random source. Call once, before any
    /// transaction is started.
    pub async fn init(
        engine: EngineProviderRef,
        rng: RandomSourceRef,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        rng.init()?;
        engine.init().await?;
        tracing::info!(
            pin_timeout = ?config.pin_timeout,
            max_pin_prompts = ?config.max_pin_prompts,
            "Coordinator initialized"
        );

        Ok(Self {
            engine,
            rng,
            config,
            next_attempt: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
        })
    }

    /// Draws `n` bytes from the initialized random source.
    pub fn random_bytes(&self, n: usize) -> Result<Vec<u8>> {
        self.rng.random_bytes(n)
    }

    /// Starts a transaction attempt on its own task.
    ///
    /// The returned handle exposes the attempt's [`PinChannel`] for the
    /// interaction surface and yields exactly one outcome.
    pub fn start(&self, payload: Vec<u8>, amount: Option<String>) -> Result<TransactionHandle> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(PinpadError::NotInitialized);
        }

        let id = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        let session = self.engine.session()?;
        let channel = Arc::new(PinChannel::new());
        let worker = TransactionWorker::new(session, channel.clone(), self.config.clone());
        let states = worker.subscribe();
        let (dispatcher, outcome) = ResultDispatcher::new();

        let span = tracing::info_span!("transaction", attempt = id);
        tokio::spawn(worker.start(payload, amount, dispatcher).instrument(span));

        Ok(TransactionHandle {
            id,
            channel,
            states,
            outcome,
        })
    }

    /// Runs one attempt with `surface` answering its PIN prompts.
    ///
    /// Always yields an outcome; a failure to start is reported as a failed
    /// outcome.
    pub async fn run(
        &self,
        payload: Vec<u8>,
        amount: Option<String>,
        surface: InteractionSurfaceRef,
    ) -> TransactionOutcome {
        let handle = match self.start(payload, amount) {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Failed to start transaction: {}", e);
                return TransactionOutcome::failed(e.into(), 0);
            }
        };

        let driver = tokio::spawn(drive_surface(handle.channel(), surface));
        let outcome = handle.outcome().await;
        // The surface may still be blocked on input for a withdrawn prompt.
        driver.abort();
        outcome
    }

    /// Releases the engine library. No transaction can be started afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::info!("Coordinator shutting down");
        self.engine.shutdown().await
    }
}

impl TransactionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The channel the interaction surface serves for this attempt.
    pub fn channel(&self) -> Arc<PinChannel> {
        self.channel.clone()
    }

    pub fn state(&self) -> WorkerState {
        *self.states.borrow()
    }

    /// Waits for the attempt's outcome. The channel is closed afterwards,
    /// also when the worker was lost.
    pub async fn outcome(self) -> TransactionOutcome {
        let outcome = self.outcome.wait().await;
        self.channel.close();
        outcome
    }
}
