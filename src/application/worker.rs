use super::channel::PinChannel;
use super::dispatcher::ResultDispatcher;
use crate::config::CoordinatorConfig;
use crate::domain::outcome::{FailureReason, TransactionOutcome, WorkerState};
use crate::domain::pin::{PinRequest, PinResponse};
use crate::domain::ports::{EngineBox, EngineResult};
use crate::domain::transaction::TransactionRequest;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::watch;

/// Drives one transaction attempt through the engine, pausing for PIN entry
/// whenever the engine asks for it.
///
/// A worker is consumed by [`TransactionWorker::start`]; a new attempt needs
/// a new worker, a new engine session, and a new [`PinChannel`].
pub struct TransactionWorker {
    engine: EngineBox,
    channel: Arc<PinChannel>,
    config: CoordinatorConfig,
    state: watch::Sender<WorkerState>,
    pin_prompts: u32,
}

impl TransactionWorker {
    pub fn new(engine: EngineBox, channel: Arc<PinChannel>, config: CoordinatorConfig) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            engine,
            channel,
            config,
            state,
            pin_prompts: 0,
        }
    }

    /// Observes state transitions of this worker.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    /// Runs the attempt to a terminal state and hands the outcome to
    /// `dispatcher`.
    ///
    /// The terminal state is published and the channel closed before the
    /// outcome is delivered.
    pub async fn start(
        mut self,
        payload: Vec<u8>,
        amount: Option<String>,
        dispatcher: ResultDispatcher,
    ) {
        let outcome = self.execute(payload, amount).await;

        self.transition(outcome.state);
        self.channel.close();

        match &outcome.reason {
            None => tracing::info!(pin_prompts = outcome.pin_prompts, "Transaction completed"),
            Some(FailureReason::UserCancelled) => {
                tracing::info!(pin_prompts = outcome.pin_prompts, "Transaction cancelled by user")
            }
            Some(reason) => tracing::warn!(
                %reason,
                pin_prompts = outcome.pin_prompts,
                "Transaction failed"
            ),
        }

        dispatcher.complete(outcome);
    }

    async fn execute(&mut self, payload: Vec<u8>, amount: Option<String>) -> TransactionOutcome {
        self.transition(WorkerState::Building);
        let request = match TransactionRequest::new(payload, amount) {
            Ok(request) => request,
            Err(e) => return self.failed(e.into()),
        };

        self.transition(WorkerState::AwaitingEngine);
        let mut step = self.engine.transact(request.payload()).await;

        loop {
            let prompt_code = match step {
                Ok(EngineResult::Success(result)) => {
                    return TransactionOutcome::completed(result, self.pin_prompts);
                }
                Ok(EngineResult::Failure(code)) => {
                    return self.failed(FailureReason::EngineFailure(code));
                }
                Ok(EngineResult::NeedsPin { prompt_code }) => prompt_code,
                Err(e) => return self.failed(e.into()),
            };

            if self
                .config
                .max_pin_prompts
                .is_some_and(|max| self.pin_prompts >= max)
            {
                return self.failed(FailureReason::PinTriesExceeded);
            }

            let pin = match self.request_pin(prompt_code, request.amount()).await {
                Ok(PinResponse::Pin(pin)) => pin,
                Ok(PinResponse::Cancelled) => {
                    return TransactionOutcome::cancelled(self.pin_prompts);
                }
                Err(e) => return self.failed(e.into()),
            };

            self.transition(WorkerState::Resuming);
            self.transition(WorkerState::AwaitingEngine);
            step = self.engine.submit_pin(pin).await;
        }
    }

    async fn request_pin(&mut self, prompt_code: i32, amount: &str) -> Result<PinResponse> {
        self.transition(WorkerState::AwaitingPin);
        self.pin_prompts += 1;
        tracing::info!(prompt_code, amount, round = self.pin_prompts, "Requesting PIN entry");

        self.channel.post_request(PinRequest {
            prompt_code,
            amount: amount.to_string(),
        })?;
        self.channel.await_response(self.config.pin_timeout).await
    }

    fn failed(&self, reason: FailureReason) -> TransactionOutcome {
        TransactionOutcome::failed(reason, self.pin_prompts)
    }

    fn transition(&self, next: WorkerState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::debug!(from = %previous, to = %next, "Worker state transition");
        }
    }
}

impl Drop for TransactionWorker {
    /// Covers a worker dropped before reaching a terminal state, as when the
    /// engine panics: the surface must not keep waiting on the channel.
    fn drop(&mut self) {
        let terminal = self.state.borrow().is_terminal();
        if !terminal {
            self.transition(WorkerState::Failed);
        }
        self.channel.close();
    }
}
