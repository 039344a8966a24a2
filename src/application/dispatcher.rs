use crate::domain::outcome::{FailureReason, TransactionOutcome};
use tokio::sync::oneshot;

/// Delivers the outcome of one attempt back to the caller.
///
/// `complete` consumes the dispatcher, so an outcome can be delivered at
/// most once.
pub struct ResultDispatcher {
    sender: oneshot::Sender<TransactionOutcome>,
}

/// The caller's end of a [`ResultDispatcher`].
pub struct OutcomeReceiver {
    receiver: oneshot::Receiver<TransactionOutcome>,
}

impl ResultDispatcher {
    pub fn new() -> (Self, OutcomeReceiver) {
        let (sender, receiver) = oneshot::channel();
        (Self { sender }, OutcomeReceiver { receiver })
    }

    pub fn complete(self, outcome: TransactionOutcome) {
        if let Err(outcome) = self.sender.send(outcome) {
            tracing::warn!(
                state = %outcome.state,
                "Caller stopped listening before the outcome was delivered"
            );
        }
    }
}

impl OutcomeReceiver {
    /// Waits for the outcome.
    ///
    /// If the worker went away without completing, this still yields exactly
    /// one outcome, tagged [`FailureReason::WorkerLost`].
    pub async fn wait(self) -> TransactionOutcome {
        match self.receiver.await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!("Transaction worker dropped without delivering an outcome");
                TransactionOutcome::failed(FailureReason::WorkerLost, 0)
            }
        }
    }

    /// Returns the outcome if it has already been delivered.
    pub fn try_take(&mut self) -> Option<TransactionOutcome> {
        self.receiver.try_recv().ok()
    }
}
