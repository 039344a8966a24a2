use crate::domain::pin::{PinRequest, PinResponse};
use crate::error::{PinpadError, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct Slot {
    /// Posted by the worker, not yet picked up by the surface.
    request: Option<PinRequest>,
    /// A request was posted and has not been answered.
    outstanding: bool,
    /// Posted by the surface, not yet consumed by the worker.
    response: Option<PinResponse>,
    aborted: Option<String>,
    closed: bool,
}

/// Single-slot rendezvous between a transaction worker and an interaction
/// surface.
///
/// At most one request and one response are in flight. The slot is guarded
/// by a mutex that is never held across an `.await`; wake-ups go through
/// `Notify` permits so a notification sent before the other side starts
/// waiting is not lost.
///
/// One channel serves one attempt. Do not share it across attempts.
#[derive(Default)]
pub struct PinChannel {
    slot: Mutex<Slot>,
    request_ready: Notify,
    response_ready: Notify,
}

impl PinChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Worker side: publishes a PIN request for the surface.
    pub fn post_request(&self, request: PinRequest) -> Result<()> {
        {
            let mut slot = self.slot.lock();
            if let Some(reason) = &slot.aborted {
                return Err(PinpadError::InteractionFailed(reason.clone()));
            }
            if slot.closed {
                return Err(PinpadError::ProtocolViolation(
                    "PIN channel is closed".to_string(),
                ));
            }
            if slot.outstanding {
                return Err(PinpadError::ProtocolViolation(
                    "a PIN request is already outstanding".to_string(),
                ));
            }
            if slot.response.is_some() {
                return Err(PinpadError::ProtocolViolation(
                    "previous PIN response has not been consumed".to_string(),
                ));
            }
            slot.request = Some(request);
            slot.outstanding = true;
        }
        self.request_ready.notify_one();
        Ok(())
    }

    /// Worker side: waits for the surface's answer to the outstanding request.
    ///
    /// Returns at once if a response is already queued. With a `timeout`,
    /// an unanswered request is withdrawn when the bound expires and the
    /// call fails with [`PinpadError::InteractionTimeout`].
    pub async fn await_response(&self, timeout: Option<Duration>) -> Result<PinResponse> {
        let Some(limit) = timeout else {
            return self.wait_for_response().await;
        };

        match tokio::time::timeout(limit, self.wait_for_response()).await {
            Ok(result) => result,
            Err(_) => {
                let mut slot = self.slot.lock();
                // The response may have landed right at the deadline.
                if let Some(response) = slot.response.take() {
                    return Ok(response);
                }
                slot.outstanding = false;
                slot.request = None;
                Err(PinpadError::InteractionTimeout)
            }
        }
    }

    async fn wait_for_response(&self) -> Result<PinResponse> {
        loop {
            {
                let mut slot = self.slot.lock();
                if let Some(response) = slot.response.take() {
                    return Ok(response);
                }
                if let Some(reason) = &slot.aborted {
                    return Err(PinpadError::InteractionFailed(reason.clone()));
                }
                if slot.closed {
                    return Err(PinpadError::InteractionFailed(
                        "PIN channel closed before a response was posted".to_string(),
                    ));
                }
                if !slot.outstanding {
                    return Err(PinpadError::ProtocolViolation(
                        "awaiting a PIN response with no request outstanding".to_string(),
                    ));
                }
            }
            self.response_ready.notified().await;
        }
    }

    /// Surface side: answers the outstanding request. Call once per request.
    pub fn post_response(&self, response: PinResponse) -> Result<()> {
        {
            let mut slot = self.slot.lock();
            if !slot.outstanding {
                return Err(PinpadError::ProtocolViolation(
                    "no PIN request is outstanding".to_string(),
                ));
            }
            slot.outstanding = false;
            slot.request = None;
            slot.response = Some(response);
        }
        self.response_ready.notify_one();
        Ok(())
    }

    /// Surface side: picks up the pending request without waiting.
    pub fn take_request(&self) -> Option<PinRequest> {
        self.slot.lock().request.take()
    }

    /// Surface side: waits until a request is posted and takes it.
    ///
    /// Returns `None` once the channel is closed.
    pub async fn next_request(&self) -> Option<PinRequest> {
        loop {
            {
                let mut slot = self.slot.lock();
                if let Some(request) = slot.request.take() {
                    return Some(request);
                }
                if slot.closed {
                    return None;
                }
            }
            self.request_ready.notified().await;
        }
    }

    /// Surface side: reports that the surface failed. The worker's wait ends
    /// with [`PinpadError::InteractionFailed`] and the channel closes.
    pub fn abort(&self, reason: impl Into<String>) {
        {
            let mut slot = self.slot.lock();
            if slot.aborted.is_none() {
                slot.aborted = Some(reason.into());
            }
            slot.closed = true;
            slot.outstanding = false;
            slot.request = None;
        }
        self.request_ready.notify_one();
        self.response_ready.notify_one();
    }

    /// Closes the channel. Called by the worker once the attempt is over.
    pub fn close(&self) {
        {
            let mut slot = self.slot.lock();
            slot.closed = true;
            slot.outstanding = false;
            slot.request = None;
            slot.response = None;
        }
        self.request_ready.notify_one();
        self.response_ready.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().closed
    }

    /// True while a posted request is still unanswered.
    pub fn is_outstanding(&self) -> bool {
        self.slot.lock().outstanding
    }
}
