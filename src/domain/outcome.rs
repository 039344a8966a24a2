use crate::error::PinpadError;
use std::fmt;

/// Lifecycle of a single transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Idle,
    Building,
    AwaitingEngine,
    AwaitingPin,
    Resuming,
    Completed,
    Failed,
    Cancelled,
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::AwaitingEngine => "awaiting_engine",
            Self::AwaitingPin => "awaiting_pin",
            Self::Resuming => "resuming",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The operator cancelled PIN entry.
    UserCancelled,
    /// The engine rejected the transaction with the given code.
    EngineFailure(i32),
    /// The engine itself errored out.
    EngineError(String),
    /// The PIN channel was misused.
    ProtocolViolation(String),
    /// No PIN arrived within the configured bound.
    InteractionTimeout,
    /// The interaction surface reported an error or went away.
    InteractionFailed(String),
    /// The engine kept asking for a PIN past the configured limit.
    PinTriesExceeded,
    /// The request could not be built.
    InvalidRequest(String),
    /// The worker stopped without delivering an outcome.
    WorkerLost,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserCancelled => write!(f, "user_cancelled"),
            Self::EngineFailure(code) => write!(f, "engine_failure({code})"),
            Self::EngineError(msg) => write!(f, "engine_error: {msg}"),
            Self::ProtocolViolation(msg) => write!(f, "protocol_violation: {msg}"),
            Self::InteractionTimeout => write!(f, "interaction_timeout"),
            Self::InteractionFailed(msg) => write!(f, "interaction_failed: {msg}"),
            Self::PinTriesExceeded => write!(f, "pin_tries_exceeded"),
            Self::InvalidRequest(msg) => write!(f, "invalid_request: {msg}"),
            Self::WorkerLost => write!(f, "worker_lost"),
        }
    }
}

impl From<PinpadError> for FailureReason {
    fn from(err: PinpadError) -> Self {
        match err {
            PinpadError::ProtocolViolation(msg) => Self::ProtocolViolation(msg),
            PinpadError::Engine(msg) => Self::EngineError(msg),
            PinpadError::InteractionFailed(msg) => Self::InteractionFailed(msg),
            PinpadError::InteractionTimeout => Self::InteractionTimeout,
            PinpadError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            other => Self::EngineError(other.to_string()),
        }
    }
}

/// The single result of a transaction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub success: bool,
    pub payload: Option<Vec<u8>>,
    pub reason: Option<FailureReason>,
    /// Terminal state the worker reached.
    pub state: WorkerState,
    /// How many PIN round-trips the attempt went through.
    pub pin_prompts: u32,
}

impl TransactionOutcome {
    pub fn completed(payload: Vec<u8>, pin_prompts: u32) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            reason: None,
            state: WorkerState::Completed,
            pin_prompts,
        }
    }

    pub fn cancelled(pin_prompts: u32) -> Self {
        Self {
            success: false,
            payload: None,
            reason: Some(FailureReason::UserCancelled),
            state: WorkerState::Cancelled,
            pin_prompts,
        }
    }

    pub fn failed(reason: FailureReason, pin_prompts: u32) -> Self {
        Self {
            success: false,
            payload: None,
            reason: Some(reason),
            state: WorkerState::Failed,
            pin_prompts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(WorkerState::Completed.is_terminal());
        assert!(WorkerState::Failed.is_terminal());
        assert!(WorkerState::Cancelled.is_terminal());
        assert!(!WorkerState::AwaitingPin.is_terminal());
        assert!(!WorkerState::Idle.is_terminal());
    }

    #[test]
    fn test_error_maps_to_reason() {
        let reason: FailureReason = PinpadError::InteractionTimeout.into();
        assert_eq!(reason, FailureReason::InteractionTimeout);

        let reason: FailureReason = PinpadError::ProtocolViolation("twice".to_string()).into();
        assert_eq!(reason, FailureReason::ProtocolViolation("twice".to_string()));
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(FailureReason::EngineFailure(7).to_string(), "engine_failure(7)");
        assert_eq!(FailureReason::UserCancelled.to_string(), "user_cancelled");
    }
}
