use async_trait::async_trait;
use common::{EngineCall, RecordingEngine, coordinator, sample_payload};
use pinpad::application::channel::PinChannel;
use pinpad::application::coordinator::Coordinator;
use pinpad::application::dispatcher::ResultDispatcher;
use pinpad::application::worker::TransactionWorker;
use pinpad::config::CoordinatorConfig;
use pinpad::domain::outcome::{FailureReason, WorkerState};
use pinpad::domain::pin::{Pin, PinRequest, PinResponse};
use pinpad::domain::ports::{EngineBox, EngineProvider, EngineResult, TransactionEngine};
use pinpad::error::{PinpadError, Result};
use pinpad::infrastructure::rng::OsRandomSource;
use pinpad::interfaces::scripted::ScriptedSurface;
use std::sync::Arc;

mod common;

#[tokio::test]
async fn test_success_without_pin() {
    let engine = RecordingEngine::new(vec![EngineResult::Success(b"R".to_vec())]);
    let coordinator = coordinator(&engine).await;
    let surface = Arc::new(ScriptedSurface::from_list(""));

    let outcome = coordinator
        .run(sample_payload(), None, surface.clone())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.payload, Some(b"R".to_vec()));
    assert_eq!(outcome.reason, None);
    assert_eq!(outcome.state, WorkerState::Completed);
    assert_eq!(outcome.pin_prompts, 0);
    assert!(surface.requests().is_empty());
    assert_eq!(engine.calls(), vec![EngineCall::Transact(sample_payload())]);
}

#[tokio::test]
async fn test_success_after_pin() {
    let engine = RecordingEngine::new(vec![
        EngineResult::NeedsPin { prompt_code: 3 },
        EngineResult::Success(b"R2".to_vec()),
    ]);
    let coordinator = coordinator(&engine).await;
    let surface = Arc::new(ScriptedSurface::from_list("1234"));

    let outcome = coordinator
        .run(sample_payload(), None, surface.clone())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.payload, Some(b"R2".to_vec()));
    assert_eq!(outcome.pin_prompts, 1);
    assert_eq!(
        surface.requests(),
        vec![PinRequest {
            prompt_code: 3,
            amount: "1.00".to_string(),
        }]
    );
    // The captured PIN reaches the engine unchanged.
    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::Transact(sample_payload()),
            EngineCall::SubmitPin("1234".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_cancellation_stops_engine_calls() {
    let engine = RecordingEngine::new(vec![
        EngineResult::NeedsPin { prompt_code: 3 },
        EngineResult::Success(b"never".to_vec()),
    ]);
    let coordinator = coordinator(&engine).await;
    let surface = Arc::new(ScriptedSurface::from_list("c"));

    let outcome = coordinator.run(sample_payload(), None, surface).await;

    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(FailureReason::UserCancelled));
    assert_eq!(outcome.state, WorkerState::Cancelled);
    assert_eq!(engine.calls(), vec![EngineCall::Transact(sample_payload())]);
}

#[tokio::test]
async fn test_engine_failure_is_reported() {
    let engine = RecordingEngine::new(vec![EngineResult::Failure(7)]);
    let coordinator = coordinator(&engine).await;
    let surface = Arc::new(ScriptedSurface::from_list(""));

    let outcome = coordinator.run(sample_payload(), None, surface).await;

    assert!(!outcome.success);
    assert_eq!(outcome.reason, Some(FailureReason::EngineFailure(7)));
    assert_eq!(outcome.state, WorkerState::Failed);
    assert_eq!(outcome.payload, None);
}

#[tokio::test]
async fn test_repeated_pin_requests_are_paired() {
    let engine = RecordingEngine::new(vec![
        EngineResult::NeedsPin { prompt_code: 3 },
        EngineResult::NeedsPin { prompt_code: 2 },
        EngineResult::Success(b"ok".to_vec()),
    ]);
    let coordinator = coordinator(&engine).await;
    let surface = Arc::new(ScriptedSurface::from_list("0000,1234"));

    let outcome = coordinator
        .run(sample_payload(), None, surface.clone())
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.pin_prompts, 2);
    let codes: Vec<i32> = surface.requests().iter().map(|r| r.prompt_code).collect();
    assert_eq!(codes, vec![3, 2]);
    assert_eq!(
        engine.calls(),
        vec![
            EngineCall::Transact(sample_payload()),
            EngineCall::SubmitPin("0000".to_string()),
            EngineCall::SubmitPin("1234".to_string()),
        ]
    );
    assert_eq!(surface.remaining(), 0);
}

#[tokio::test]
async fn test_handle_exposes_channel_to_external_surface() {
    let engine = RecordingEngine::new(vec![
        EngineResult::NeedsPin { prompt_code: 1 },
        EngineResult::Success(Vec::new()),
    ]);
    let coordinator = coordinator(&engine).await;
    let handle = coordinator.start(sample_payload(), None).unwrap();
    let channel = handle.channel();

    let request = channel.next_request().await.unwrap();
    assert_eq!(request.amount, "1.00");
    assert_eq!(handle.state(), WorkerState::AwaitingPin);

    // Only one request may be in flight.
    let second = channel.post_request(request.clone());
    assert!(matches!(second, Err(PinpadError::ProtocolViolation(_))));

    channel.post_response(PinResponse::pin("9876")).unwrap();
    let outcome = handle.outcome().await;
    assert!(outcome.success);
    assert!(channel.is_closed());
    assert_eq!(
        engine.calls().last(),
        Some(&EngineCall::SubmitPin("9876".to_string()))
    );
}

#[tokio::test]
async fn test_exactly_one_outcome_per_attempt() {
    for script in [
        vec![EngineResult::Success(Vec::new())],
        vec![EngineResult::Failure(1)],
        vec![
            EngineResult::NeedsPin { prompt_code: 3 },
            EngineResult::NeedsPin { prompt_code: 2 },
            EngineResult::Failure(2),
        ],
    ] {
        let engine = RecordingEngine::new(script);
        let channel = Arc::new(PinChannel::new());
        let worker = TransactionWorker::new(
            Box::new(engine.clone()),
            channel.clone(),
            CoordinatorConfig::default(),
        );
        let (dispatcher, mut receiver) = ResultDispatcher::new();

        let surface = channel.clone();
        let driver = tokio::spawn(async move {
            let mut answered = 0;
            while surface.next_request().await.is_some() {
                surface.post_response(PinResponse::pin("0000")).unwrap();
                answered += 1;
            }
            answered
        });

        worker.start(sample_payload(), None, dispatcher).await;

        let outcome = receiver.try_take().expect("outcome delivered");
        assert!(outcome.state.is_terminal());
        assert!(receiver.try_take().is_none());
        assert_eq!(driver.await.unwrap(), outcome.pin_prompts);
    }
}

/// Engine whose library crashes on the first call.
struct CrashingEngine;

#[async_trait]
impl EngineProvider for CrashingEngine {
    fn session(&self) -> Result<EngineBox> {
        Ok(Box::new(CrashingEngine))
    }
}

#[async_trait]
impl TransactionEngine for CrashingEngine {
    async fn transact(&mut self, _payload: &[u8]) -> Result<EngineResult> {
        panic!("engine library crashed");
    }

    async fn submit_pin(&mut self, _pin: Pin) -> Result<EngineResult> {
        panic!("engine library crashed");
    }
}

#[tokio::test]
async fn test_engine_panic_releases_surface() {
    let coordinator = Coordinator::init(
        Arc::new(CrashingEngine),
        Arc::new(OsRandomSource::new()),
        CoordinatorConfig::default(),
    )
    .await
    .unwrap();

    let handle = coordinator.start(sample_payload(), None).unwrap();
    let channel = handle.channel();
    let surface = channel.clone();
    let surface_loop = tokio::spawn(async move {
        let mut served = 0;
        while surface.next_request().await.is_some() {
            served += 1;
        }
        served
    });

    let outcome = handle.outcome().await;
    assert_eq!(outcome.reason, Some(FailureReason::WorkerLost));
    assert!(!outcome.success);
    assert!(channel.is_closed());

    let served = tokio::time::timeout(std::time::Duration::from_secs(2), surface_loop)
        .await
        .expect("surface loop still waiting on the channel")
        .unwrap();
    assert_eq!(served, 0);
}
