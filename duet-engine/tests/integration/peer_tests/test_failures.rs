use std::sync::atomic::Ordering;

use duet_core::PeerConnectionState;
use duet_engine::peer::IceConnectionState;

use super::{candidate, remote_answer};
use crate::integration::init_tracing;
use crate::utils::{FakeBackend, PeerHarness, remote_offer};

#[tokio::test(start_paused = true)]
async fn test_create_failure_marks_failed() {
    init_tracing();

    let (backend, _created) = FakeBackend::new();
    backend.fail_create(true);
    let mut h = PeerHarness::new(backend);

    h.session.initiate_call();
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Failed);
    assert!(h.signals().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_remote_answer_marks_failed() {
    init_tracing();

    let (backend, _created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend.clone());

    h.session.initiate_call();
    h.step_until(|h| h.has_signal("offer")).await;
    backend.created()[0].fail_remote.store(true, Ordering::SeqCst);

    h.session.handle_answer(remote_answer(9));
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_candidate_marks_failed() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);
    h.session.handle_offer(remote_offer(5));
    h.step_until(|h| h.has_signal("answer")).await;
    let conn = created.recv().await.unwrap();
    conn.fail_candidates.store(true, Ordering::SeqCst);

    h.session.handle_ice_candidate(candidate(1));
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_ice_failure_marks_failed() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);
    h.session.initiate_call();
    h.step_until(|h| h.has_signal("offer")).await;
    let conn = created.recv().await.unwrap();

    conn.ice(IceConnectionState::Checking);
    conn.ice(IceConnectionState::Failed);
    h.step().await;
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Failed);
    assert!(!h.session.is_sampling_stats());
}
