use duet_core::{PeerConnectionState, SdpType};

use super::{candidate, count_kind, remote_answer};
use crate::integration::init_tracing;
use crate::utils::{Call, FakeBackend, PeerHarness, remote_offer};

#[tokio::test(start_paused = true)]
async fn test_answer_without_offer_is_dropped() {
    init_tracing();

    let (backend, _created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend.clone());

    h.session.handle_answer(remote_answer(9));
    h.settle().await;

    assert_eq!(h.session.state(), PeerConnectionState::New);
    assert!(!h.session.has_connection());
    assert!(backend.created().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_second_answer_is_dropped() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);
    h.session.initiate_call();
    h.step_until(|h| h.has_signal("offer")).await;
    let conn = created.recv().await.unwrap();

    h.session.handle_answer(remote_answer(9));
    h.step().await;
    h.session.handle_answer(remote_answer(9));
    h.settle().await;

    let applied = conn
        .calls()
        .into_iter()
        .filter(|c| *c == Call::SetRemote(SdpType::Answer))
        .count();
    assert_eq!(applied, 1);
    assert_eq!(count_kind(&h.signals(), "offer"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_candidate_before_remote_description_is_dropped() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);

    h.session.handle_ice_candidate(candidate(1));
    assert_eq!(h.session.state(), PeerConnectionState::New);

    h.session.initiate_call();
    h.step_until(|h| h.has_signal("offer")).await;
    let conn = created.recv().await.unwrap();

    h.session.handle_ice_candidate(candidate(2));
    h.settle().await;
    assert!(conn.applied_candidates().is_empty());
    assert_eq!(h.session.state(), PeerConnectionState::Connecting);

    h.session.handle_answer(remote_answer(9));
    h.step().await;
    h.session.handle_ice_candidate(candidate(3));
    h.step().await;
    assert_eq!(conn.applied_candidates(), vec![candidate(3).candidate]);
    assert_eq!(h.session.state(), PeerConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn test_candidate_right_after_answer_is_applied() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);
    h.session.initiate_call();
    h.step_until(|h| h.has_signal("offer")).await;
    let conn = created.recv().await.unwrap();

    h.session.handle_answer(remote_answer(9));
    h.session.handle_ice_candidate(candidate(3));
    h.step().await;
    h.step().await;

    assert_eq!(conn.applied_candidates(), vec![candidate(3).candidate]);
    let calls = conn.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[
            Call::SetRemote(SdpType::Answer),
            Call::AddCandidate(candidate(3).candidate),
        ]
    );
    assert_eq!(h.session.state(), PeerConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn test_candidate_right_after_offer_is_applied() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);

    h.session.handle_offer(remote_offer(7));
    h.session.handle_ice_candidate(candidate(1));
    h.session.handle_ice_candidate(candidate(2));
    h.step_until(|h| h.has_signal("answer")).await;
    h.step().await;
    h.step().await;

    let conn = created.recv().await.unwrap();
    assert_eq!(
        conn.calls(),
        vec![
            Call::SetRemote(SdpType::Offer),
            Call::CreateAnswer,
            Call::SetLocal(SdpType::Answer),
            Call::AddCandidate(candidate(1).candidate),
            Call::AddCandidate(candidate(2).candidate),
        ]
    );
}
