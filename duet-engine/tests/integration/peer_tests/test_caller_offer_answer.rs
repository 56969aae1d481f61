use std::time::Duration;

use duet_core::{PeerConnectionState, SdpType};
use duet_engine::peer::{CallRole, IceConnectionState};

use super::remote_answer;
use crate::integration::init_tracing;
use crate::utils::{Call, FakeBackend, PeerHarness};

#[tokio::test(start_paused = true)]
async fn test_caller_offer_answer() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);

    h.session.initiate_call();
    assert_eq!(h.session.state(), PeerConnectionState::Connecting);
    assert_eq!(h.session.role(), Some(CallRole::Caller));

    h.step_until(|h| h.has_signal("offer")).await;
    let conn = created.recv().await.unwrap();
    assert_eq!(
        conn.calls(),
        vec![Call::CreateOffer { ice_restart: false }, Call::SetLocal(SdpType::Offer)]
    );
    assert!(!h.session.remote_description_set());

    h.session.handle_answer(remote_answer(9));
    h.step().await;
    assert!(h.session.remote_description_set());
    assert_eq!(conn.calls().last(), Some(&Call::SetRemote(SdpType::Answer)));

    conn.ice(IceConnectionState::Checking);
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Connecting);

    conn.ice(IceConnectionState::Connected);
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Connected);
    assert!(h.session.is_sampling_stats());
}

#[tokio::test(start_paused = true)]
async fn test_stats_sampled_while_connected() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend);
    h.session.initiate_call();
    h.step_until(|h| h.has_signal("offer")).await;
    let conn = created.recv().await.unwrap();
    h.session.handle_answer(remote_answer(9));
    h.step().await;
    conn.ice(IceConnectionState::Connected);
    h.step().await;
    assert!(h.session.last_stats().is_none());

    let start = tokio::time::Instant::now();
    h.step_until(|h| h.session.last_stats().is_some()).await;
    assert!(start.elapsed() >= Duration::from_secs(5));

    let stats = h.session.last_stats().unwrap();
    assert_eq!(stats.bytes_sent, 1200);
    assert_eq!(stats.bytes_received, 3400);
    assert_eq!(stats.packets_lost, 2);
    assert_eq!(stats.round_trip_time, Some(Duration::from_millis(40)));

    conn.ice(IceConnectionState::Disconnected);
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Disconnected);
    assert!(!h.session.is_sampling_stats());

    conn.ice(IceConnectionState::Completed);
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Connected);
    assert!(h.session.is_sampling_stats());
}
