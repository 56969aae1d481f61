use duet_core::PeerConnectionState;
use duet_engine::peer::IceConnectionState;

use super::count_kind;
use crate::integration::init_tracing;
use crate::utils::{FakeBackend, PeerHarness};

#[tokio::test(start_paused = true)]
async fn test_replaced_connection_is_closed_and_ignored() {
    init_tracing();

    let (backend, mut created) = FakeBackend::new();
    let mut h = PeerHarness::new(backend.clone());

    h.session.initiate_call();
    h.session.initiate_call();
    h.settle().await;

    let first = created.recv().await.unwrap();
    let second = created.recv().await.unwrap();
    assert!(first.is_closed());
    assert!(!second.is_closed());
    assert_eq!(count_kind(&h.signals(), "offer"), 1);

    first.ice(IceConnectionState::Connected);
    h.settle().await;
    assert_eq!(h.session.state(), PeerConnectionState::Connecting);

    second.ice(IceConnectionState::Connected);
    h.step().await;
    assert_eq!(h.session.state(), PeerConnectionState::Connected);
}
