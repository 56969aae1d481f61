use std::sync::Arc;
use std::time::Duration;

use duet_core::config::RelayConfig;
use duet_core::{CompositeConnectionState, PeerConnectionState};
use duet_engine::{SessionCoordinator, SessionDeps, SessionHandle, SessionUpdate, SessionUpdates, WsConnector};

use super::eventually;
use crate::integration::init_tracing;
use crate::utils::{FakeBackend, FakeDevices, TestRelay, fast_config};

const DEADLINE: Duration = Duration::from_secs(10);

fn join(relay: &TestRelay, username: &str) -> (SessionHandle, SessionUpdates) {
    let mut config = fast_config();
    config.relay = RelayConfig::new(relay.base_url());
    let (backend, _peers) = FakeBackend::auto_connecting();
    let deps = SessionDeps {
        connector: Arc::new(WsConnector::new()),
        peers: Arc::new(backend),
        devices: Arc::new(FakeDevices::new()),
    };
    SessionCoordinator::spawn(config, "pairing", username, deps).unwrap()
}

async fn until(handle: &SessionHandle, predicate: impl FnMut(&duet_engine::SessionSnapshot) -> bool) {
    tokio::time::timeout(DEADLINE, handle.wait_for(predicate))
        .await
        .expect("timed out")
        .expect("session ended");
}

#[tokio::test]
async fn test_two_party_call_over_relay() {
    init_tracing();

    let relay = TestRelay::start().await;

    let (alice, _alice_updates) = join(&relay, "alice");
    eventually(|| relay.connections() == 1).await;
    let (bob, mut bob_updates) = join(&relay, "bob");

    until(&alice, |s| s.state == CompositeConnectionState::Connected).await;
    until(&bob, |s| s.state == CompositeConnectionState::Connected).await;
    assert_eq!(alice.snapshot().remote_username.as_deref(), Some("bob"));
    assert_ne!(alice.id(), bob.id());

    let sent = alice.send_chat("hi bob").await.unwrap();
    let received = tokio::time::timeout(DEADLINE, async {
        loop {
            if let Some(SessionUpdate::Chat(entry)) = bob_updates.recv().await {
                break entry;
            }
        }
    })
    .await
    .expect("chat never arrived");
    assert_eq!(received.text, sent.text);
    assert_eq!(received.sender, "alice");
    assert_eq!(bob.messages().await.unwrap().len(), 1);

    alice.leave().await.unwrap();
    until(&bob, |s| s.peer == PeerConnectionState::Disconnected).await;
    bob.leave().await.unwrap();
}
