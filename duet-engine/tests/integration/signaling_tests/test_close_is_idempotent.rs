use duet_core::utils::NORMAL_CLOSURE;
use duet_core::{ChannelConnectionState, SignalMessage};
use duet_engine::SendOutcome;

use crate::integration::init_tracing;
use crate::utils::{ChannelHarness, FakeConnector, fast_config};

#[tokio::test(start_paused = true)]
async fn test_close_is_idempotent() {
    init_tracing();

    let (connector, mut links) = FakeConnector::new();
    let mut h = ChannelHarness::new(connector, fast_config().channel);
    h.channel.open("lobby").unwrap();
    h.step().await;
    let link = links.recv().await.unwrap();

    h.channel.close();
    assert_eq!(link.closed_with(), Some(NORMAL_CLOSURE));
    assert_eq!(h.channel.state(), ChannelConnectionState::Disconnected);
    assert!(!h.channel.is_heartbeat_running());

    h.channel.close();
    assert_eq!(h.channel.state(), ChannelConnectionState::Disconnected);
    assert_eq!(h.channel.pending_reconnect(), None);
}

#[tokio::test(start_paused = true)]
async fn test_close_discards_queue() {
    init_tracing();

    let (connector, _links) = FakeConnector::new();
    let mut h = ChannelHarness::new(connector, fast_config().channel);
    h.channel.open("lobby").unwrap();

    let outcome = h.channel.send(SignalMessage::JoinRoom {
        username: "alice".to_owned(),
    });
    assert_eq!(outcome, SendOutcome::Queued);

    h.channel.close();
    assert_eq!(h.channel.queued(), 0);
}
