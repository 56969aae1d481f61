use std::time::Duration;

use duet_core::ChannelConnectionState;
use duet_engine::signaling::RECONNECT_EXHAUSTED;
use tokio::time::Instant;

use crate::integration::init_tracing;
use crate::utils::{ChannelHarness, FakeConnector, fast_config};

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_then_fails() {
    init_tracing();

    let (connector, _links) = FakeConnector::new();
    connector.fail_next(u32::MAX);
    let mut h = ChannelHarness::new(connector.clone(), fast_config().channel);

    let start = Instant::now();
    h.channel.open("lobby").unwrap();

    let mut delays = Vec::new();
    while h.channel.state() != ChannelConnectionState::Failed {
        h.step().await;
        if let Some(delay) = h.channel.pending_reconnect() {
            delays.push(delay);
        }
    }

    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
        ]
    );
    assert_eq!(connector.attempts(), 5);
    assert!(start.elapsed() >= Duration::from_secs(15));
    assert!(start.elapsed() < Duration::from_secs(16));

    let last = h.inbound.last().unwrap();
    assert_eq!(last, &duet_core::SignalMessage::error(RECONNECT_EXHAUSTED));
    assert_eq!(h.channel.pending_reconnect(), None);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(connector.attempts(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_is_capped() {
    init_tracing();

    let mut config = fast_config().channel;
    config.reconnect_attempts = 10;

    let (connector, _links) = FakeConnector::new();
    connector.fail_next(u32::MAX);
    let mut h = ChannelHarness::new(connector, config);
    h.channel.open("lobby").unwrap();

    let mut delays = Vec::new();
    while h.channel.state() != ChannelConnectionState::Failed {
        h.step().await;
        if let Some(delay) = h.channel.pending_reconnect() {
            delays.push(delay);
        }
    }

    assert_eq!(delays.len(), 9);
    assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(delays.last(), Some(&Duration::from_secs(30)));
}

#[tokio::test(start_paused = true)]
async fn test_manual_reconnect_after_failure() {
    init_tracing();

    let (connector, mut links) = FakeConnector::new();
    connector.fail_next(5);
    let mut h = ChannelHarness::new(connector.clone(), fast_config().channel);
    h.channel.open("lobby").unwrap();
    h.step_until(|h| h.channel.state() == ChannelConnectionState::Failed)
        .await;

    h.channel.reconnect().unwrap();
    assert_eq!(h.channel.state(), ChannelConnectionState::Connecting);
    h.step().await;

    assert_eq!(h.channel.state(), ChannelConnectionState::Connected);
    assert_eq!(h.channel.failures(), 0);
    assert!(links.recv().await.is_some());
}
