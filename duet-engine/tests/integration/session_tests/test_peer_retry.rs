use std::time::Duration;

use duet_core::utils::NORMAL_CLOSURE;
use duet_core::{CompositeConnectionState, SignalMessage};
use duet_engine::peer::IceConnectionState;
use tokio::time::Instant;

use super::{Fakes, TestSession, eventually};
use crate::integration::init_tracing;

#[tokio::test(start_paused = true)]
async fn test_peer_retry_limit_then_notice() {
    init_tracing();

    let mut s = TestSession::start(Fakes::new());
    let mut link = s.joined_link().await;
    let conn = s.connect_call(&mut link).await;

    conn.ice(IceConnectionState::Failed);
    s.wait_for(|s| s.state == CompositeConnectionState::Failed)
        .await;
    let notice = s.notice_starting_with("Connection to bob failed").await;
    assert!(notice.retryable);

    let failed_at = Instant::now();
    for attempt in 1..=3u32 {
        let next = s.next_peer().await;
        assert!(failed_at.elapsed() >= Duration::from_secs(5) * attempt);
        link.next_of_kind("offer").await;
        next.ice(IceConnectionState::Failed);
    }

    let notice = s.notice_starting_with("Could not reconnect to bob").await;
    assert!(notice.retryable);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(s.no_more_peers());
    assert_eq!(s.backend.created().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_recovered_link_resets_retries() {
    init_tracing();

    let mut s = TestSession::start(Fakes::new());
    let mut link = s.joined_link().await;
    let conn = s.connect_call(&mut link).await;

    conn.ice(IceConnectionState::Disconnected);
    let mut current = s.next_peer().await;
    s.answer_offer(&mut link).await;
    current.ice(IceConnectionState::Connected);
    s.wait_for(|s| s.state.is_connected()).await;

    for _ in 0..3 {
        current.ice(IceConnectionState::Disconnected);
        current = s.next_peer().await;
        s.answer_offer(&mut link).await;
        current.ice(IceConnectionState::Connected);
        s.wait_for(|s| s.state.is_connected()).await;
    }
    assert_eq!(s.backend.created().len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_reconnect_starts_over() {
    init_tracing();

    let mut s = TestSession::start(Fakes::new());
    let mut link = s.joined_link().await;
    let mut conn = s.connect_call(&mut link).await;

    conn.ice(IceConnectionState::Failed);
    for _ in 0..3 {
        conn = s.next_peer().await;
        link.next_of_kind("offer").await;
        conn.ice(IceConnectionState::Failed);
    }
    s.notice_starting_with("Could not reconnect").await;

    s.handle.reconnect().await.unwrap();
    let mut fresh = s.next_link().await;
    assert_eq!(link.closed_with(), Some(NORMAL_CLOSURE));
    assert_eq!(
        fresh.next_of_kind("join-room").await,
        SignalMessage::JoinRoom {
            username: "alice".to_owned()
        }
    );
    eventually(|| conn.is_closed()).await;
    assert!(s.handle.snapshot().last_error.is_none());

    let again = s.connect_call(&mut fresh).await;
    again.ice(IceConnectionState::Failed);
    let retried = s.next_peer().await;
    assert!(!retried.is_closed());
    assert_eq!(s.backend.created().len(), 6);
}
