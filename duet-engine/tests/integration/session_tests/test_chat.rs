use duet_core::{ChatPayload, CompositeConnectionState, Origin, SignalMessage};
use duet_engine::{ChatError, SessionError, SessionUpdate};

use super::{Fakes, TestSession};
use crate::integration::init_tracing;

#[tokio::test(start_paused = true)]
async fn test_chat_requires_connected_session() {
    init_tracing();

    let mut s = TestSession::start(Fakes::new());
    let mut link = s.joined_link().await;

    let result = s.handle.send_chat("anyone there?").await;
    assert!(matches!(
        result,
        Err(SessionError::Chat(ChatError::NotReady(
            CompositeConnectionState::Connecting
        )))
    ));
    assert!(s.handle.messages().await.unwrap().is_empty());
    assert!(
        link.drain_sent()
            .iter()
            .all(|m| m.kind() != "chat-message")
    );
}

#[tokio::test(start_paused = true)]
async fn test_chat_round_trip() {
    init_tracing();

    let mut s = TestSession::start(Fakes::new());
    let mut link = s.joined_link().await;
    s.connect_call(&mut link).await;

    let entry = s.handle.send_chat("  hello bob  ").await.unwrap();
    assert_eq!(entry.text, "hello bob");
    assert_eq!(entry.sender, "alice");
    assert_eq!(entry.origin, Origin::Local);

    let SignalMessage::ChatMessage { message } = link.next_of_kind("chat-message").await else {
        unreachable!();
    };
    assert_eq!(message.text, "hello bob");
    assert_eq!(message.username.as_deref(), Some("alice"));
    assert_eq!(message.timestamp, Some(entry.timestamp));

    link.deliver(&SignalMessage::ChatMessage {
        message: ChatPayload {
            text: "hi alice".to_owned(),
            username: Some("bob".to_owned()),
            timestamp: None,
        },
    });
    let remote = loop {
        if let SessionUpdate::Chat(entry) = s.next_update().await
            && !entry.is_local()
        {
            break entry;
        }
    };
    assert_eq!(remote.sender, "bob");
    assert!(remote.id > entry.id);

    let messages = s.handle.messages().await.unwrap();
    let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["hello bob", "hi alice"]);
    assert_eq!(s.handle.snapshot().chat_len, 2);
}

#[tokio::test(start_paused = true)]
async fn test_blank_chat_is_rejected() {
    init_tracing();

    let mut s = TestSession::start(Fakes::new());
    let mut link = s.joined_link().await;
    s.connect_call(&mut link).await;

    let result = s.handle.send_chat(" \n\t ").await;
    assert!(matches!(result, Err(SessionError::Chat(ChatError::Empty))));
    assert!(s.handle.messages().await.unwrap().is_empty());
}
