use crate::error::SessionError;
use crate::session::{SessionCommand, SessionSnapshot, SessionUpdate};
use duet_core::{ChatEntry, CompositeConnectionState, SessionId, TrackKind};
use tokio::sync::{mpsc, oneshot, watch};

pub type SessionUpdates = mpsc::UnboundedReceiver<SessionUpdate>;

/// Cloneable front door to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(
        id: SessionId,
        commands: mpsc::Sender<SessionCommand>,
        snapshot: watch::Receiver<SessionSnapshot>,
    ) -> Self {
        Self {
            id,
            commands,
            snapshot,
        }
    }

    /// Identifies this session in logs.
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> CompositeConnectionState {
        self.snapshot.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Resolves with the first snapshot that satisfies `predicate`.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut snapshot = self.snapshot.clone();
        let current = snapshot
            .wait_for(predicate)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(current.clone())
    }

    pub async fn send_chat(&self, text: impl Into<String>) -> Result<ChatEntry, SessionError> {
        let text = text.into();
        let entry = self
            .request(|reply| SessionCommand::SendChat { text, reply })
            .await??;
        Ok(entry)
    }

    pub async fn messages(&self) -> Result<Vec<ChatEntry>, SessionError> {
        self.request(|reply| SessionCommand::Messages { reply }).await
    }

    pub async fn reconnect(&self) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::Reconnect)
            .await
            .map_err(|_| SessionError::Closed)
    }

    pub async fn toggle_audio(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleAudio { reply }).await
    }

    pub async fn toggle_video(&self) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::ToggleVideo { reply }).await
    }

    pub async fn switch_device(
        &self,
        kind: TrackKind,
        device_id: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.commands
            .send(SessionCommand::SwitchDevice {
                kind,
                device_id: device_id.into(),
            })
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Ends the session. Calling it again, or after the session has ended,
    /// is a no-op.
    pub async fn leave(&self) -> Result<(), SessionError> {
        match self.request(|reply| SessionCommand::Leave { reply }).await {
            Ok(()) | Err(SessionError::Closed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }
}
