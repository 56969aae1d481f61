use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Cloneable, type-erased sender used by components and spawned tasks to
/// report back to the loop that owns them.
///
/// `emit` returns `false` once the receiving side is gone, which tells
/// background tasks to stop.
pub struct EventSink<E> {
    inner: Arc<dyn Fn(E) -> bool + Send + Sync>,
}

impl<E: Send + 'static> EventSink<E> {
    pub fn new(f: impl Fn(E) -> bool + Send + Sync + 'static) -> Self {
        Self { inner: Arc::new(f) }
    }

    pub fn emit(&self, event: E) -> bool {
        (self.inner)(event)
    }

    /// Wraps every event into the parent's event type.
    pub fn map<F: Send + 'static>(
        &self,
        wrap: impl Fn(F) -> E + Send + Sync + 'static,
    ) -> EventSink<F> {
        let inner = self.clone();
        EventSink::new(move |event| inner.emit(wrap(event)))
    }
}

impl<E: Send + 'static> From<mpsc::UnboundedSender<E>> for EventSink<E> {
    fn from(tx: mpsc::UnboundedSender<E>) -> Self {
        Self::new(move |event| tx.send(event).is_ok())
    }
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventSink")
    }
}
