mod session_command;
mod session_coordinator;
mod session_event;
mod session_handle;
mod session_snapshot;

pub use session_command::SessionCommand;
pub use session_coordinator::{SessionCoordinator, SessionDeps};
pub use session_event::SessionEvent;
pub use session_handle::{SessionHandle, SessionUpdates};
pub use session_snapshot::{Notice, SessionSnapshot, SessionUpdate};
