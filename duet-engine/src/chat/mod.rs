mod chat_mailbox;

pub use chat_mailbox::{ChatMailbox, REMOTE_SENDER};
