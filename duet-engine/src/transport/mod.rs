mod rtc_backend;
mod ws_connector;

pub use rtc_backend::RtcBackend;
pub use ws_connector::WsConnector;
