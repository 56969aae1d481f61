//! Test doubles for the platform seams plus an in-process relay.

pub mod harness;

pub use fake_connector::{FakeConnector, LinkHandle};
pub use fake_devices::FakeDevices;
pub use fake_peer::{Call, FakeBackend, FakeConnection};
pub use harness::{ChannelHarness, PeerHarness, fast_config, remote_offer};
pub use test_relay::TestRelay;
