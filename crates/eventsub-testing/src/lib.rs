//! Test infrastructure for EventSub client tests.
//!
//! - [`fixtures`]: record builders and ready-made settings
//! - [`fake_registry`]: [`FakeHelix`], a stateful in-memory registry
//! - [`http`]: [`MockHelixServer`], a wiremock wrapper for HTTP-level tests

pub mod fake_registry;
pub mod fixtures;
pub mod http;

pub use fake_registry::FakeHelix;
pub use fixtures::{test_settings, test_settings_for, SubscriptionBuilder};
pub use http::MockHelixServer;

use eventsub_client::HelixClient;

/// Fake registry and a client talking to it.
pub fn fake_client() -> (FakeHelix, HelixClient) {
    let fake = FakeHelix::new();
    let client = HelixClient::new(fake.clone(), test_settings());
    (fake, client)
}
