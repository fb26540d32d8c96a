//! Client settings with defaults, file and environment overrides.

use std::{fmt, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{context::mask_token, http::HttpConfig};

const CONFIG_FILE: &str = "eventsub.toml";

/// Ambient settings shared by every call of a [`HelixClient`](crate::HelixClient).
///
/// Loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`eventsub.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Client id and access token act as defaults only; a
/// [`RequestContext`](crate::RequestContext) can override them per call.
///
/// # Example
///
/// ```no_run
/// use eventsub_client::ClientSettings;
///
/// let settings = ClientSettings::load().expect("Failed to load settings");
/// println!("Helix base URL: {}", settings.base_url);
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Default application client id.
    ///
    /// Environment variable: `TWITCH_CLIENT_ID`
    #[serde(default)]
    pub client_id: Option<String>,

    /// Default OAuth access token (app or user token).
    ///
    /// Environment variable: `TWITCH_ACCESS_TOKEN`
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Base URL of the API, without the version prefix.
    ///
    /// Environment variable: `HELIX_BASE_URL`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds.
    ///
    /// Environment variable: `HELIX_TIMEOUT_SECONDS`
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// User agent sent with every request.
    ///
    /// Environment variable: `HELIX_USER_AGENT`
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Log filter used when `RUST_LOG` is not set.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub rust_log: String,
}

impl ClientSettings {
    /// Loads settings from defaults, `eventsub.toml` and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Loads settings using the given configuration file path.
    pub fn load_from(path: &str) -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("TWITCH_").only(&["client_id", "access_token"]))
            .merge(Env::prefixed("HELIX_").only(&["base_url", "timeout_seconds", "user_agent"]))
            .merge(Env::raw().only(&["rust_log"]));

        let settings: Self = figment.extract().context("Failed to load client settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Convert to the HTTP transport configuration.
    pub fn to_http_config(&self) -> HttpConfig {
        HttpConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_seconds),
            user_agent: self.user_agent.clone(),
        }
    }

    /// Default access token with all but the last characters hidden.
    pub fn access_token_masked(&self) -> Option<String> {
        self.access_token.as_deref().map(mask_token)
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            anyhow::bail!("base_url must be set");
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            anyhow::bail!("base_url must start with http:// or https://");
        }

        if self.timeout_seconds == 0 {
            anyhow::bail!("timeout_seconds must be greater than 0");
        }

        Ok(())
    }
}

impl fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSettings")
            .field("client_id", &self.client_id)
            .field("access_token", &self.access_token_masked())
            .field("base_url", &self.base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("user_agent", &self.user_agent)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            access_token: None,
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
            rust_log: default_log_level(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.twitch.tv".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("eventsub-client/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_level() -> String {
    "info".to_string()
}
