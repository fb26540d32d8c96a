//! Per-call credentials.
//!
//! Every operation takes a [`RequestContext`]. Values set on the context
//! override the defaults from [`ClientSettings`]; the resolved pair is handed
//! to the transport as [`Credentials`].

use std::fmt;

use eventsub_core::{error::require, ValidationError};

use crate::config::ClientSettings;

/// Client id and access token sent with a request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Application client id.
    pub client_id: String,
    /// OAuth access token, without the `Bearer ` prefix.
    pub access_token: String,
}

impl Credentials {
    /// Creates credentials from a client id and token.
    pub fn new(client_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self { client_id: client_id.into(), access_token: access_token.into() }
    }

    /// Access token with everything but the last four characters hidden.
    pub fn access_token_masked(&self) -> String {
        mask_token(&self.access_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("access_token", &self.access_token_masked())
            .finish()
    }
}

/// Per-call overrides for client id and access token.
///
/// # Example
///
/// ```
/// use eventsub_client::RequestContext;
///
/// // Use the configured client id but a different user's token.
/// let ctx = RequestContext::new().with_access_token("user-token");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    client_id: Option<String>,
    access_token: Option<String>,
}

impl RequestContext {
    /// Context that uses the configured defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the client id for this call.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Overrides the access token for this call.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.access_token = Some(access_token.into());
        self
    }

    /// Resolves the credentials for a call: overrides first, then settings.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingField` when neither source supplies
    /// a non-blank client id or access token.
    pub fn resolve(&self, settings: &ClientSettings) -> Result<Credentials, ValidationError> {
        let client_id = pick(self.client_id.as_deref(), settings.client_id.as_deref());
        let access_token = pick(self.access_token.as_deref(), settings.access_token.as_deref());

        let access_token = access_token.strip_prefix("Bearer ").unwrap_or(access_token).trim();

        require("client_id", client_id)?;
        require("access_token", access_token)?;

        Ok(Credentials::new(client_id, access_token))
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("client_id", &self.client_id)
            .field("access_token", &self.access_token.as_deref().map(mask_token))
            .finish()
    }
}

fn pick<'a>(preferred: Option<&'a str>, fallback: Option<&'a str>) -> &'a str {
    preferred
        .filter(|value| !value.trim().is_empty())
        .or(fallback)
        .unwrap_or_default()
}

pub(crate) fn mask_token(token: &str) -> String {
    let count = token.chars().count();
    if count <= 8 {
        return "***".to_string();
    }
    let visible: String = token.chars().skip(count - 4).collect();
    format!("***{visible}")
}
