//! OAuth credentials held by the client.
//!
//! # Design
//! `AccessToken` is created from the token endpoint's response to an
//! authorization-code exchange and mutated in place by a refresh. Refresh
//! responses omit the refresh token, so the existing one is kept unless the
//! server rotates it. The instance URL is required on an exchange and
//! optional on a refresh. Expiry is not tracked; a rejected token shows up as an
//! `INVALID_SESSION_ID` request error and the caller decides when to refresh.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Body returned by `services/oauth2/token` for both grant types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Identity URL of the authorizing user.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    pub issued_at: Option<String>,
}

/// Bearer credentials plus the org-specific API base URL.
///
/// Serializable so callers can persist it between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub refresh_token: String,
    pub api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
}

impl AccessToken {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            api_url: api_url.into(),
            id: None,
            token_type: None,
            scope: None,
            signature: None,
            issued_at: None,
        }
    }

    /// Build a token from an authorization-code exchange.
    ///
    /// A missing refresh token (connected app without the `refresh_token`
    /// scope) is stored as an empty string. A missing instance URL is an
    /// error because every later request is built on it.
    pub fn from_token_response(response: TokenResponse) -> Result<Self, Error> {
        let api_url = response.instance_url.ok_or_else(|| {
            Error::Deserialization("token response is missing instance_url".to_string())
        })?;
        Ok(Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.unwrap_or_default(),
            api_url,
            id: response.id,
            token_type: response.token_type,
            scope: response.scope,
            signature: response.signature,
            issued_at: response.issued_at,
        })
    }

    /// Apply a refresh-token response in place.
    pub fn update_from_refresh(&mut self, response: TokenResponse) {
        self.access_token = response.access_token;
        if let Some(instance_url) = response.instance_url {
            self.api_url = instance_url;
        }
        if let Some(refresh_token) = response.refresh_token {
            self.refresh_token = refresh_token;
        }
        if response.id.is_some() {
            self.id = response.id;
        }
        if response.token_type.is_some() {
            self.token_type = response.token_type;
        }
        if response.scope.is_some() {
            self.scope = response.scope;
        }
        if response.signature.is_some() {
            self.signature = response.signature;
        }
        if response.issued_at.is_some() {
            self.issued_at = response.issued_at;
        }
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}
