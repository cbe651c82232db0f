//! OAuth application settings consumed by `Client`.

use serde::Deserialize;

/// Login host for production orgs.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Login host for sandbox orgs.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";

/// REST API version used when the client is not told otherwise.
pub const DEFAULT_API_VERSION: &str = "v59.0";

/// Source of the connected-app credentials.
///
/// Implement this to pull credentials from wherever the host application keeps
/// them. The client reads the values when it builds OAuth requests and never
/// caches them.
pub trait ClientConfig {
    fn login_url(&self) -> &str;
    fn client_id(&self) -> &str;
    fn client_secret(&self) -> &str;
}

/// Plain in-memory [`ClientConfig`].
///
/// Derives `Deserialize` so it can be loaded from whichever file format the
/// host application already uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub login_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Config {
    pub fn new(
        login_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            login_url: login_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Credentials for a production org.
    pub fn production(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::new(PRODUCTION_LOGIN_URL, client_id, client_secret)
    }

    /// Credentials for a sandbox org.
    pub fn sandbox(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::new(SANDBOX_LOGIN_URL, client_id, client_secret)
    }
}

impl ClientConfig for Config {
    fn login_url(&self) -> &str {
        &self.login_url
    }

    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn client_secret(&self) -> &str {
        &self.client_secret
    }
}
