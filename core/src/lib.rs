//! Synchronous client for a Salesforce-style CRM REST API.
//!
//! # Overview
//! Covers the OAuth2 web-server flow (login URL, authorization-code exchange,
//! refresh) and record CRUD plus SOQL search against any sobject type. Every
//! operation is one HTTP round trip carrying the current bearer token.
//!
//! # Design
//! - `Client` owns a [`ClientConfig`], a [`Transport`] and an optional
//!   [`AccessToken`]; nothing else persists between calls.
//! - Each operation is available split into `build_*` (produces an
//!   `HttpRequest`) and `parse_*` (consumes an `HttpResponse`), so callers can
//!   run the I/O themselves. The unsplit methods send through the transport.
//! - Every non-2xx response becomes [`RequestError`], decoded from whatever
//!   error shape the server returned.
//! - Token persistence is left to the caller; `AccessToken` is serde-ready.
//!
//! ```no_run
//! use sforce_core::Client;
//!
//! # fn main() -> Result<(), sforce_core::Error> {
//! let mut client = Client::create("https://login.salesforce.com", "client-id", "client-secret");
//! let login = client.get_login_url("https://app.example.com/callback")?;
//! println!("visit {login}");
//!
//! let token = client.authorize_confirm("code-from-callback", "https://app.example.com/callback")?;
//! client.set_access_token(token);
//!
//! let id = client.create_record("Lead", &serde_json::json!({"LastName": "Lovelace", "Company": "Analytical"}))?;
//! let lead = client.get_record("Lead", &id, &["LastName", "Company"])?;
//! println!("{lead}");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod token;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::{ClientConfig, Config, DEFAULT_API_VERSION, PRODUCTION_LOGIN_URL, SANDBOX_LOGIN_URL};
pub use error::{Error, RequestError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use token::{AccessToken, TokenResponse};
pub use transport::{Transport, UreqTransport, DEFAULT_BODY_LIMIT};
pub use types::{CreateResult, QueryResult};
