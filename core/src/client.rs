//! Authenticated request orchestration for the CRM REST API.
//!
//! # Design
//! Each operation is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`. The
//! executing methods (`get_record`, `search`, `refresh_token`, ...) are just
//! build, send through the injected [`Transport`], parse. Callers that run
//! their own I/O use the split methods directly.
//!
//! The only state carried between calls is the optional [`AccessToken`], which
//! `refresh_token` mutates in place through `&mut self`.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::form_urlencoded;
use url::Url;

use crate::config::{ClientConfig, Config, DEFAULT_API_VERSION};
use crate::error::{Error, RequestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::token::{AccessToken, TokenResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{CreateResult, QueryResult};

const AUTHORIZE_PATH: [&str; 3] = ["services", "oauth2", "authorize"];
const TOKEN_PATH: [&str; 3] = ["services", "oauth2", "token"];

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Synchronous client for one org.
///
/// Not meant to be shared across threads; give each thread its own client.
#[derive(Debug)]
pub struct Client<C = Config, T = UreqTransport> {
    config: C,
    transport: T,
    api_version: String,
    token: Option<AccessToken>,
}

impl Client<Config, UreqTransport> {
    /// Client with an in-memory [`Config`] and the default blocking transport.
    pub fn create(
        login_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self::new(
            Config::new(login_url, client_id, client_secret),
            UreqTransport::new(),
        )
    }
}

impl<C: ClientConfig, T: Transport> Client<C, T> {
    pub fn new(config: C, transport: T) -> Self {
        Self {
            config,
            transport,
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
        }
    }

    /// Use a different REST API version, e.g. `"v58.0"`.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn set_access_token(&mut self, token: AccessToken) {
        self.token = Some(token);
    }

    /// The current token, including any refresh applied since it was set.
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    // -----------------------------------------------------------------------
    // Executing operations
    // -----------------------------------------------------------------------

    pub fn get_record(&self, object_type: &str, id: &str, fields: &[&str]) -> Result<Value, Error> {
        let request = self.build_get_record(object_type, id, fields)?;
        self.parse_get_record(self.execute(&request)?)
    }

    /// Create a record and return its id.
    pub fn create_record<B: Serialize + ?Sized>(
        &self,
        object_type: &str,
        fields: &B,
    ) -> Result<String, Error> {
        let request = self.build_create_record(object_type, fields)?;
        self.parse_create_record(self.execute(&request)?)
    }

    pub fn update_record<B: Serialize + ?Sized>(
        &self,
        object_type: &str,
        id: &str,
        fields: &B,
    ) -> Result<bool, Error> {
        let request = self.build_update_record(object_type, id, fields)?;
        self.parse_update_record(self.execute(&request)?)
    }

    pub fn delete_record(&self, object_type: &str, id: &str) -> Result<bool, Error> {
        let request = self.build_delete_record(object_type, id)?;
        self.parse_delete_record(self.execute(&request)?)
    }

    /// Run a SOQL query and return the first page of results.
    pub fn search(&self, soql: &str) -> Result<QueryResult, Error> {
        let request = self.build_search(soql)?;
        self.parse_search(self.execute(&request)?)
    }

    /// Exchange an authorization code for a new token.
    ///
    /// The token is returned, not stored; pass it to `set_access_token`.
    pub fn authorize_confirm(&self, auth_code: &str, redirect_url: &str) -> Result<AccessToken, Error> {
        let request = self.build_authorize_confirm(auth_code, redirect_url)?;
        let token = self.parse_authorize_confirm(self.execute(&request)?)?;
        info!(api_url = %token.api_url, "obtained access token");
        Ok(token)
    }

    /// Obtain a fresh access token and apply it to the held token in place.
    pub fn refresh_token(&mut self) -> Result<(), Error> {
        let request = self.build_refresh_token()?;
        let response = self.execute(&request)?;
        self.parse_refresh_token(response)?;
        if let Some(token) = &self.token {
            info!(api_url = %token.api_url, "refreshed access token");
        }
        Ok(())
    }

    /// URL to send the user to so they can grant access. No request is made.
    pub fn get_login_url(&self, redirect_url: &str) -> Result<String, Error> {
        let mut url = endpoint(self.config.login_url(), &AUTHORIZE_PATH)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", self.config.client_id())
            .append_pair("redirect_uri", redirect_url);
        Ok(url.into())
    }

    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(request)?;
        debug!(status = response.status, "received response");
        Ok(response)
    }

    // -----------------------------------------------------------------------
    // Request builders
    // -----------------------------------------------------------------------

    pub fn build_get_record(&self, object_type: &str, id: &str, fields: &[&str]) -> Result<HttpRequest, Error> {
        let token = self.token()?;
        let mut url = self.sobject_url(token, object_type, Some(id))?;
        if !fields.is_empty() {
            // Commas are legal in a query string and the API expects them raw.
            url.set_query(Some(&format!("fields={}", fields.join(","))));
        }
        Ok(authorized(HttpMethod::Get, url, token, None))
    }

    pub fn build_create_record<B: Serialize + ?Sized>(
        &self,
        object_type: &str,
        fields: &B,
    ) -> Result<HttpRequest, Error> {
        let token = self.token()?;
        let url = self.sobject_url(token, object_type, None)?;
        Ok(authorized(HttpMethod::Post, url, token, Some(to_json(fields)?)))
    }

    pub fn build_update_record<B: Serialize + ?Sized>(
        &self,
        object_type: &str,
        id: &str,
        fields: &B,
    ) -> Result<HttpRequest, Error> {
        let token = self.token()?;
        let url = self.sobject_url(token, object_type, Some(id))?;
        Ok(authorized(HttpMethod::Patch, url, token, Some(to_json(fields)?)))
    }

    pub fn build_delete_record(&self, object_type: &str, id: &str) -> Result<HttpRequest, Error> {
        let token = self.token()?;
        let url = self.sobject_url(token, object_type, Some(id))?;
        Ok(authorized(HttpMethod::Delete, url, token, None))
    }

    pub fn build_search(&self, soql: &str) -> Result<HttpRequest, Error> {
        let token = self.token()?;
        let mut url = endpoint(&token.api_url, &["services", "data", self.api_version.as_str(), "query"])?;
        url.query_pairs_mut().append_pair("q", soql);
        Ok(authorized(HttpMethod::Get, url, token, None))
    }

    pub fn build_authorize_confirm(&self, auth_code: &str, redirect_url: &str) -> Result<HttpRequest, Error> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", auth_code),
            ("client_id", self.config.client_id()),
            ("client_secret", self.config.client_secret()),
            ("redirect_uri", redirect_url),
        ])
    }

    pub fn build_refresh_token(&self) -> Result<HttpRequest, Error> {
        let token = self.token()?;
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", token.refresh_token.as_str()),
            ("client_id", self.config.client_id()),
            ("client_secret", self.config.client_secret()),
        ])
    }

    fn token_request(&self, params: &[(&str, &str)]) -> Result<HttpRequest, Error> {
        let url = endpoint(self.config.login_url(), &TOKEN_PATH)?;
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![("content-type".to_string(), FORM_CONTENT_TYPE.to_string())],
            body: Some(body),
        })
    }

    fn token(&self) -> Result<&AccessToken, Error> {
        self.token.as_ref().ok_or(Error::MissingAccessToken)
    }

    /// `.../sobjects/{object_type}[/{id}]`. Blank segments are rejected: a
    /// missing id would otherwise address the type's describe resource.
    fn sobject_url(&self, token: &AccessToken, object_type: &str, id: Option<&str>) -> Result<Url, Error> {
        require_non_blank("object_type", object_type)?;
        if let Some(id) = id {
            require_non_blank("id", id)?;
        }
        let mut url = endpoint(&token.api_url, &["services", "data", self.api_version.as_str(), "sobjects"])?;
        url.path_segments_mut()
            .map_err(|_| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .push(object_type)
            .extend(id);
        Ok(url)
    }

    // -----------------------------------------------------------------------
    // Response parsers
    // -----------------------------------------------------------------------

    pub fn parse_get_record(&self, response: HttpResponse) -> Result<Value, Error> {
        check_status(&response)?;
        from_json(&response.body)
    }

    pub fn parse_create_record(&self, response: HttpResponse) -> Result<String, Error> {
        check_status(&response)?;
        let created: CreateResult = from_json(&response.body)?;
        Ok(created.id)
    }

    /// Any 2xx counts as success; the body is ignored.
    pub fn parse_update_record(&self, response: HttpResponse) -> Result<bool, Error> {
        check_status(&response)?;
        Ok(true)
    }

    pub fn parse_delete_record(&self, response: HttpResponse) -> Result<bool, Error> {
        check_status(&response)?;
        Ok(true)
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<QueryResult, Error> {
        check_status(&response)?;
        from_json(&response.body)
    }

    pub fn parse_authorize_confirm(&self, response: HttpResponse) -> Result<AccessToken, Error> {
        check_status(&response)?;
        let token: TokenResponse = from_json(&response.body)?;
        AccessToken::from_token_response(token)
    }

    /// Apply a refresh response to the held token.
    pub fn parse_refresh_token(&mut self, response: HttpResponse) -> Result<(), Error> {
        check_status(&response)?;
        let refreshed: TokenResponse = from_json(&response.body)?;
        let token = self.token.as_mut().ok_or(Error::MissingAccessToken)?;
        token.update_from_refresh(refreshed);
        Ok(())
    }
}

/// `base` with `segments` appended to its path. A trailing slash on `base`
/// does not produce an empty segment.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, Error> {
    let mut url = Url::parse(base)?;
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn require_non_blank(name: &'static str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{name} must not be empty")));
    }
    Ok(())
}

fn authorized(method: HttpMethod, url: Url, token: &AccessToken, body: Option<String>) -> HttpRequest {
    let mut headers = vec![("authorization".to_string(), token.bearer())];
    if body.is_some() {
        headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
    }
    HttpRequest {
        method,
        url: url.into(),
        headers,
        body,
    }
}

/// Map any non-2xx status to a `RequestError` decoded from the body.
fn check_status(response: &HttpResponse) -> Result<(), Error> {
    if response.is_success() {
        return Ok(());
    }
    let err = RequestError::from_response(response.status, &response.body);
    warn!(status = err.status, error_code = %err.error_code, "request failed");
    Err(Error::Request(err))
}

fn to_json<B: Serialize + ?Sized>(value: &B) -> Result<String, Error> {
    serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))
}

fn from_json<D: serde::de::DeserializeOwned>(body: &str) -> Result<D, Error> {
    serde_json::from_str(body).map_err(|e| Error::Deserialization(e.to_string()))
}
