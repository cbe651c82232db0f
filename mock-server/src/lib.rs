//! In-memory stand-in for the CRM's OAuth and REST endpoints.
//!
//! Accepts one hard-coded connected app and one authorization code, issues
//! bearer tokens, and stores sobject records per type in memory. Only the
//! most recently issued access token is accepted on `/services/data` routes.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const CLIENT_ID: &str = "mock-client-id";
pub const CLIENT_SECRET: &str = "mock-client-secret";
/// The only authorization code the token endpoint accepts.
pub const VALID_CODE: &str = "valid-code";
pub const REFRESH_TOKEN: &str = "mock-refresh-token";

#[derive(Default)]
struct Org {
    access_token: Option<String>,
    records: HashMap<String, HashMap<String, Map<String, Value>>>,
}

#[derive(Clone)]
pub struct AppState {
    instance_url: Arc<str>,
    org: Arc<RwLock<Org>>,
}

type ApiError = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct TokenForm {
    pub grant_type: String,
    pub code: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

#[derive(Deserialize)]
pub struct FieldsParam {
    pub fields: Option<String>,
}

#[derive(Deserialize)]
pub struct QueryParam {
    pub q: String,
}

/// Router whose token responses point clients at `instance_url`.
pub fn app(instance_url: impl Into<String>) -> Router {
    let instance_url: String = instance_url.into();
    let state = AppState {
        instance_url: instance_url.trim_end_matches('/').into(),
        org: Arc::new(RwLock::new(Org::default())),
    };
    Router::new()
        .route("/services/oauth2/token", post(issue_token))
        .route("/services/data/{version}/sobjects/{object_type}", post(create_record))
        .route(
            "/services/data/{version}/sobjects/{object_type}/{id}",
            get(get_record).patch(update_record).delete(delete_record),
        )
        .route("/services/data/{version}/query", get(query))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    axum::serve(listener, app(format!("http://{addr}"))).await
}

fn api_error(status: StatusCode, error_code: &str, message: &str) -> ApiError {
    (status, Json(json!([{ "errorCode": error_code, "message": message }])))
}

fn oauth_error(error: &str, description: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": error, "error_description": description })),
    )
}

fn not_found() -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        "NOT_FOUND",
        "The requested resource does not exist",
    )
}

fn check_bearer(headers: &HeaderMap, org: &Org) -> Result<(), ApiError> {
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match (presented, org.access_token.as_deref()) {
        (Some(presented), Some(current)) if presented == current => Ok(()),
        _ => Err(api_error(
            StatusCode::UNAUTHORIZED,
            "INVALID_SESSION_ID",
            "Session expired or invalid",
        )),
    }
}

fn new_record_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("001{}", &hex[..15])
}

fn now_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string()
}

async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<Value>, ApiError> {
    if form.client_id.as_deref() != Some(CLIENT_ID)
        || form.client_secret.as_deref() != Some(CLIENT_SECRET)
    {
        return Err(oauth_error("invalid_client", "invalid client credentials"));
    }

    let include_refresh = match form.grant_type.as_str() {
        "authorization_code" => {
            if form.code.as_deref() != Some(VALID_CODE) {
                return Err(oauth_error("invalid_grant", "authentication failure"));
            }
            if form.redirect_uri.is_none() {
                return Err(oauth_error("redirect_uri_mismatch", "redirect_uri must match configuration"));
            }
            true
        }
        "refresh_token" => {
            if form.refresh_token.as_deref() != Some(REFRESH_TOKEN) {
                return Err(oauth_error("invalid_grant", "expired access/refresh token"));
            }
            false
        }
        other => {
            debug!(grant_type = other, "rejecting grant type");
            return Err(oauth_error("unsupported_grant_type", "grant type not supported"));
        }
    };

    let access_token = format!("00Dmock!{}", Uuid::new_v4().simple());
    state.org.write().await.access_token = Some(access_token.clone());
    info!(grant_type = %form.grant_type, "issued access token");

    let mut body = json!({
        "access_token": access_token,
        "instance_url": &*state.instance_url,
        "id": format!("{}/id/00Dmock/005mock", state.instance_url),
        "token_type": "Bearer",
        "issued_at": now_millis(),
        "signature": "mock-signature",
        "scope": "api refresh_token",
    });
    if include_refresh {
        body["refresh_token"] = json!(REFRESH_TOKEN);
    }
    Ok(Json(body))
}

async fn create_record(
    State(state): State<AppState>,
    Path((_version, object_type)): Path<(String, String)>,
    headers: HeaderMap,
    Json(mut fields): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut org = state.org.write().await;
    check_bearer(&headers, &org)?;

    let id = new_record_id();
    fields.insert("Id".to_string(), json!(id));
    org.records
        .entry(object_type)
        .or_default()
        .insert(id.clone(), fields);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "success": true, "errors": [] })),
    ))
}

async fn get_record(
    State(state): State<AppState>,
    Path((version, object_type, id)): Path<(String, String, String)>,
    Query(params): Query<FieldsParam>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let org = state.org.read().await;
    check_bearer(&headers, &org)?;

    let record = org
        .records
        .get(&object_type)
        .and_then(|records| records.get(&id))
        .ok_or_else(not_found)?;

    let mut out = Map::new();
    out.insert(
        "attributes".to_string(),
        json!({
            "type": object_type,
            "url": format!("/services/data/{version}/sobjects/{object_type}/{id}"),
        }),
    );
    match params.fields.as_deref().filter(|f| !f.is_empty()) {
        Some(fields) => {
            out.insert("Id".to_string(), json!(id));
            for field in fields.split(',').map(str::trim) {
                out.insert(
                    field.to_string(),
                    record.get(field).cloned().unwrap_or(Value::Null),
                );
            }
        }
        None => out.extend(record.clone()),
    }
    Ok(Json(Value::Object(out)))
}

async fn update_record(
    State(state): State<AppState>,
    Path((_version, object_type, id)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(fields): Json<Map<String, Value>>,
) -> Result<StatusCode, ApiError> {
    let mut org = state.org.write().await;
    check_bearer(&headers, &org)?;

    let record = org
        .records
        .get_mut(&object_type)
        .and_then(|records| records.get_mut(&id))
        .ok_or_else(not_found)?;
    for (key, value) in fields {
        if key != "Id" {
            record.insert(key, value);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_record(
    State(state): State<AppState>,
    Path((_version, object_type, id)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let mut org = state.org.write().await;
    check_bearer(&headers, &org)?;

    org.records
        .get_mut(&object_type)
        .and_then(|records| records.remove(&id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

/// The subset of SOQL the mock understands: `SELECT a, b FROM Type [LIMIT n]`.
#[derive(Debug, PartialEq, Eq)]
pub struct SimpleQuery {
    pub fields: Vec<String>,
    pub object_type: String,
    pub limit: Option<usize>,
}

pub fn parse_soql(soql: &str) -> Option<SimpleQuery> {
    let tokens: Vec<&str> = soql.split_whitespace().collect();
    if !tokens.first()?.eq_ignore_ascii_case("SELECT") {
        return None;
    }
    let from = tokens.iter().position(|t| t.eq_ignore_ascii_case("FROM"))?;
    let fields: Vec<String> = tokens[1..from]
        .join(" ")
        .split(',')
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.is_empty() {
        return None;
    }
    let object_type = tokens.get(from + 1)?.to_string();
    let limit = match tokens.get(from + 2) {
        Some(t) if t.eq_ignore_ascii_case("LIMIT") => Some(tokens.get(from + 3)?.parse().ok()?),
        Some(_) => return None,
        None => None,
    };
    Some(SimpleQuery {
        fields,
        object_type,
        limit,
    })
}

async fn query(
    State(state): State<AppState>,
    Query(params): Query<QueryParam>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let org = state.org.read().await;
    check_bearer(&headers, &org)?;

    let parsed = parse_soql(&params.q).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "MALFORMED_QUERY",
            "unexpected token in query",
        )
    })?;

    let mut ids: Vec<&String> = org
        .records
        .get(&parsed.object_type)
        .map(|records| records.keys().collect())
        .unwrap_or_default();
    ids.sort();

    let records: Vec<Value> = ids
        .into_iter()
        .take(parsed.limit.unwrap_or(usize::MAX))
        .filter_map(|id| org.records.get(&parsed.object_type)?.get(id))
        .map(|record| {
            let mut out = Map::new();
            out.insert("attributes".to_string(), json!({ "type": parsed.object_type }));
            for field in &parsed.fields {
                out.insert(field.clone(), record.get(field).cloned().unwrap_or(Value::Null));
            }
            Value::Object(out)
        })
        .collect();

    Ok(Json(json!({
        "totalSize": records.len(),
        "done": true,
        "records": records,
    })))
}
