use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, CLIENT_ID, CLIENT_SECRET, REFRESH_TOKEN, VALID_CODE};
use serde_json::Value;
use tower::ServiceExt;

const INSTANCE: &str = "http://instance.test";

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri("/services/oauth2/token")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body.to_string())
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str, body: Option<&str>) -> Request<String> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    match body {
        Some(body) => builder
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .unwrap(),
        None => builder.body(String::new()).unwrap(),
    }
}

fn code_grant(code: &str) -> String {
    format!(
        "grant_type=authorization_code&code={code}&client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}&redirect_uri=http%3A%2F%2Flocalhost%2Fcb"
    )
}

async fn login(app: &Router) -> String {
    let resp = app
        .clone()
        .oneshot(form_request(&code_grant(VALID_CODE)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await["access_token"].as_str().unwrap().to_string()
}

// --- token ---

#[tokio::test]
async fn code_exchange_returns_token_and_instance_url() {
    let app = app(INSTANCE);
    let resp = app.oneshot(form_request(&code_grant(VALID_CODE))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let token = body_json(resp).await;
    assert_eq!(token["instance_url"], INSTANCE);
    assert_eq!(token["refresh_token"], REFRESH_TOKEN);
    assert_eq!(token["token_type"], "Bearer");
    assert!(token["access_token"].as_str().unwrap().starts_with("00Dmock!"));
}

#[tokio::test]
async fn bad_code_returns_invalid_grant() {
    let app = app(INSTANCE);
    let resp = app.oneshot(form_request(&code_grant("nope"))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn wrong_client_secret_returns_invalid_client() {
    let app = app(INSTANCE);
    let resp = app
        .oneshot(form_request(&format!(
            "grant_type=refresh_token&refresh_token={REFRESH_TOKEN}&client_id={CLIENT_ID}&client_secret=wrong"
        )))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "invalid_client");
}

#[tokio::test]
async fn refresh_replaces_access_token_and_omits_refresh_token() {
    let app = app(INSTANCE);
    let first = login(&app).await;

    let resp = app
        .clone()
        .oneshot(form_request(&format!(
            "grant_type=refresh_token&refresh_token={REFRESH_TOKEN}&client_id={CLIENT_ID}&client_secret={CLIENT_SECRET}"
        )))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body.get("refresh_token").is_none());
    let second = body["access_token"].as_str().unwrap().to_string();
    assert_ne!(first, second);

    // The superseded token no longer works.
    let resp = app
        .oneshot(authed("GET", "/services/data/v59.0/query?q=SELECT+Id+FROM+Lead", &first, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- auth on data routes ---

#[tokio::test]
async fn data_routes_require_bearer_token() {
    let app = app(INSTANCE);
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/services/data/v59.0/sobjects/Lead/001")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body[0]["errorCode"], "INVALID_SESSION_ID");
}

// --- records ---

#[tokio::test]
async fn get_unknown_record_returns_not_found() {
    let app = app(INSTANCE);
    let token = login(&app).await;
    let resp = app
        .oneshot(authed("GET", "/services/data/v59.0/sobjects/Lead/001missing", &token, None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await[0]["errorCode"], "NOT_FOUND");
}

#[tokio::test]
async fn malformed_query_returns_400() {
    let app = app(INSTANCE);
    let token = login(&app).await;
    let resp = app
        .oneshot(authed("GET", "/services/data/v59.0/query?q=DROP+TABLE+Lead", &token, None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await[0]["errorCode"], "MALFORMED_QUERY");
}

// --- full record lifecycle ---

#[tokio::test]
async fn record_lifecycle() {
    let app = app(INSTANCE);
    let token = login(&app).await;

    // create
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/services/data/v59.0/sobjects/Lead",
            &token,
            Some(r#"{"LastName":"Hopper","Company":"Navy"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created = body_json(resp).await;
    assert_eq!(created["success"], true);
    let id = created["id"].as_str().unwrap().to_string();

    // get with field selection
    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/services/data/v59.0/sobjects/Lead/{id}?fields=LastName,Title"),
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let record = body_json(resp).await;
    assert_eq!(record["Id"], id.as_str());
    assert_eq!(record["LastName"], "Hopper");
    assert_eq!(record["Title"], Value::Null);
    assert!(record.get("Company").is_none());
    assert_eq!(record["attributes"]["type"], "Lead");

    // update
    let resp = app
        .clone()
        .oneshot(authed(
            "PATCH",
            &format!("/services/data/v59.0/sobjects/Lead/{id}"),
            &token,
            Some(r#"{"Company":"Yale"}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // query sees the update
    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/services/data/v59.0/query?q=SELECT+LastName%2C+Company+FROM+Lead+LIMIT+10",
            &token,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page = body_json(resp).await;
    assert_eq!(page["totalSize"], 1);
    assert_eq!(page["done"], true);
    assert_eq!(page["records"][0]["Company"], "Yale");

    // delete
    let resp = app
        .clone()
        .oneshot(authed("DELETE", &format!("/services/data/v59.0/sobjects/Lead/{id}"), &token, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // delete again: 404
    let resp = app
        .oneshot(authed("DELETE", &format!("/services/data/v59.0/sobjects/Lead/{id}"), &token, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
