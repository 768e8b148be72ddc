use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    tm_api::create_router(tm_api::test_state("test-secret"))
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: Router, uri: &str, body: &str, bearer: Option<&str>) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }

    app.oneshot(builder.body(Body::from(body.to_owned())).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn livez_answers_ok_without_credentials() {
    let response = get(app(), "/livez").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn creating_an_assignment_requires_a_token() {
    let response = post_json(
        app(),
        "/api/assignments",
        r#"{"role_id":1,"project_id":1,"developer_id":2}"#,
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unauthorized_body_carries_code_and_request_id() {
    let response = post_json(app(), "/api/assignments", "{}", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["code"], "unauthorized");
    assert!(json["request_id"].is_string());
}

#[tokio::test]
async fn candidate_and_developer_reads_require_auth() {
    for uri in [
        "/api/projects/1/candidates?role_id=2",
        "/api/developers/eligible",
        "/api/developers/7/history",
        "/api/assignments/pending",
    ] {
        let response = get(app(), uri).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "uri: {uri}");
    }
}

#[tokio::test]
async fn garbage_bearer_tokens_are_rejected() {
    let response = post_json(app(), "/api/assignments/9/approve", "", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
