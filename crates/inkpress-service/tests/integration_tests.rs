use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::{Service, ServiceExt};

mod common;

mod helpers {
    use super::*;
    use crate::common::{TEST_API_KEY, create_test_state};
    use inkpress_service::create_app;

    pub fn create_test_app() -> Router {
        let (state, _db) = create_test_state();
        create_app(state)
    }

    pub fn api_request(method: Method, uri: &str, body: Option<Value>) -> Result<Request<Body>> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("apikey", TEST_API_KEY);

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
            None => builder.body(Body::empty())?,
        };
        Ok(request)
    }

    pub async fn make_request(
        app: &mut Router,
        request: Request<Body>,
    ) -> Result<(StatusCode, Value)> {
        let response = ServiceExt::<Request<Body>>::ready(app)
            .await?
            .call(request)
            .await?;

        let status = response.status();
        let body_bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let body_str = String::from_utf8(body_bytes.to_vec())?;

        let json_response: Value = if body_str.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&body_str).unwrap_or(json!(body_str))
        };

        Ok((status, json_response))
    }
}

#[tokio::test]
async fn test_health_endpoint_needs_no_api_key() -> Result<()> {
    let mut app = helpers::create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())?;

    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn test_missing_api_key_is_rejected() -> Result<()> {
    let mut app = helpers::create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/posts")
        .body(Body::empty())?;

    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["error"], "Invalid API key");
    Ok(())
}

#[tokio::test]
async fn test_wrong_api_key_is_rejected() -> Result<()> {
    let mut app = helpers::create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/posts")
        .header("apikey", "not-the-key")
        .body(Body::empty())?;

    let (status, _) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_empty_listing() -> Result<()> {
    let mut app = helpers::create_test_app();

    let request = helpers::api_request(Method::GET, "/api/v1/posts", None)?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["items"], json!([]));
    assert_eq!(response["total"], 0);
    assert_eq!(response["page"], 1);
    assert_eq!(response["limit"], 10);
    Ok(())
}

#[tokio::test]
async fn test_sign_up_sign_in_sign_out_flow() -> Result<()> {
    let mut app = helpers::create_test_app();
    let credentials = json!({ "email": "Writer@Example.com", "password": "secret-pass" });

    let request = helpers::api_request(Method::POST, "/api/v1/auth/signup", Some(credentials))?;
    let (status, response) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["user"]["email"], "writer@example.com");

    let request = helpers::api_request(
        Method::POST,
        "/api/v1/auth/signin",
        Some(json!({ "email": "writer@example.com", "password": "secret-pass" })),
    )?;
    let (status, session) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::OK);
    let token = session["access_token"].as_str().unwrap().to_string();

    let mut request = helpers::api_request(Method::GET, "/api/v1/auth/user", None)?;
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse()?);
    let (status, user) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["email"], "writer@example.com");

    let mut request = helpers::api_request(Method::POST, "/api/v1/auth/signout", None)?;
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse()?);
    let (status, _) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let mut request = helpers::api_request(Method::GET, "/api/v1/auth/user", None)?;
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse()?);
    let (status, response) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["error"], "You must be logged in");
    Ok(())
}

#[tokio::test]
async fn test_sign_in_with_wrong_password() -> Result<()> {
    let mut app = helpers::create_test_app();

    let request = helpers::api_request(
        Method::POST,
        "/api/v1/auth/signup",
        Some(json!({ "email": "a@example.com", "password": "correct-horse" })),
    )?;
    helpers::make_request(&mut app, request).await?;

    let request = helpers::api_request(
        Method::POST,
        "/api/v1/auth/signin",
        Some(json!({ "email": "a@example.com", "password": "wrong-horse" })),
    )?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["error"], "Invalid login credentials");
    Ok(())
}

#[tokio::test]
async fn test_duplicate_sign_up_conflicts() -> Result<()> {
    let mut app = helpers::create_test_app();
    let credentials = json!({ "email": "dup@example.com", "password": "long-enough" });

    let request = helpers::api_request(Method::POST, "/api/v1/auth/signup", Some(credentials.clone()))?;
    let (status, _) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::CREATED);

    let request = helpers::api_request(Method::POST, "/api/v1/auth/signup", Some(credentials))?;
    let (status, response) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["error"], "User already registered");
    Ok(())
}

#[tokio::test]
async fn test_sign_up_validation() -> Result<()> {
    let mut app = helpers::create_test_app();

    let request = helpers::api_request(
        Method::POST,
        "/api/v1/auth/signup",
        Some(json!({ "email": "not-an-email", "password": "long-enough" })),
    )?;
    let (status, _) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = helpers::api_request(
        Method::POST,
        "/api/v1/auth/signup",
        Some(json!({ "email": "ok@example.com", "password": "123" })),
    )?;
    let (status, response) = helpers::make_request(&mut app, request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"].as_str().unwrap().contains("at least 6"));
    Ok(())
}

#[tokio::test]
async fn test_auth_required_operations_reject_anonymous() -> Result<()> {
    let mut app = helpers::create_test_app();

    for (method, uri) in [
        (Method::POST, "/api/v1/posts/1/like"),
        (Method::POST, "/api/v1/posts/1/comments"),
        (Method::PUT, "/api/v1/comments/1/vote"),
        (Method::PUT, "/api/v1/posts/1/bookmark"),
        (Method::GET, "/api/v1/bookmarks"),
        (Method::GET, "/api/v1/dashboard/analytics"),
        (Method::PUT, "/api/v1/profile"),
    ] {
        let request = helpers::api_request(method.clone(), uri, Some(json!({})))?;
        let (status, _) = helpers::make_request(&mut app, request).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
    Ok(())
}

#[tokio::test]
async fn test_unknown_post_is_not_found() -> Result<()> {
    let mut app = helpers::create_test_app();

    let request = helpers::api_request(Method::GET, "/api/v1/posts/999", None)?;
    let (status, response) = helpers::make_request(&mut app, request).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["error"], "Not found");
    Ok(())
}

#[tokio::test]
async fn test_invalid_pagination_is_bad_request() -> Result<()> {
    let mut app = helpers::create_test_app();

    for uri in [
        "/api/v1/posts?page=0",
        "/api/v1/posts?limit=0",
        "/api/v1/posts?limit=101",
        "/api/v1/posts?page=abc",
    ] {
        let request = helpers::api_request(Method::GET, uri, None)?;
        let (status, _) = helpers::make_request(&mut app, request).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
    Ok(())
}
