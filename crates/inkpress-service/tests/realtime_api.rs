use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use inkpress_service::{AppState, DefaultAppState, create_app};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;

use common::{TEST_API_KEY, create_test_state};

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("apikey", TEST_API_KEY);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?,
        None => builder.body(Body::empty())?,
    };
    Ok(request)
}

async fn call_json(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

/// Signs up a user and creates one post; returns (token, post_id).
async fn seed(app: &Router) -> Result<(String, i64)> {
    let (status, body) = call_json(
        app,
        request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({ "email": "live@example.com", "password": "streaming" })),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["session"]["access_token"]
        .as_str()
        .context("missing token")?
        .to_string();

    let (status, post) = call_json(
        app,
        request(
            Method::POST,
            "/api/v1/posts",
            Some(&token),
            Some(json!({ "title": "Live", "content": "c" })),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok((token, post["id"].as_i64().context("missing id")?))
}

/// Reads body frames until one carries a `comment` event, returning its data line.
async fn next_comment_event(body: &mut Body) -> Result<Value> {
    loop {
        let frame = body
            .frame()
            .await
            .context("stream ended")?
            .map_err(|err| anyhow::anyhow!(err))?;
        let Ok(data) = frame.into_data() else {
            continue;
        };
        let text = String::from_utf8(data.to_vec())?;
        if !text.contains("event: comment") {
            continue;
        }
        let line = text
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .context("event without data")?;
        return Ok(serde_json::from_str(line)?);
    }
}

fn app_with_state() -> (Router, DefaultAppState) {
    let (state, _db) = create_test_state();
    (create_app(state.clone()), state)
}

#[tokio::test]
async fn test_new_comment_is_pushed_to_stream() -> Result<()> {
    let (app, _state) = app_with_state();
    let (token, post_id) = seed(&app).await?;

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/posts/{post_id}/comments/stream"),
            None,
            None,
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    let mut body = response.into_body();

    let (status, created) = call_json(
        &app,
        request(
            Method::POST,
            &format!("/api/v1/posts/{post_id}/comments"),
            Some(&token),
            Some(json!({ "content": "pushed" })),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let event = tokio::time::timeout(Duration::from_secs(2), next_comment_event(&mut body))
        .await
        .context("no event within timeout")??;
    assert_eq!(event["id"], created["id"]);
    assert_eq!(event["content"], "pushed");
    Ok(())
}

#[tokio::test]
async fn test_stream_ignores_other_posts() -> Result<()> {
    let (app, _state) = app_with_state();
    let (token, post_id) = seed(&app).await?;

    let (_, other) = call_json(
        &app,
        request(
            Method::POST,
            "/api/v1/posts",
            Some(&token),
            Some(json!({ "title": "Other", "content": "c" })),
        )?,
    )
    .await?;

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/posts/{post_id}/comments/stream"),
            None,
            None,
        )?)
        .await?;
    let mut body = response.into_body();

    for (target, content) in [(other["id"].as_i64().unwrap_or_default(), "elsewhere"), (post_id, "here")] {
        let (status, _) = call_json(
            &app,
            request(
                Method::POST,
                &format!("/api/v1/posts/{target}/comments"),
                Some(&token),
                Some(json!({ "content": content })),
            )?,
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED);
    }

    let event = tokio::time::timeout(Duration::from_secs(2), next_comment_event(&mut body))
        .await
        .context("no event within timeout")??;
    assert_eq!(event["content"], "here");
    Ok(())
}

#[tokio::test]
async fn test_stream_ends_when_shutdown_starts() -> Result<()> {
    let (app, state) = app_with_state();
    let (_token, post_id) = seed(&app).await?;

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/v1/posts/{post_id}/comments/stream"),
            None,
            None,
        )?)
        .await?;
    let mut body = response.into_body();

    state.shutdown().start_shutdown();

    let ended = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(frame) = body.frame().await {
            frame?;
        }
        Ok::<_, axum::Error>(())
    })
    .await;
    assert!(matches!(ended, Ok(Ok(()))));
    Ok(())
}

#[tokio::test]
async fn test_stream_for_missing_post_is_not_found() -> Result<()> {
    let (app, _state) = app_with_state();

    let response = app
        .oneshot(request(
            Method::GET,
            "/api/v1/posts/77/comments/stream",
            None,
            None,
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
