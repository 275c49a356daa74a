use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use inkpress_cli::client::{ApiClient, ClientError};
use inkpress_cli::types::{NewPost, SearchFilters, SearchRequest, VoteDirection};
use inkpress_service::config::AuthConfig;
use inkpress_service::db::{establish_connection, shared};
use inkpress_service::{DefaultAppState, create_app};
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

const API_KEY: &str = "cli-test-key";

/// Serves a fresh in-memory service on an ephemeral port and returns its base URL.
async fn spawn_service() -> Result<Url> {
    let connection = establish_connection(":memory:")?;
    let state = DefaultAppState::new(
        shared(connection),
        API_KEY,
        AuthConfig {
            password_cost: 4,
            ..AuthConfig::default()
        },
    );

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move { axum::serve(listener, create_app(state)).await });

    Ok(Url::parse(&format!("http://{addr}"))?)
}

async fn anonymous() -> Result<ApiClient> {
    Ok(ApiClient::new(spawn_service().await?, API_KEY))
}

async fn signed_in(client: &ApiClient, email: &str) -> Result<ApiClient> {
    let response = client.sign_up(email, "correct horse").await?;
    let session = response.session.context("sign-up returned no session")?;
    Ok(client.clone().with_token(Some(session.access_token)))
}

fn post(title: &str, content: &str) -> NewPost {
    NewPost {
        title: title.to_string(),
        content: content.to_string(),
        ..NewPost::default()
    }
}

fn api_error(err: ClientError) -> (StatusCode, String) {
    match err {
        ClientError::Api { status, message } => (status, message),
        other => panic!("expected an API error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_bodies_become_api_errors() -> Result<()> {
    let base = spawn_service().await?;
    let client = ApiClient::new(base.clone(), API_KEY);

    let wrong_key = ApiClient::new(base, "not-the-key");
    let (status, message) = api_error(wrong_key.list_posts(1, 10, None).await.unwrap_err());
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message, "Invalid API key");

    let (status, message) = api_error(client.get_post(999).await.unwrap_err());
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message, "Not found");

    let (status, message) = api_error(client.create_post(&post("", "body")).await.unwrap_err());
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message, "title is required");

    client.subscribe("news@example.com").await?;
    let (status, message) = api_error(client.subscribe("news@example.com").await.unwrap_err());
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(message, "Email is already subscribed");

    let (status, message) = api_error(client.toggle_like(1).await.unwrap_err());
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(message, "You must be logged in");
    Ok(())
}

#[tokio::test]
async fn test_signed_in_round_trip() -> Result<()> {
    let client = anonymous().await?;
    let author = signed_in(&client, "writer@example.com").await?;

    let me = author.current_user().await?;
    assert_eq!(me.email, "writer@example.com");

    let created = author
        .create_post(&NewPost {
            excerpt: Some("Short".to_string()),
            ..post("Hello", "first words")
        })
        .await?;
    assert_eq!(created.author, "writer@example.com");

    assert_eq!(author.increment_views(created.id).await?, 1);
    assert_eq!(author.increment_views(created.id).await?, 2);

    let like = author.toggle_like(created.id).await?;
    assert!(like.liked);
    assert_eq!(like.likes, 1);

    let comment = author.add_comment(created.id, "nice").await?;
    let vote = author.vote(comment.id, VoteDirection::Down).await?;
    assert_eq!((vote.vote, vote.votes), (-1, -1));

    let bookmarked = author.bookmark(created.id).await?;
    assert!(bookmarked.bookmarked);
    assert_eq!(author.bookmarks(1, 10).await?.total, 1);

    let detail = author.get_post(created.id).await?;
    assert_eq!(detail.description, "Short");
    assert_eq!(detail.post.views, 2);

    author.sign_out().await?;
    let (status, _) = api_error(author.current_user().await.unwrap_err());
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_search_encodes_query_and_filters() -> Result<()> {
    let client = anonymous().await?;
    let author = signed_in(&client, "writer@example.com").await?;
    let category = author.create_category("Systems Programming").await?;

    let matching = author
        .create_post(&NewPost {
            category_id: Some(category.id),
            ..post("Rust & Axum: 100% async", "handlers")
        })
        .await?;
    author.create_post(&post("Rust & Axum: 100% async", "uncategorised")).await?;
    author
        .create_post(&NewPost {
            category_id: Some(category.id),
            ..post("Rust and Axum", "no ampersand")
        })
        .await?;

    let results = client
        .search(&SearchRequest {
            query: "rust & axum: 100%".to_string(),
            filters: SearchFilters {
                category: Some(category.id),
                author: Some("writer@example.com".to_string()),
                ..SearchFilters::default()
            },
            page: 1,
            limit: 10,
        })
        .await?;
    assert_eq!(results.total, 1);
    assert_eq!(results.items[0].id, matching.id);

    let everything = client
        .search(&SearchRequest {
            query: "   ".to_string(),
            filters: SearchFilters::default(),
            page: 2,
            limit: 2,
        })
        .await?;
    assert_eq!(everything.total, 3);
    assert_eq!(everything.page, 2);
    assert_eq!(everything.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_comment_stream_delivers_new_comments() -> Result<()> {
    let client = anonymous().await?;
    let author = signed_in(&client, "writer@example.com").await?;
    let post = author.create_post(&post("Live", "body")).await?;

    let stream = client.comment_stream(post.id).await?;
    tokio::pin!(stream);

    let written = author.add_comment(post.id, "naïve café").await?;
    let received = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .context("no comment within timeout")?
        .context("stream ended")??;
    assert_eq!(received, written);
    assert_eq!(received.content, "naïve café");
    Ok(())
}

#[tokio::test]
async fn test_comment_stream_decodes_characters_split_between_chunks() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let event = concat!(
        "event: comment\n",
        "data: {\"id\":1,\"post_id\":3,\"parent_id\":null,\"user_id\":null,",
        "\"author\":\"reader\",\"content\":\"café\",",
        "\"created_at\":\"2024-05-01T09:00:00\",\"votes\":0}\n\n",
    )
    .as_bytes()
    .to_vec();
    // Split inside the two-byte `é`.
    let split = event
        .iter()
        .position(|&b| b == 0xC3)
        .context("event has no multi-byte character")?
        + 1;

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await?;
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ntransfer-encoding: chunked\r\n\r\n",
            )
            .await?;
        for part in [&event[..split], &event[split..]] {
            socket
                .write_all(format!("{:x}\r\n", part.len()).as_bytes())
                .await?;
            socket.write_all(part).await?;
            socket.write_all(b"\r\n").await?;
            socket.flush().await?;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        socket.write_all(b"0\r\n\r\n").await?;
        Ok::<_, std::io::Error>(())
    });

    let client = ApiClient::new(Url::parse(&format!("http://{addr}"))?, API_KEY);
    let stream = client.comment_stream(3).await?;
    tokio::pin!(stream);

    let comment = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .context("no comment within timeout")?
        .context("stream ended")??;
    assert_eq!(comment.content, "café");
    assert!(stream.next().await.is_none());
    Ok(())
}
