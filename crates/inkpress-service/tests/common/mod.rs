#![allow(dead_code)]

use inkpress_service::config::AuthConfig;
use inkpress_service::db::{SharedConnection, establish_connection, shared};
use inkpress_service::DefaultAppState;

pub const TEST_API_KEY: &str = "test-public-key";

pub fn establish_test_connection() -> SharedConnection {
    shared(establish_connection(":memory:").expect("Failed to create in-memory database"))
}

/// Minimum bcrypt cost keeps sign-up fast in tests.
pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        password_cost: 4,
        ..AuthConfig::default()
    }
}

pub fn create_test_state() -> (DefaultAppState, SharedConnection) {
    let db = establish_test_connection();
    let state = DefaultAppState::new(db.clone(), TEST_API_KEY, test_auth_config());
    (state, db)
}

pub mod server_utils {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, header};
    use axum_test::{TestRequest, TestServer};
    use inkpress_service::create_app;
    use serde_json::{Value, json};

    pub fn create_test_server() -> (TestServer, SharedConnection) {
        let (state, db) = create_test_state();
        let mut server = TestServer::new(create_app(state)).unwrap();
        server.add_header(
            HeaderName::from_static("apikey"),
            HeaderValue::from_static(TEST_API_KEY),
        );
        (server, db)
    }

    pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
        request.add_header(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        )
    }

    pub struct TestUser {
        pub id: String,
        pub email: String,
        pub token: String,
    }

    pub async fn sign_up(server: &TestServer, email: &str) -> TestUser {
        let response = server
            .post("/api/v1/auth/signup")
            .json(&json!({ "email": email, "password": "hunter22" }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);

        let body: Value = response.json();
        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            email: body["user"]["email"].as_str().unwrap().to_string(),
            token: body["session"]["access_token"]
                .as_str()
                .unwrap()
                .to_string(),
        }
    }

    pub async fn create_post(server: &TestServer, user: &TestUser, body: Value) -> Value {
        let response = bearer(server.post("/api/v1/posts"), &user.token)
            .json(&body)
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        response.json()
    }

    pub async fn create_category(server: &TestServer, user: &TestUser, name: &str) -> i32 {
        let response = bearer(server.post("/api/v1/categories"), &user.token)
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_i64().unwrap() as i32
    }

    pub async fn create_tag(server: &TestServer, user: &TestUser, name: &str) -> i32 {
        let response = bearer(server.post("/api/v1/tags"), &user.token)
            .json(&json!({ "name": name }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        body["id"].as_i64().unwrap() as i32
    }
}

pub mod test_utils {
    use chrono::NaiveDateTime;
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;
    use inkpress_service::schema::{bookmarks, comment_votes, post_tags, posts};

    pub fn count_posts(conn: &mut SqliteConnection) -> i64 {
        posts::table.count().get_result(conn).unwrap()
    }

    pub fn count_post_tags(conn: &mut SqliteConnection, post_id: i32) -> i64 {
        post_tags::table
            .filter(post_tags::post_id.eq(post_id))
            .count()
            .get_result(conn)
            .unwrap()
    }

    pub fn vote_rows(conn: &mut SqliteConnection, comment_id: i32) -> Vec<(String, i32)> {
        comment_votes::table
            .filter(comment_votes::comment_id.eq(comment_id))
            .select((comment_votes::user_id, comment_votes::vote))
            .load(conn)
            .unwrap()
    }

    pub fn count_bookmarks(conn: &mut SqliteConnection, post_id: i32, user_id: &str) -> i64 {
        bookmarks::table
            .filter(bookmarks::post_id.eq(post_id))
            .filter(bookmarks::user_id.eq(user_id))
            .count()
            .get_result(conn)
            .unwrap()
    }

    pub fn update_post_timestamp(conn: &mut SqliteConnection, id: i32, timestamp: NaiveDateTime) {
        diesel::update(posts::table.find(id))
            .set(posts::created_at.eq(timestamp))
            .execute(conn)
            .unwrap();
    }

    pub fn post_views(conn: &mut SqliteConnection, id: i32) -> i32 {
        posts::table
            .find(id)
            .select(posts::views)
            .first(conn)
            .unwrap()
    }
}
