//! End-to-end HTTP tests against a live ArangoDB, same posture as the
//! backend this was built from: `#[serial]` because tests share one
//! database, unique usernames per run to avoid collisions.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};

    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use serial_test::serial;

    use crate::config::AppConfig;
    use crate::create_app;
    use crate::db::arangodb::ArangoDb;
    use crate::services::mailer::LoggingMailer;
    use crate::state::AppState;

    fn unique_user(prefix: &str) -> String {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos();
        format!("{prefix}{nanos}")
    }

    async fn test_server() -> TestServer {
        let config = AppConfig::from_env().expect("config");
        let db = ArangoDb::connect(
            &config.database_connection_string,
            &config.database_user,
            &config.database_password,
            &config.database_name,
        )
        .await
        .expect("connect to arangodb");
        let state = AppState::new(config, Arc::new(db), Arc::new(LoggingMailer));
        TestServer::new(create_app(state)).expect("build test server")
    }

    async fn register_and_login(server: &TestServer, username: &str) -> String {
        server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct horse battery staple",
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let login_response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": username, "password": "correct horse battery staple" }))
            .await;
        login_response.assert_status_ok();
        let body: serde_json::Value = login_response.json();
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    #[serial]
    async fn health_check_ok() {
        let server = test_server().await;
        server.get("/healthz").await.assert_status_ok();
    }

    #[tokio::test]
    #[serial]
    async fn register_and_login_round_trip() {
        let server = test_server().await;
        let username = unique_user("reglogin");

        let login_response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": "does-not-exist", "password": "x" }))
            .await;
        login_response.assert_status(StatusCode::UNAUTHORIZED);

        let token = register_and_login(&server, &username).await;
        assert!(token.len() > 10);
    }

    #[tokio::test]
    #[serial]
    async fn rejects_login_with_wrong_password() {
        let server = test_server().await;
        let username = unique_user("badpw");

        server
            .post("/api/v1/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": "correct horse battery staple",
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let login_response = server
            .post("/api/v1/auth/login")
            .json(&json!({ "username": username, "password": "wrong password" }))
            .await;
        login_response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn bearer_token_without_session_cookie_is_rejected() {
        // The TestServer's cookie jar is only populated if the client
        // carries cookies forward (`.save_cookies()`); a plain server
        // never attaches one, so the fingerprint cookie middleware expects
        // is simply absent, matching a token replayed from elsewhere.
        let server = test_server().await;
        let username = unique_user("nofgp");
        let token = register_and_login(&server, &username).await;

        let response = server.get("/api/v1/videos").authorization_bearer(token).await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    #[serial]
    async fn cannot_access_another_users_video() {
        let server = TestServer::builder().save_cookies().build(create_app(
            {
                let config = AppConfig::from_env().expect("config");
                let db = ArangoDb::connect(
                    &config.database_connection_string,
                    &config.database_user,
                    &config.database_password,
                    &config.database_name,
                )
                .await
                .expect("connect to arangodb");
                AppState::new(config, Arc::new(db), Arc::new(LoggingMailer))
            },
        ))
        .expect("build test server");

        let owner = unique_user("owner");
        register_and_login(&server, &owner).await;

        let intruder = unique_user("intruder");
        register_and_login(&server, &intruder).await;

        let response = server.get("/api/v1/videos/not-a-real-public-id").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }
}
