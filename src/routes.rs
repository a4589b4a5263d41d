use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};
use crate::state::AppState;

/// Full application router
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let protected = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(notification_routes())
        .merge(channel_routes())
        // Layers run bottom-up: token first, then the stored account
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn(jwt_auth_middleware));

    let mut router = Router::new()
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .route("/auth/register", post(public::auth_register))
        .route("/auth/login", post(public::auth_login))
        .merge(protected)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(tower_http::cors::Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn user_routes() -> Router<AppState> {
    use protected::users;

    Router::new()
        .route("/api/users", get(users::users_get).post(users::users_post))
        .route("/api/users/stats", get(users::users_stats))
        .route("/api/users/bulk/status", post(users::bulk_status))
        .route("/api/users/bulk/role", post(users::bulk_role))
        .route(
            "/api/users/:id",
            get(users::user_get).patch(users::user_patch).delete(users::user_delete),
        )
        .route("/api/users/:id/status", put(users::user_status))
        .route("/api/users/:id/role", put(users::user_role))
}

fn notification_routes() -> Router<AppState> {
    use protected::notifications;

    Router::new()
        .route("/api/notifications", get(notifications::list).post(notifications::send))
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", put(notifications::mark_all_read))
        .route("/api/notifications/:id/read", put(notifications::mark_read))
        .route("/api/notifications/:id", axum::routing::delete(notifications::delete))
}

fn channel_routes() -> Router<AppState> {
    use protected::channels;

    Router::new()
        .route("/api/channels", get(channels::list).post(channels::create))
        .route("/api/channels/:id", get(channels::get))
        .route("/api/channels/:id/join", post(channels::join))
        .route("/api/channels/:id/leave", post(channels::leave))
        .route("/api/channels/:id/members", get(channels::members))
        .route(
            "/api/channels/:id/messages",
            get(channels::messages).post(channels::post_message),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use rstest::rstest;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config;
    use crate::services::user_service::CreateUserInput;
    use crate::types::{UserRole, UserStatus};

    struct Harness {
        router: Router,
        state: AppState,
    }

    impl Harness {
        fn new() -> Self {
            let state = AppState::in_memory();
            Self {
                router: app(state.clone(), config::config()),
                state,
            }
        }

        async fn user(&self, email: &str, role: UserRole, status: UserStatus) -> String {
            let user = self
                .state
                .users
                .create_user(CreateUserInput {
                    email: email.to_string(),
                    name: "Test User".to_string(),
                    password: "password123".to_string(),
                    role: Some(role),
                    status: Some(status),
                })
                .await
                .unwrap();
            user.id.to_string()
        }

        async fn token(&self, email: &str) -> String {
            let (status, body) = self
                .send(
                    Method::POST,
                    "/auth/login",
                    None,
                    Some(json!({"email": email, "password": "password123"})),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            body["data"]["token"].as_str().unwrap().to_string()
        }

        async fn admin_token(&self) -> String {
            self.user("admin@example.com", UserRole::Admin, UserStatus::Active).await;
            self.token("admin@example.com").await
        }

        async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(value) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(value.to_string())
                }
                None => Body::empty(),
            };

            let response = self.router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
            let status = response.status();
            let bytes = response.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let harness = Harness::new();
        let (status, body) = harness.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn bulk_status_reports_partial_failure_with_200() {
        let harness = Harness::new();
        let token = harness.admin_token().await;
        let first = harness.user("one@example.com", UserRole::User, UserStatus::Active).await;
        let third = harness.user("three@example.com", UserRole::User, UserStatus::Active).await;

        let (status, body) = harness
            .send(
                Method::POST,
                "/api/users/bulk/status",
                Some(&token),
                Some(json!({"ids": [first, "user-2", third], "status": "suspended"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        let data = &body["data"];
        assert_eq!(data["success"], 2);
        assert_eq!(data["failed"], 1);
        assert_eq!(data["results"][0]["id"], first.as_str());
        assert_eq!(data["results"][0]["status"], "suspended");
        assert_eq!(data["results"][1], json!({"id": "user-2", "error": "Invalid user id 'user-2'"}));
        assert_eq!(data["results"][2]["status"], "suspended");
    }

    #[tokio::test]
    async fn bulk_role_reports_missing_users_in_band() {
        let harness = Harness::new();
        let token = harness.admin_token().await;
        let existing = harness.user("member@example.com", UserRole::User, UserStatus::Active).await;
        let missing = uuid::Uuid::new_v4().to_string();

        let (status, body) = harness
            .send(
                Method::POST,
                "/api/users/bulk/role",
                Some(&token),
                Some(json!({"ids": [missing, existing], "role": "moderator"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["success"], 1);
        assert_eq!(body["data"]["failed"], 1);
        assert_eq!(body["data"]["results"][0]["error"], "User not found");
        assert_eq!(body["data"]["results"][1]["role"], "moderator");
    }

    #[tokio::test]
    async fn bulk_with_empty_ids_returns_empty_report() {
        let harness = Harness::new();
        let token = harness.admin_token().await;

        let (status, body) = harness
            .send(
                Method::POST,
                "/api/users/bulk/status",
                Some(&token),
                Some(json!({"ids": [], "status": "active"})),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"success": 0, "failed": 0, "results": []}));
    }

    #[rstest]
    #[case::unknown_status(json!({"ids": ["a"], "status": "banned"}))]
    #[case::missing_ids(json!({"status": "active"}))]
    #[tokio::test]
    async fn malformed_bulk_requests_are_rejected_before_processing(#[case] payload: Value) {
        let harness = Harness::new();
        let token = harness.admin_token().await;

        let (status, body) = harness
            .send(Method::POST, "/api/users/bulk/status", Some(&token), Some(payload))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn bulk_requires_authentication() {
        let harness = Harness::new();
        let (status, _) = harness
            .send(
                Method::POST,
                "/api/users/bulk/status",
                None,
                Some(json!({"ids": [], "status": "active"})),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bulk_requires_admin_role() {
        let harness = Harness::new();
        harness.user("plain@example.com", UserRole::User, UserStatus::Active).await;
        let token = harness.token("plain@example.com").await;

        let (status, body) = harness
            .send(
                Method::POST,
                "/api/users/bulk/role",
                Some(&token),
                Some(json!({"ids": [], "role": "admin"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn demoted_admin_token_loses_admin_access() {
        let harness = Harness::new();
        let token = harness.admin_token().await;
        let admin = harness.state.users.find_by_email("admin@example.com").await.unwrap().unwrap();
        harness.state.users.update_role(&admin.id.to_string(), UserRole::User).await.unwrap();

        let (status, _) = harness.send(Method::GET, "/api/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn suspended_user_cannot_log_in() {
        let harness = Harness::new();
        harness.user("gone@example.com", UserRole::User, UserStatus::Suspended).await;

        let (status, body) = harness
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "gone@example.com", "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Account is suspended");
    }

    #[tokio::test]
    async fn register_then_whoami() {
        let harness = Harness::new();
        let (status, body) = harness
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"email": "New@Example.com", "name": "Newcomer", "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert!(body["data"]["user"].get("password_hash").is_none());
        let token = body["data"]["token"].as_str().unwrap().to_string();

        let (status, body) = harness.send(Method::GET, "/api/auth/whoami", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "new@example.com");
        assert_eq!(body["data"]["role"], "user");
    }

    #[tokio::test]
    async fn register_reports_field_errors() {
        let harness = Harness::new();
        let (status, body) = harness
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(json!({"email": "not-an-email", "name": "X", "password": "short"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["field_errors"]["email"].is_string());
        assert!(body["field_errors"]["password"].is_string());
    }

    #[tokio::test]
    async fn role_change_notifies_the_user() {
        let harness = Harness::new();
        let admin_token = harness.admin_token().await;
        let id = harness.user("watcher@example.com", UserRole::User, UserStatus::Active).await;
        let user_token = harness.token("watcher@example.com").await;

        let (status, _) = harness
            .send(
                Method::PUT,
                &format!("/api/users/{id}/role"),
                Some(&admin_token),
                Some(json!({"role": "moderator"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = harness
            .send(Method::GET, "/api/notifications/unread-count", Some(&user_token), None)
            .await;
        assert_eq!(body["data"]["unread"], 1);
    }

    #[tokio::test]
    async fn channel_messages_require_membership() {
        let harness = Harness::new();
        harness.user("owner@example.com", UserRole::User, UserStatus::Active).await;
        harness.user("guest@example.com", UserRole::User, UserStatus::Active).await;
        let owner = harness.token("owner@example.com").await;
        let guest = harness.token("guest@example.com").await;

        let (status, body) = harness
            .send(Method::POST, "/api/channels", Some(&owner), Some(json!({"name": "general"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let channel = body["data"]["id"].as_str().unwrap().to_string();
        let messages = format!("/api/channels/{channel}/messages");

        let (status, _) = harness
            .send(Method::POST, &messages, Some(&owner), Some(json!({"body": "hello"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = harness.send(Method::GET, &messages, Some(&guest), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        harness
            .send(Method::POST, &format!("/api/channels/{channel}/join"), Some(&guest), None)
            .await;
        let (status, body) = harness.send(Method::GET, &messages, Some(&guest), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["body"], "hello");
    }

    #[tokio::test]
    async fn invalid_path_id_is_a_bad_request() {
        let harness = Harness::new();
        harness.user("reader@example.com", UserRole::User, UserStatus::Active).await;
        let token = harness.token("reader@example.com").await;

        let (status, body) = harness
            .send(Method::PUT, "/api/notifications/nope/read", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid notification id 'nope'");
    }
}
