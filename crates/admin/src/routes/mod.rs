//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                  - Liveness check
//! GET  /health/ready                            - Readiness check (database)
//!
//! # Session
//! GET    /api/session                           - Logged-in staff member and permissions
//! POST   /api/session                           - Switch staff member (demo login only)
//! DELETE /api/session                           - Logout
//! GET    /api/permissions                       - Permission catalog
//!
//! # Staff
//! GET/POST        /api/users
//! GET/PUT/DELETE  /api/users/{id}
//! GET/PUT         /api/users/{id}/department_histories
//! GET/POST        /api/departments
//! PUT/DELETE      /api/departments/{id}
//! GET/POST        /api/roles
//! GET/PUT/DELETE  /api/roles/{id}
//!
//! # Facilities
//! GET/POST        /api/group-homes
//! GET/PUT/DELETE  /api/group-homes/{id}
//! GET             /api/group-homes/{id}/rooms?date=
//! GET/POST        /api/expansions
//! GET/PUT/DELETE  /api/expansions/{id}
//!
//! # Residents
//! GET/POST        /api/residents
//! GET/PUT/DELETE  /api/residents/{id}
//! GET/PUT         /api/residents/{id}/disability_histories
//! POST            /api/disability_histories
//! PUT/DELETE      /api/disability_histories/{id}
//! GET/PUT         /api/usage_records
//! GET             /api/usage_records/summary?month=
//!
//! # Shifts and attendance
//! GET/POST        /api/shift_preferences
//! GET/PUT/DELETE  /api/shift_preferences/{id}
//! GET/POST        /api/attendance
//! PUT/DELETE      /api/attendance/{id}
//! GET             /api/attendance/report?month=
//! ```
//!
//! Unknown paths answer with a JSON 404 and known paths with the wrong
//! method with a JSON 405.

use axum::{Router, extract::State, http::StatusCode, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::{db, error::AppError, state::AppState};

pub mod attendance;
pub mod departments;
pub mod disability_histories;
pub mod expansions;
pub mod extract;
pub mod group_homes;
pub mod permissions;
pub mod residents;
pub mod roles;
pub mod session;
pub mod shift_preferences;
pub mod usage_records;
pub mod users;

/// All API and health routes, without session or tracing layers.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(session::router())
        .merge(permissions::router())
        .merge(users::router())
        .merge(departments::router())
        .merge(roles::router())
        .merge(group_homes::router())
        .merge(expansions::router())
        .merge(residents::router())
        .merge(disability_histories::router())
        .merge(usage_records::router())
        .merge(shift_preferences::router())
        .merge(attendance::router())
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
}

/// The full application: routes, sessions and request tracing.
pub fn app<S>(state: AppState, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    router()
        .layer(session_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match db::ping(state.pool()).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("ページ".to_owned())
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        body::Body,
        http::{Method, Request, header},
        middleware::{Next, from_fn},
        response::Response,
    };
    use sqlx::mysql::MySqlPoolOptions;
    use tower::ServiceExt;
    use tower_sessions::{MemoryStore, Session};

    use grouphome_core::SystemRole;

    use super::*;
    use crate::config::AdminConfig;
    use crate::middleware::{create_session_layer, set_current_staff};
    use crate::models::SessionStaff;

    fn state(demo_login: bool) -> AppState {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("GROUPHOME_DATABASE_URL", "mysql://nobody@127.0.0.1:1/none"),
            ("DEMO_LOGIN", if demo_login { "true" } else { "false" }),
        ]);
        let config = AdminConfig::from_vars(&|k| vars.get(k).map(|v| (*v).to_owned())).unwrap();
        let pool = MySqlPoolOptions::new()
            .connect_lazy("mysql://nobody@127.0.0.1:1/none")
            .unwrap();
        AppState::new(config, pool)
    }

    fn test_app(demo_login: bool) -> Router {
        let state = state(demo_login);
        let layer = create_session_layer(MemoryStore::default(), state.config());
        app(state, layer)
    }

    async fn as_staff(session: Session, request: axum::extract::Request, next: Next) -> Response {
        let staff = SessionStaff {
            user_id: None,
            name: "鈴木 次郎".to_owned(),
            email: "jiro@example.jp".to_owned(),
            role_name: SystemRole::Staff.as_str().to_owned(),
        };
        set_current_staff(&session, &staff).await.unwrap();
        next.run(request).await
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_owned())))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_app(true)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let (status, body) = send(test_app(true), Method::GET, "/api/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "ページが見つかりません");
    }

    #[tokio::test]
    async fn test_wrong_method_is_json_405() {
        let (status, body) = send(test_app(true), Method::PATCH, "/api/users", None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "許可されていないメソッドです");
    }

    #[tokio::test]
    async fn test_without_session_is_401() {
        let (status, body) = send(test_app(false), Method::GET, "/api/users", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "ログインが必要です");
    }

    #[tokio::test]
    async fn test_demo_login_shows_admin() {
        let (status, body) = send(test_app(true), Method::GET, "/api/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["roleName"], "admin");
    }

    #[tokio::test]
    async fn test_malformed_id_is_400() {
        let (status, body) = send(test_app(true), Method::GET, "/api/users/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("リクエストが不正です"));
    }

    #[tokio::test]
    async fn test_staff_cannot_edit_departments() {
        let state = state(false);
        let layer = create_session_layer(MemoryStore::default(), state.config());
        let app = router()
            .layer(from_fn(as_staff))
            .layer(layer)
            .with_state(state);

        let (status, body) = send(
            app,
            Method::POST,
            "/api/departments",
            Some(r#"{"name":"夜勤"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "この操作を行う権限がありません");
    }
}
