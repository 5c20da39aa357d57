use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use mail_worker::{HealthReporter, HealthStatus, HealthTarget, NotificationKind, NotificationService};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const NOT_FOUND_BODY: &str = "Non existing route";

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub notifications: Arc<NotificationService>,
    pub health: Arc<HealthReporter>,
}

/// `/mails/{created|approved|offers|vote}` runs one notification kind;
/// `/health/{auth|email|graph|odoo|backend}` reports a dependency.
pub fn notifier_router(state: ApiState) -> Router {
    Router::new()
        .route("/mails/:kind", get(trigger_mails).post(trigger_mails))
        .route("/health/:target", get(check_health).post(check_health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn trigger_mails(
    State(state): State<ApiState>,
    Path(kind): Path<String>,
) -> axum::response::Response {
    let Ok(kind) = kind.parse::<NotificationKind>() else {
        return not_found().await.into_response();
    };

    // Partial send failures still answer OK; only store failures surface.
    match state.notifications.run_kind(kind).await {
        Ok(summary) => {
            info!(kind = %kind, failed = summary.failed_ids.len(), "manual trigger completed");
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => {
            error!(kind = %kind, error = %e, "manual trigger failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn check_health(
    State(state): State<ApiState>,
    Path(target): Path<String>,
) -> axum::response::Response {
    let Ok(target) = target.parse::<HealthTarget>() else {
        return not_found().await.into_response();
    };

    match state.health.check(target).await {
        HealthStatus::Healthy => (StatusCode::OK, "OK").into_response(),
        HealthStatus::Unhealthy(detail) => {
            (StatusCode::INTERNAL_SERVER_ERROR, detail).into_response()
        }
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NOT_FOUND_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::{empty_state, state_with_store};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use common::domain::InMemoryKeyValueStore;
    use tower::ServiceExt;

    async fn call(state: ApiState, method: &str, uri: &str) -> (StatusCode, String) {
        let response = notifier_router(state)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_mail_trigger_answers_ok() {
        for uri in ["/mails/created", "/mails/approved", "/mails/offers", "/mails/vote"] {
            let (status, body) = call(empty_state(), "POST", uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, "OK");
        }

        let (status, _) = call(empty_state(), "GET", "/mails/vote").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_as_500() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([("lastVotingEmailSent", "soon")]));

        let (status, body) = call(state_with_store(store), "GET", "/mails/vote").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("lastVotingEmailSent"));
    }

    #[tokio::test]
    async fn test_email_health_reports_unsent_count() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([(
            "notEmailedVotingResolutionIds",
            r#"[{"id":"5"},{"id":"6"}]"#,
        )]));

        let (status, body) = call(state_with_store(store), "GET", "/health/email").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "2 emails weren't sent. Check the logs for details");
    }

    #[tokio::test]
    async fn test_health_routes_ok_when_nothing_recorded() {
        for uri in ["/health/auth", "/health/email", "/health/graph", "/health/odoo", "/health/backend"] {
            let (status, body) = call(empty_state(), "GET", uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, "OK");
        }
    }

    #[tokio::test]
    async fn test_health_routes_accept_post() {
        for uri in ["/health/auth", "/health/email", "/health/odoo"] {
            let (status, body) = call(empty_state(), "POST", uri).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body, "OK");
        }
    }

    #[tokio::test]
    async fn test_graph_health_reports_last_error() {
        let store = Arc::new(InMemoryKeyValueStore::with_entries([(
            "graphErrorTimestamp",
            "1700000000000",
        )]));

        let (status, body) = call(state_with_store(store), "GET", "/health/graph").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "Can't connect to graph. Check logs for details.");
    }

    #[tokio::test]
    async fn test_unknown_routes_are_not_found() {
        for uri in ["/", "/mails/unknown", "/health/mail", "/mails"] {
            let (status, body) = call(empty_state(), "GET", uri).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body, "Non existing route");
        }
    }
}
