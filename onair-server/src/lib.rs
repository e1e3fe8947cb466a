//! # onair Server
//!
//! HTTP admin surface for the onair control plane, plus the binary that
//! hosts the background runner.
//!
//! The router is built from an [`infra::app_state::AppState`], which can be
//! wired to Postgres or to the in-memory store.

pub mod api_types;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
pub use routes::create_api_router;

use axum::{
    Router,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE, InvalidHeaderValue},
    },
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

/// CORS policy for the configured browser origins.
///
/// `*` anywhere in the list allows every origin. An empty list yields a
/// layer that never emits CORS headers.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, InvalidHeaderValue> {
    if origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|origin| HeaderValue::from_str(origin))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

/// The full application with state applied, request tracing and CORS.
pub fn build_app(state: AppState, cors: CorsLayer) -> Router {
    routes::create_api_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use onair_core::{
        AppUnitOfWork, SecretHasher, SystemClock, database::InMemoryStore,
        domain::license::LicensePolicy,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(origins: &[&str]) -> Router {
        let origins: Vec<String> = origins.iter().map(|o| o.to_string()).collect();
        let state = AppState::new(
            AppUnitOfWork::in_memory(Arc::new(InMemoryStore::new())),
            Arc::new(SystemClock),
            SecretHasher::new("router-key").unwrap(),
            LicensePolicy::default(),
        );
        build_app(state, cors_layer(&origins).unwrap())
    }

    fn health_from(origin: &str) -> Request<Body> {
        Request::builder()
            .uri("/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn listed_origin_is_allowed() {
        let response = app(&["https://admin.example.com"])
            .oneshot(health_from("https://admin.example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("https://admin.example.com"))
        );
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_cors_headers() {
        let response = app(&["https://admin.example.com"])
            .oneshot(health_from("https://evil.example.com"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn wildcard_allows_any_origin() {
        let response = app(&["*"])
            .oneshot(health_from("https://anywhere.example.com"))
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("*"))
        );
    }
}
