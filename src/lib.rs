//! Clubhub Backend - library for app logic and testing

pub mod db;
pub mod logging;
pub mod media;
pub mod routes;
pub mod sheets;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local dev frontend.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Create and configure the application router.
pub fn create_app() -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    Router::new()
        .route(
            "/api/blog",
            get(routes::blog::list_posts).post(routes::blog::create_post),
        )
        .route(
            "/api/blog/{id}",
            get(routes::blog::get_post)
                .put(routes::blog::update_post)
                .delete(routes::blog::delete_post),
        )
        .route(
            "/api/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/api/projects/{id}",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/api/team-members",
            get(routes::team::list_members).post(routes::team::create_member),
        )
        .route(
            "/api/team-members/{id}",
            get(routes::team::get_member)
                .put(routes::team::update_member)
                .delete(routes::team::delete_member),
        )
        .route(
            "/api/events",
            get(routes::events::list_events).post(routes::events::create_event),
        )
        .route(
            "/api/events/{id}",
            get(routes::events::get_event)
                .put(routes::events::update_event)
                .delete(routes::events::delete_event),
        )
        .route(
            "/api/our-service",
            get(routes::services::list_services).post(routes::services::create_service),
        )
        .route(
            "/api/our-service/{id}",
            get(routes::services::get_service)
                .put(routes::services::update_service)
                .delete(routes::services::delete_service),
        )
        .route(
            "/api/join-applications",
            get(routes::join::list_applications).post(routes::join::create_application),
        )
        .route(
            "/api/join-applications/{id}",
            get(routes::join::get_application)
                .put(routes::join::update_application)
                .delete(routes::join::delete_application),
        )
        .route("/api/import/excel", post(routes::tickets::import_tickets))
        .route("/api/verify-ticket", post(routes::tickets::verify_ticket))
        .route("/api/sheet-data", get(routes::tickets::sheet_data))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // Request body cap; multipart image uploads need the headroom
        .layer(RequestBodyLimitLayer::new(20 * 1024 * 1024))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    match db::init_db(None).await {
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(
                "Failed to connect to MongoDB: {}. Continuing without database.",
                e
            );
        }
    }

    let app = create_app();

    // Bind address is configurable via HOST / PORT env vars, defaulting to
    // 127.0.0.1:3001 so existing dev setups keep working unchanged.
    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn test_create_app_returns_router() {
        let _app = create_app();
        // Just test that it compiles and doesn't panic
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_malformed_id_rejected_before_storage() {
        for uri in [
            "/api/blog/not-hex",
            "/api/projects/123",
            "/api/team-members/zzzzzzzzzzzzzzzzzzzzzzzz",
            "/api/events/5f8d0d55b54764421b7156c",
            "/api/our-service/5f8d0d55b54764421b7156c3a",
            "/api/join-applications/nope",
        ] {
            let (status, body) =
                send(create_app(), Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn test_well_formed_id_without_db_is_unavailable() {
        let (status, body) = send(
            create_app(),
            Request::get("/api/blog/5f8d0d55b54764421b7156c3")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_verify_ticket_requires_national_id() {
        let (status, body) = send(
            create_app(),
            Request::post("/api/verify-ticket")
                .header("content-type", "application/json")
                .body(Body::from(r#"{}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_join_application_missing_fields_listed() {
        let (status, body) = send(
            create_app(),
            Request::post("/api/join-applications")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"fullName":"Sara"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("email"));
        assert!(error.contains("agreeTerms"));
    }

    #[tokio::test]
    async fn test_create_service_missing_fields_listed() {
        let (status, body) = send(
            create_app(),
            Request::post("/api/our-service")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"title":"Web"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("description"));
        assert!(error.contains("icon"));
        assert!(error.contains("type"));
    }
}
