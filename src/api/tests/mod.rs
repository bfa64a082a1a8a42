use super::*;
use crate::service::test_helpers::{MemoryStore, Outcome, ScriptedFetcher, create_test_service};
use axum::body::{Body, to_bytes};
use axum::extract::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;


struct TestApp {
    router: Router,
    service: Arc<TaskService>,
    store: Arc<MemoryStore>,
}

/// Router over in-memory doubles; `fetcher` decides download outcomes
async fn create_test_app_with(fetcher: ScriptedFetcher, config: Config) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let service = Arc::new(create_test_service(store.clone(), Arc::new(fetcher), 1, 10).await);
    let router = create_router(service.clone(), Arc::new(config));
    TestApp {
        router,
        service,
        store,
    }
}

async fn create_test_app() -> TestApp {
    create_test_app_with(ScriptedFetcher::new(), Config::default()).await
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_stops_on_service_shutdown() {
    let app = create_test_app().await;
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    let server = tokio::spawn(serve(
        listener,
        app.service.clone(),
        Arc::new(Config::default()),
    ));

    // The server answers real HTTP requests
    let response = reqwest::get(format!("http://{address}/health")).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    app.service.shutdown().await;

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_start_api_server_fails_on_bound_port() {
    let app = create_test_app().await;
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = Config::default();
    config.api.bind_address = occupied.local_addr().unwrap();

    let result = start_api_server(app.service.clone(), Arc::new(config)).await;

    assert!(matches!(result, Err(crate::Error::Io(_))));
    app.service.shutdown().await;
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = create_test_app().await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let mut config = Config::default();
    config.api.cors_origins = vec!["http://allowed.test".into()];
    let app = create_test_app_with(ScriptedFetcher::new(), config).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.test")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://allowed.test"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut config = Config::default();
    config.api.cors_enabled = false;
    let app = create_test_app_with(ScriptedFetcher::new(), config).await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get("access-control-allow-origin")
            .is_none()
    );
}
