//! Waypost HTTP gateway
//!
//! The entry point for all site traffic. Handles:
//! - Public browse routes with slug redirect resolution
//! - The editorial write API
//! - Observability (logging, metrics, request ids)

mod handlers;
mod navigation;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};
use waypost_common::{
    config::AppConfig,
    db::{DbPool, SlugRepository, SlugStore},
    metrics,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn SlugStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting Waypost gateway v{}", waypost_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();

    // Initialize database connection
    info!("Connecting to database...");
    let pool = DbPool::new(&config.database).await?;
    let store: Arc<dyn SlugStore> = Arc::new(SlugRepository::new(pool));

    // Create app state
    let state = AppState {
        config: config.clone(),
        store,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Editorial write API
    let api_routes = Router::new()
        .route("/countries", post(handlers::countries::create_country))
        .route("/countries/{id}", put(handlers::countries::update_country))
        .route(
            "/countries/{id}",
            delete(handlers::countries::delete_country),
        )
        .route("/tags", post(handlers::tags::create_tag))
        .route("/tags/{id}", put(handlers::tags::update_tag))
        .route("/tags/{id}", delete(handlers::tags::delete_tag))
        .route("/posts", post(handlers::posts::create_post))
        .route("/posts/{id}", put(handlers::posts::update_post))
        .route("/posts/{id}", delete(handlers::posts::delete_post));

    // Public browse routes. Static segments ("/tags/", "/health") take
    // priority over the country parameter routes.
    let browse_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/tags/", get(handlers::browse::list_tags))
        .route("/tags/{tag_slug}/", get(handlers::browse::show_tag))
        .route("/{country_slug}/", get(handlers::browse::show_country))
        .route(
            "/{country_slug}/{category_slug}/",
            get(handlers::browse::list_category_posts),
        )
        .route(
            "/{country_slug}/{category_slug}/{post_slug}/",
            get(handlers::browse::show_post),
        );

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .merge(browse_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;
    use waypost_common::db::models::{Category, Country, Post};
    use waypost_common::db::{MemoryStore, ScopeKey};
    use waypost_common::slug::EntityKind;

    fn test_state(store: MemoryStore) -> AppState {
        AppState {
            config: Arc::new(AppConfig::default()),
            store: Arc::new(store),
        }
    }

    fn country(slug: &str) -> Country {
        let now = chrono::Utc::now().into();
        Country {
            id: Uuid::new_v4(),
            name: slug.to_string(),
            name_en: None,
            slug: slug.to_string(),
            iso_a2: None,
            iso_a3: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn post_model(country_id: Uuid, slug: &str, published: bool) -> Post {
        let now = chrono::Utc::now().into();
        Post {
            id: Uuid::new_v4(),
            country_id,
            category: Category::Travel.as_str().to_string(),
            title: slug.to_string(),
            slug: slug.to_string(),
            content: "body".to_string(),
            is_published: published,
            published_at: chrono::NaiveDate::from_ymd_opt(2024, 5, 1),
            created_at: now,
            updated_at: now,
        }
    }

    /// Seed a country that was renamed korea -> south-korea
    async fn seed_renamed_country(store: &MemoryStore) -> Country {
        let kr = store.insert_country(country("korea")).await.unwrap();
        let renamed = Country {
            slug: "south-korea".to_string(),
            ..kr.clone()
        };
        let renamed = store.update_country(renamed).await.unwrap();
        store
            .record_history(EntityKind::Country, kr.id, ScopeKey::Global, "korea")
            .await
            .unwrap();
        renamed
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_partial(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("x-partial-request", "true")
            .body(Body::empty())
            .unwrap()
    }

    fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_router(test_state(MemoryStore::new()));
        let res = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_renamed_country_redirects_and_keeps_query() {
        let store = MemoryStore::new();
        seed_renamed_country(&store).await;
        let app = create_router(test_state(store));

        let res = app.oneshot(get("/korea/?ref=mail")).await.unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/south-korea/?ref=mail"
        );
    }

    #[tokio::test]
    async fn test_partial_navigation_redirect_is_204_with_header() {
        let store = MemoryStore::new();
        seed_renamed_country(&store).await;
        let app = create_router(test_state(store));

        let res = app.oneshot(get_partial("/korea/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers().get("x-redirect-to").unwrap(), "/south-korea/");

        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_renamed_post_redirects_to_canonical_path() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        let p = store
            .insert_post(post_model(kr.id, "seoul-trip", true))
            .await
            .unwrap();
        let renamed = Post {
            slug: "seoul-trip-2024".to_string(),
            ..p.clone()
        };
        store.update_post(renamed).await.unwrap();
        store
            .record_history(
                EntityKind::Post,
                p.id,
                ScopeKey::CountryCategory {
                    country_id: kr.id,
                    category: Category::Travel,
                },
                "seoul-trip",
            )
            .await
            .unwrap();
        let app = create_router(test_state(store));

        let res = app
            .oneshot(get("/kr/travel/seoul-trip/?page=2"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/kr/travel/seoul-trip-2024/?page=2"
        );
    }

    #[tokio::test]
    async fn test_live_post_page_is_200() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        store
            .insert_post(post_model(kr.id, "seoul-trip", true))
            .await
            .unwrap();
        let app = create_router(test_state(store));

        let res = app.oneshot(get("/kr/travel/seoul-trip/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        assert_eq!(body["post"]["slug"], "seoul-trip");
        assert_eq!(body["country"]["slug"], "kr");
    }

    #[tokio::test]
    async fn test_unknown_addresses_are_404() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        store
            .insert_post(post_model(kr.id, "seoul-trip", true))
            .await
            .unwrap();
        let app = create_router(test_state(store));

        let res = app.clone().oneshot(get("/atlantis/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        // Typo'd category never resolves, even with a live post.
        let res = app.oneshot(get("/kr/trave/seoul-trip/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unpublished_post_is_hidden() {
        let store = MemoryStore::new();
        let kr = store.insert_country(country("kr")).await.unwrap();
        store
            .insert_post(post_model(kr.id, "draft-post", false))
            .await
            .unwrap();
        let app = create_router(test_state(store));

        let res = app.oneshot(get("/kr/travel/draft-post/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tag_index_is_sorted_by_name() {
        let store = MemoryStore::new();
        let now = chrono::Utc::now().into();
        for (name, slug) in [("Food", "food"), ("Art", "art")] {
            store
                .insert_tag(waypost_common::db::models::Tag {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    slug: slug.to_string(),
                    created_at: now,
                    updated_at: now,
                })
                .await
                .unwrap();
        }
        let app = create_router(test_state(store));

        let res = app.oneshot(get("/tags/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let body = body_json(res).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Art", "Food"]);
    }

    #[tokio::test]
    async fn test_editorial_create_then_browse() {
        let app = create_router(test_state(MemoryStore::new()));

        let res = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/countries",
                json!({"name": "일본", "name_en": "Japan"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        assert_eq!(created["slug"], "japan");

        let res = app.oneshot(get("/japan/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_editorial_rename_retires_old_address() {
        let app = create_router(test_state(MemoryStore::new()));

        let res = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/countries",
                json!({"name": "Korea", "name_en": "Korea"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created = body_json(res).await;
        let id = created["id"].as_str().unwrap().to_string();
        assert_eq!(created["slug"], "korea");

        let res = app
            .clone()
            .oneshot(send_json(
                "PUT",
                &format!("/api/countries/{id}"),
                json!({"name": "Korea", "name_en": "Korea", "slug": "south-korea"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app.oneshot(get("/korea/")).await.unwrap();
        assert_eq!(res.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "/south-korea/"
        );
    }

    #[tokio::test]
    async fn test_invalid_payload_is_400() {
        let app = create_router(test_state(MemoryStore::new()));

        let res = app
            .oneshot(send_json("POST", "/api/countries", json!({"name": ""})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
