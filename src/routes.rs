use axum::{middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::accounts::crud as account_crud;
use crate::articles::{comments, crud as article_crud};
use crate::auth::login;
use crate::auth::middleware::Sessions;
use crate::categories::crud as category_crud;
use crate::dashboard::aggregate;
use crate::hub::handler as hub_handler;
use crate::state::AppState;
use crate::tags::crud as tag_crud;

/// Inject the session store into request extensions so the Claims extractor can find it.
async fn inject_sessions(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(Sessions(state.sessions.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 login attempts per minute per IP
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5) // Allow burst of 5
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    let auth_routes = Router::new()
        .route("/api/auth/login", axum::routing::post(login::login))
        .layer(GovernorLayer::new(governor_config));

    // Logout is authenticated by its bearer token and not rate limited
    let session_routes = Router::new()
        .route("/api/auth/logout", axum::routing::post(login::logout));

    let account_routes = Router::new()
        .route("/api/accounts", axum::routing::get(account_crud::list_accounts))
        .route("/api/accounts", axum::routing::post(account_crud::create_account))
        .route("/api/accounts/me", axum::routing::get(account_crud::my_profile))
        .route("/api/accounts/{id}", axum::routing::put(account_crud::update_account))
        .route("/api/accounts/{id}", axum::routing::delete(account_crud::delete_account));

    let category_routes = Router::new()
        .route("/api/categories", axum::routing::get(category_crud::list_categories))
        .route("/api/categories", axum::routing::post(category_crud::create_category))
        .route("/api/categories/{id}", axum::routing::put(category_crud::update_category))
        .route("/api/categories/{id}", axum::routing::delete(category_crud::delete_category));

    // Note: /api/articles/mine MUST come before /api/articles/{id} to avoid path param conflict.
    let article_routes = Router::new()
        .route("/api/articles", axum::routing::get(article_crud::list_articles))
        .route("/api/articles", axum::routing::post(article_crud::create_article))
        .route("/api/articles/mine", axum::routing::get(article_crud::my_articles))
        .route("/api/articles/{id}", axum::routing::get(article_crud::get_article))
        .route("/api/articles/{id}", axum::routing::put(article_crud::update_article))
        .route("/api/articles/{id}", axum::routing::delete(article_crud::delete_article))
        .route(
            "/api/articles/{id}/comments",
            axum::routing::post(comments::post_comment),
        )
        .route(
            "/api/comments/{id}",
            axum::routing::delete(comments::delete_comment),
        );

    let tag_routes = Router::new()
        .route("/api/tags", axum::routing::get(tag_crud::list_tags))
        .route("/api/tags", axum::routing::post(tag_crud::create_tag))
        .route("/api/tags/{id}", axum::routing::put(tag_crud::update_tag))
        .route("/api/tags/{id}", axum::routing::delete(tag_crud::delete_tag));

    let dashboard_routes = Router::new().route(
        "/api/dashboard/stats",
        axum::routing::get(aggregate::get_stats),
    );

    // Notification hub WebSocket endpoint (session token via query param)
    let hub_routes = Router::new().route(
        "/notificationHub",
        axum::routing::get(hub_handler::hub_upgrade),
    );

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(session_routes)
        .merge(account_routes)
        .merge(category_routes)
        .merge(article_routes)
        .merge(tag_routes)
        .merge(dashboard_routes)
        .merge(hub_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_sessions,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
