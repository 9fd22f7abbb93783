// rest/mod.rs — Public REST API server.
//
// Axum HTTP server (loopback only unless bind_address says otherwise).
//
// Endpoints:
//   GET   /api/todos
//   POST  /api/todos
//   PATCH /api/todos/{id}
//   GET   /api/health

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, patch},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/health", get(routes::health::health))
        // Todos
        .route(
            "/api/todos",
            get(routes::todos::list_todos).post(routes::todos::create_todo),
        )
        .route("/api/todos/{id}", patch(routes::todos::update_todo))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
