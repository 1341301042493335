//! HTTP surface over the reading store and the recommendation engine.
//!
//! - `POST /readings/store`
//! - `GET /readings/read/:smart_meter_id`
//! - `GET /price-plans/compare-all/:smart_meter_id`
//! - `GET /price-plans/recommend/:smart_meter_id?limit=N`

mod handlers;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};

use crate::{recommend::RecommendationEngine, store::ReadingStore};

pub use handlers::{ApiError, ErrorResponse};

/// Shared by every handler; the store is the only mutable part.
pub struct AppState {
    pub store: Arc<ReadingStore>,
    pub recommendations: RecommendationEngine,
}

impl AppState {
    pub fn new(recommendations: RecommendationEngine) -> Self {
        Self {
            store: recommendations.cost_engine().store().clone(),
            recommendations,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/readings/store", post(handlers::store_readings))
        .route("/readings/read/:smart_meter_id", get(handlers::read_readings))
        .route("/price-plans/compare-all/:smart_meter_id", get(handlers::compare_all))
        .route("/price-plans/recommend/:smart_meter_id", get(handlers::recommend))
        .with_state(state)
}

/// Binds `bind_addr` and serves the API until the server stops.
pub async fn serve(state: Arc<AppState>, bind_addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid http.bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "pricing API listening");

    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}
