use std::sync::Arc;

use anyhow::Result;
use pricing_service::{
    api::{self, AppState},
    config::AppConfig,
    costing::CostEngine,
    metrics_server,
    observability,
    recommend::RecommendationEngine,
    store::ReadingStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr).await?;
    }

    let plans = cfg.price_plans();
    let accounts = cfg.accounts();
    tracing::info!(plans = plans.len(), accounts = accounts.len(), "loaded price plans");

    let store = Arc::new(ReadingStore::new());
    let engine = CostEngine::new(store, plans, cfg.cost_settings()?);
    let state = Arc::new(AppState::new(RecommendationEngine::new(engine, accounts)));

    api::serve(state, &cfg.http.bind_addr).await
}
