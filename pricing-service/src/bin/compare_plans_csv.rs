use std::{env, sync::Arc};

use anyhow::{bail, Result};
use pricing_service::{
    config::AppConfig,
    costing::CostEngine,
    observability,
    recommend::RecommendationEngine,
    sources::ReadingsCsvFileSource,
    store::ReadingStore,
};

/// Loads a readings CSV into a fresh store and logs the ranked plans for
/// every meter in it, using the plans from the service config.
fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: compare_plans_csv <csv_file_path>");
    }
    let file_path = &args[1];

    // Load configuration (PRICING_CONFIG can point at a different plan set).
    let cfg = AppConfig::load()?;

    let accounts = cfg.accounts();
    let store = Arc::new(ReadingStore::new());
    let engine = RecommendationEngine::new(
        CostEngine::new(store.clone(), cfg.price_plans(), cfg.cost_settings()?),
        accounts.clone(),
    );

    let batches = ReadingsCsvFileSource::new(file_path).load()?;
    let mut meters = Vec::with_capacity(batches.len());
    for batch in batches {
        let meter_id = batch.smart_meter_id.clone().unwrap_or_default();
        match store.store(batch) {
            Ok(()) => meters.push(meter_id),
            Err(e) => tracing::warn!(meter_id = %meter_id, error = %e, "skipping meter"),
        }
    }
    tracing::info!(file = %file_path, meters = store.meter_count(), "loaded readings");

    for meter_id in &meters {
        match engine.recommend(meter_id, None) {
            Ok(ranked) => {
                let current = accounts.plan_for(meter_id);
                for (rank, plan) in ranked.iter().enumerate() {
                    tracing::info!(
                        meter_id = %meter_id,
                        rank = rank + 1,
                        plan = %plan.plan_name,
                        cost = %plan.cost,
                        current = current == Some(plan.plan_name.as_str()),
                        "plan cost"
                    );
                }
            }
            Err(e) => tracing::warn!(meter_id = %meter_id, error = %e, "cannot rank plans"),
        }
    }

    Ok(())
}
