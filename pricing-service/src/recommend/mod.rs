use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    accounts::AccountDirectory,
    costing::{CostEngine, CostPerPlan},
    error::PricingError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCost {
    pub plan_name: String,
    pub cost: Decimal,
}

/// Cost of every plan next to the plan the meter is on today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanComparison {
    pub price_plan_id: Option<String>,
    pub price_plan_comparisons: CostPerPlan,
}

#[derive(Clone)]
pub struct RecommendationEngine {
    costs: CostEngine,
    accounts: AccountDirectory,
}

impl RecommendationEngine {
    pub fn new(costs: CostEngine, accounts: AccountDirectory) -> Self {
        Self { costs, accounts }
    }

    pub fn cost_engine(&self) -> &CostEngine {
        &self.costs
    }

    pub fn compare_all(&self, meter_id: &str) -> Result<PlanComparison, PricingError> {
        let price_plan_comparisons = self.costs.cost_per_plan(meter_id)?;
        Ok(PlanComparison {
            price_plan_id: self.accounts.plan_for(meter_id).map(str::to_string),
            price_plan_comparisons,
        })
    }

    /// Plans from cheapest to dearest, cut to `limit` when one is given.
    ///
    /// Asking for more plans than exist is an error carrying the plan count.
    pub fn recommend(&self, meter_id: &str, limit: Option<usize>) -> Result<Vec<PlanCost>, PricingError> {
        let mut ranked = rank(self.costs.cost_per_plan(meter_id)?);

        match limit {
            Some(limit) if limit > ranked.len() => {
                tracing::error!(meter_id, limit, available = ranked.len(), "recommendation limit exceeds plan count");
                metrics::counter!("recommendation_limit_exceeded_total").increment(1);
                Err(PricingError::RecommendationLimitExceeded { max: ranked.len() })
            }
            Some(limit) => {
                ranked.truncate(limit);
                Ok(ranked)
            }
            None => Ok(ranked),
        }
    }
}

/// Ascending by cost, ties broken by plan name.
pub fn rank(costs: CostPerPlan) -> Vec<PlanCost> {
    let mut ranked: Vec<PlanCost> = costs
        .into_iter()
        .map(|(plan_name, cost)| PlanCost { plan_name, cost })
        .collect();
    ranked.sort_by(by_cost_then_name);
    ranked
}

fn by_cost_then_name(a: &PlanCost, b: &PlanCost) -> Ordering {
    a.cost.cmp(&b.cost).then_with(|| a.plan_name.cmp(&b.plan_name))
}
