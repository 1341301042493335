use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meter_domain::{ElectricityReading, MeterReadings};
use serde::{ser::SerializeMap, Deserialize, Serialize, Serializer};

use super::AppState;
use crate::{
    error::PricingError,
    recommend::{PlanComparison, PlanCost},
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug)]
pub enum ApiError {
    Pricing(PricingError),
    /// Body could not be read as a `MeterReadings` batch.
    Unparseable(JsonRejection),
    /// `?limit=` was not a non-negative integer.
    BadQuery(QueryRejection),
}

impl From<PricingError> for ApiError {
    fn from(e: PricingError) -> Self {
        ApiError::Pricing(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Pricing(e) => {
                let status = match &e {
                    PricingError::InvalidMeterId(_)
                    | PricingError::InvalidReadings(_)
                    | PricingError::RecommendationLimitExceeded { .. } => StatusCode::BAD_REQUEST,
                    PricingError::NoReadings(_) => StatusCode::NOT_FOUND,
                    PricingError::ZeroDuration(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    PricingError::CostOverflow { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Unparseable(rejection) => {
                tracing::warn!(error = %rejection, "failed to parse store request body");
                (StatusCode::UNPROCESSABLE_ENTITY, "Failed to parse incoming data".to_string())
            }
            ApiError::BadQuery(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    pub limit: Option<usize>,
}

/// One ranked plan, written as `{"<plan name>": cost}`.
pub struct RankedPlan(PlanCost);

impl Serialize for RankedPlan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.0.plan_name, &self.0.cost)?;
        map.end()
    }
}

/// `POST /readings/store` → 200 `"Readings Saved"`
pub async fn store_readings(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MeterReadings>, JsonRejection>,
) -> Result<&'static str, ApiError> {
    metrics::counter!("http_requests_total", "route" => "store").increment(1);

    let Json(batch) = payload.map_err(ApiError::Unparseable)?;
    state.store.store(batch)?;
    Ok("Readings Saved")
}

/// `GET /readings/read/:smart_meter_id` → 200 readings, 404 if never stored
pub async fn read_readings(
    State(state): State<Arc<AppState>>,
    Path(smart_meter_id): Path<String>,
) -> Result<Json<Vec<ElectricityReading>>, StatusCode> {
    metrics::counter!("http_requests_total", "route" => "read").increment(1);

    state.store.get(&smart_meter_id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// `GET /price-plans/compare-all/:smart_meter_id` → 200 `PlanComparison`
pub async fn compare_all(
    State(state): State<Arc<AppState>>,
    Path(smart_meter_id): Path<String>,
) -> Result<Json<PlanComparison>, ApiError> {
    metrics::counter!("http_requests_total", "route" => "compare_all").increment(1);

    Ok(Json(state.recommendations.compare_all(&smart_meter_id)?))
}

/// `GET /price-plans/recommend/:smart_meter_id?limit=N` → 200 ranked plans
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Path(smart_meter_id): Path<String>,
    query: Result<Query<RecommendQuery>, QueryRejection>,
) -> Result<Json<Vec<RankedPlan>>, ApiError> {
    metrics::counter!("http_requests_total", "route" => "recommend").increment(1);

    let Query(query) = query.map_err(ApiError::BadQuery)?;
    let ranked = state.recommendations.recommend(&smart_meter_id, query.limit)?;
    Ok(Json(ranked.into_iter().map(RankedPlan).collect()))
}
