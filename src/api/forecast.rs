//! Reservation forecast endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::AppResult, models::reservation::ForecastPoint, AppState};

use super::FunctionKey;

/// Forecast monthly reservations for one equipment
#[utoipa::path(
    get,
    path = "/http_trigger/{equipmentId}",
    tag = "forecast",
    security(("function_key" = [])),
    params(("equipmentId" = String, Path, description = "Equipment identifier")),
    responses(
        (status = 200, description = "Forecast for the next months", body = Vec<ForecastPoint>),
        (status = 401, description = "Missing or invalid function key", body = crate::error::ErrorResponse),
        (status = 404, description = "No reservation history", body = String, content_type = "text/plain"),
        (status = 422, description = "Model could not be fitted", body = crate::error::ErrorResponse),
        (status = 504, description = "Model fitting timed out", body = crate::error::ErrorResponse)
    )
)]
pub async fn http_trigger(
    State(state): State<AppState>,
    _key: FunctionKey,
    Path(equipment_id): Path<String>,
) -> AppResult<Json<Vec<ForecastPoint>>> {
    let forecast = state.services.forecast.forecast_equipment(&equipment_id).await?;
    Ok(Json(forecast))
}
