//! Reservation aggregates and forecast output

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Number of reservations created for one equipment in one calendar month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReservationCount {
    pub year: i32,
    /// Calendar month (1-12)
    pub month: i32,
    pub count: i64,
}

/// Forecast reservation count for one future month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ForecastPoint {
    pub year: i32,
    /// Calendar month (1-12)
    pub month: i32,
    /// Model estimate rounded to the nearest integer
    pub count: i64,
}
