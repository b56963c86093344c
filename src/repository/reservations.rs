//! Reservations repository

use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::reservation::ReservationCount};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Reservations created per calendar month for one equipment, oldest first.
    /// Months without any reservation produce no row.
    pub async fn monthly_counts(&self, equipment_id: &str) -> AppResult<Vec<ReservationCount>> {
        let rows = sqlx::query_as::<_, ReservationCount>(
            r#"
            SELECT EXTRACT(YEAR FROM created_at)::int AS year,
                   EXTRACT(MONTH FROM created_at)::int AS month,
                   COUNT(*) AS count
            FROM item_reservations
            WHERE equipment_id::text = $1
            GROUP BY 1, 2
            ORDER BY 1, 2
            "#,
        )
        .bind(equipment_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
