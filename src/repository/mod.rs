//! Repository layer for database operations

pub mod reservations;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{error::AppResult, models::reservation::ReservationCount};

/// Read access to reservation history, the seam the service is tested through
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Monthly reservation counts for one equipment, ordered by (year, month)
    async fn monthly_counts(&self, equipment_id: &str) -> AppResult<Vec<ReservationCount>>;

    /// Check that the store is reachable
    async fn ping(&self) -> AppResult<()>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub reservations: reservations::ReservationsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl ReservationStore for Repository {
    async fn monthly_counts(&self, equipment_id: &str) -> AppResult<Vec<ReservationCount>> {
        self.reservations.monthly_counts(equipment_id).await
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
