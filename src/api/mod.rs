//! API handlers and route registration

pub mod forecast;
pub mod health;
pub mod openapi;

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
    routing::get,
    Router,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, AppState};

/// Header carrying the function key
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";

/// Extractor enforcing the configured function key.
///
/// The key is read from the `x-functions-key` header, falling back to the
/// `code` query parameter. Always succeeds when no key is configured.
pub struct FunctionKey;

#[derive(Deserialize)]
struct KeyQuery {
    code: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for FunctionKey {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.config.auth.function_key.as_deref() else {
            return Ok(FunctionKey);
        };

        let provided = parts
            .headers
            .get(FUNCTION_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .or_else(|| {
                Query::<KeyQuery>::try_from_uri(&parts.uri)
                    .ok()
                    .and_then(|Query(q)| q.code)
            })
            .ok_or_else(|| AppError::Authentication("Missing function key".to_string()))?;

        // Compare SHA-256 digests
        if Sha256::digest(provided.as_bytes()) != Sha256::digest(expected.as_bytes()) {
            return Err(AppError::Authentication("Invalid function key".to_string()));
        }

        Ok(FunctionKey)
    }
}

/// Short fingerprint of a key, safe to log
pub fn key_fingerprint(key: &str) -> String {
    hex::encode(&Sha256::digest(key.as_bytes())[..4])
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Forecast
        .route("/http_trigger/:equipment_id", get(forecast::http_trigger))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        config::AppConfig,
        forecast::YearMonth,
        models::reservation::ReservationCount,
        repository::MockReservationStore,
        services::Services,
    };

    fn app(store: MockReservationStore, function_key: Option<&str>) -> Router {
        let mut config = AppConfig::default();
        config.auth.function_key = function_key.map(str::to_owned);
        let services = Services::new(
            Arc::new(store),
            config.forecast.clone(),
            config.forecast.fit_timeout(),
        );
        create_router(AppState {
            config: Arc::new(config),
            services: Arc::new(services),
        })
    }

    fn monthly_rows(last: YearMonth, n: i64) -> Vec<ReservationCount> {
        (0..n)
            .map(|i| {
                let ym = last.offset(i - n + 1);
                ReservationCount {
                    year: ym.year,
                    month: ym.month as i32,
                    count: 5 + (i * 5 % 9) + if (6..=8).contains(&ym.month) { 20 } else { 0 },
                }
            })
            .collect()
    }

    async fn call(app: Router, uri: &str, key: Option<&str>) -> (StatusCode, String, Vec<u8>) {
        let mut request = Request::builder().uri(uri);
        if let Some(key) = key {
            request = request.header(FUNCTION_KEY_HEADER, key);
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, body.to_vec())
    }

    #[tokio::test]
    async fn test_forecast_success() {
        let mut store = MockReservationStore::new();
        store
            .expect_monthly_counts()
            .withf(|id| id == "eq-17")
            .times(1)
            .returning(|_| Ok(monthly_rows(YearMonth::new(2024, 12).unwrap(), 36)));

        let (status, content_type, body) = call(app(store, None), "/api/http_trigger/eq-17", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.starts_with("application/json"));

        let points: Value = serde_json::from_slice(&body).unwrap();
        let points = points.as_array().unwrap();
        assert_eq!(points.len(), 6);
        assert_eq!(points[0]["year"], 2025);
        assert_eq!(points[0]["month"], 1);
        for point in points {
            assert!(point["count"].is_i64());
        }
    }

    #[tokio::test]
    async fn test_forecast_without_history_is_404_text() {
        let mut store = MockReservationStore::new();
        store
            .expect_monthly_counts()
            .times(1)
            .returning(|_| Ok(Vec::new()));

        let (status, content_type, body) = call(app(store, None), "/api/http_trigger/99", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(
            String::from_utf8(body).unwrap(),
            "No reservation data found for equipment 99"
        );
    }

    #[tokio::test]
    async fn test_forecast_with_short_history_is_422() {
        let mut store = MockReservationStore::new();
        store.expect_monthly_counts().returning(|_| {
            Ok((1..=12)
                .map(|month| ReservationCount {
                    year: 2023,
                    month,
                    count: 5,
                })
                .collect())
        });

        let (status, _, body) = call(app(store, None), "/api/http_trigger/3", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "ModelFitting");
    }

    #[tokio::test]
    async fn test_invalid_month_is_422_malformed_input() {
        let mut store = MockReservationStore::new();
        store.expect_monthly_counts().returning(|_| {
            let mut rows = monthly_rows(YearMonth::new(2024, 12).unwrap(), 24);
            rows[5].month = 13;
            Ok(rows)
        });

        let (status, content_type, body) = call(app(store, None), "/api/http_trigger/8", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(content_type.starts_with("application/json"));
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["error"], "MalformedInput");
        assert_eq!(error["code"], 6);
    }

    #[tokio::test]
    async fn test_database_failure_is_500() {
        let mut store = MockReservationStore::new();
        store
            .expect_monthly_counts()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let (status, _, body) = call(app(store, None), "/api/http_trigger/3", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let error: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["message"], "Database error");
    }

    #[tokio::test]
    async fn test_function_key_required_when_configured() {
        let mut store = MockReservationStore::new();
        store.expect_monthly_counts().never();

        let app = app(store, Some("s3cret"));
        let (status, _, _) = call(app.clone(), "/api/http_trigger/1", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _, _) = call(app, "/api/http_trigger/1", Some("wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_function_key_accepted_from_header_or_query() {
        let mut store = MockReservationStore::new();
        store
            .expect_monthly_counts()
            .times(2)
            .returning(|_| Ok(Vec::new()));

        let app = app(store, Some("s3cret"));
        let (status, _, _) = call(app.clone(), "/api/http_trigger/1", Some("s3cret")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = call(app, "/api/http_trigger/1?code=s3cret", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_is_anonymous() {
        let (status, _, body) = call(
            app(MockReservationStore::new(), Some("s3cret")),
            "/api/health",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let health: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readiness_reflects_store() {
        let mut store = MockReservationStore::new();
        store.expect_ping().times(1).returning(|| Ok(()));
        let (status, _, _) = call(app(store, None), "/api/ready", None).await;
        assert_eq!(status, StatusCode::OK);

        let mut store = MockReservationStore::new();
        store
            .expect_ping()
            .returning(|| Err(AppError::Database(sqlx::Error::PoolClosed)));
        let (status, _, _) = call(app(store, None), "/api/ready", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_key_fingerprint_is_stable() {
        assert_eq!(key_fingerprint("abc"), "ba7816bf");
        assert_eq!(key_fingerprint("abc").len(), 8);
    }
}
