use actix_web::http::header::{CacheControl, CacheDirective, ContentType};
use actix_web::{get, web, HttpResponse};
use log::{error, warn};

use crate::bcrp::BcrpClient;
use crate::error::ApiError;
use crate::exchange_rate::lima_today;
use crate::resolver::RateResolver;

/// Browser cache for the current rate.
const RATE_MAX_AGE: u32 = 300;
/// Browser cache for the history chart.
const HISTORY_MAX_AGE: u32 = 3600;

pub struct AppState {
    pub resolver: RateResolver,
    pub history: BcrpClient,
    pub history_days: u64,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(tipo_cambio).service(historial_tc);
}

fn public_cache(max_age: u32) -> CacheControl {
    CacheControl(vec![CacheDirective::Public, CacheDirective::MaxAge(max_age)])
}

#[get("/api/tipo-cambio")]
async fn tipo_cambio(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let record = state.resolver.resolve().await;
    let body = serde_json::to_string(&record).map_err(|e| {
        error!("Failed to serialise rate: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .insert_header(public_cache(RATE_MAX_AGE))
        .body(body))
}

#[get("/api/historial-tc")]
async fn historial_tc(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let points = state
        .history
        .history(lima_today(), state.history_days)
        .await
        .map_err(|e| {
            warn!("Rate history unavailable: {}", e);
            ApiError::from(e)
        })?;

    Ok(HttpResponse::Ok()
        .insert_header(public_cache(HISTORY_MAX_AGE))
        .json(points))
}
