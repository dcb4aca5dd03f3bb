use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};

use crate::{
    AppState,
    error::{AppError, Result},
    store::{HealthStatus, HitResult, Stats},
};

use super::model::{HitRequest, ResetResponse};

// 记录一次访问，会话ID等字段只做校验不落库
#[axum::debug_handler]
pub async fn record_hit(
    State(state): State<AppState>,
    payload: std::result::Result<Json<HitRequest>, JsonRejection>,
) -> Result<Json<HitResult>> {
    let Json(req) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let missing = req.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let result = state.store.record_hit().await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>> {
    Ok(Json(state.store.get_stats().await?))
}

#[axum::debug_handler]
pub async fn reset_stats(State(state): State<AppState>) -> Result<Json<ResetResponse>> {
    state.store.reset().await?;
    Ok(Json(ResetResponse {
        success: true,
        message: "Statistics have been reset",
    }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(state.store.health_check())
}
