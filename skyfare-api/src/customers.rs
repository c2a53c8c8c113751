use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use skyfare_core::Customer;

use crate::auth::decode_claims;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PassportRequest {
    passport_number: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PassportResponse {
    success: bool,
    message: String,
    passport: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    success: bool,
    customer: Customer,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/customers/me", get(profile))
        .route("/v1/customers/me/passport", put(update_passport))
}

async fn profile(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<ProfileResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;
    let customer = state
        .customers
        .find_customer(&claims.sub)
        .await?
        .ok_or_else(|| AppError::AuthenticationError("Unknown customer".into()))?;

    Ok(Json(ProfileResponse {
        success: true,
        customer,
    }))
}

async fn update_passport(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<PassportRequest>,
) -> Result<Json<PassportResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;

    if req.passport_number.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Passport number must not be empty".into(),
        ));
    }

    state
        .customers
        .set_passport_number(&claims.sub, req.passport_number.trim())
        .await?;

    Ok(Json(PassportResponse {
        success: true,
        message: "Passport number registered.".into(),
        passport: req.passport_number.trim().to_owned(),
    }))
}
