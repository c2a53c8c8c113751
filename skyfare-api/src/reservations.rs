use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use skyfare_booking::{CancelCommand, ReserveCommand};
use skyfare_core::repository::{CancellationHistoryEntry, ReservationHistoryEntry};
use skyfare_core::OfferingKey;

use crate::auth::decode_claims;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReserveRequest {
    #[serde(flatten)]
    key: OfferingKey,
    payment_amount: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReserveResponse {
    success: bool,
    message: String,
    email: String,
    payment_amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelRequest {
    #[serde(flatten)]
    key: OfferingKey,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelResponse {
    success: bool,
    message: String,
    refund: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReservationHistoryResponse {
    success: bool,
    reservations: Vec<ReservationHistoryEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancellationHistoryResponse {
    success: bool,
    cancellations: Vec<CancellationHistoryEntry>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(reserve))
        .route("/v1/reservations/cancel", post(cancel))
        .route("/v1/reservations/history", get(reservation_history))
        .route("/v1/cancellations/history", get(cancellation_history))
}

async fn reserve(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<ReserveRequest>,
) -> Result<Json<ReserveResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;

    let cmd = ReserveCommand {
        customer_id: claims.sub,
        customer_email: claims.email,
        key: req.key,
        payment_amount: req.payment_amount,
    };
    let receipt = state.reservations.reserve(&cmd).await?;

    Ok(Json(ReserveResponse {
        success: true,
        message: "Reservation complete; a confirmation email is on its way.".into(),
        email: receipt.email,
        payment_amount: receipt.payment_amount,
    }))
}

async fn cancel(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<CancelResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;

    let cmd = CancelCommand {
        customer_id: claims.sub,
        key: req.key,
    };
    let receipt = state.cancellations.cancel(&cmd).await?;

    Ok(Json(CancelResponse {
        success: true,
        message: "The reservation was cancelled.".into(),
        refund: receipt.refund_amount,
    }))
}

async fn reservation_history(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<ReservationHistoryResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;
    let reservations = state.history.reservations_for(&claims.sub).await?;
    Ok(Json(ReservationHistoryResponse {
        success: true,
        reservations,
    }))
}

async fn cancellation_history(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<CancellationHistoryResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;
    let cancellations = state.history.cancellations_for(&claims.sub).await?;
    Ok(Json(CancellationHistoryResponse {
        success: true,
        cancellations,
    }))
}
