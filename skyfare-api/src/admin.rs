use axum::{extract::State, routing::get, Json, Router};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::Serialize;

use skyfare_core::repository::{AirlineSales, CustomerRanking};

use crate::auth::{decode_claims, require_admin};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AirlineSalesResponse {
    success: bool,
    airlines: Vec<AirlineSales>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerRankingResponse {
    success: bool,
    customers: Vec<CustomerRanking>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/reports/airline-sales", get(airline_sales))
        .route("/v1/admin/reports/customer-ranking", get(customer_ranking))
}

async fn airline_sales(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<AirlineSalesResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;
    require_admin(&claims)?;

    let airlines = state.history.airline_sales().await?;
    Ok(Json(AirlineSalesResponse {
        success: true,
        airlines,
    }))
}

async fn customer_ranking(
    State(state): State<AppState>,
    TypedHeader(Authorization(bearer)): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<CustomerRankingResponse>, AppError> {
    let claims = decode_claims(bearer.token(), &state.auth.secret)?;
    require_admin(&claims)?;

    let customers = state.history.customer_ranking().await?;
    Ok(Json(CustomerRankingResponse {
        success: true,
        customers,
    }))
}
