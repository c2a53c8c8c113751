use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use skyfare_core::{FlightOffer, FlightQuery};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    success: bool,
    flights: Vec<FlightOffer>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AirportsResponse {
    success: bool,
    airports: Vec<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/search", get(search_flights))
        .route("/v1/airports", get(list_airports))
}

async fn search_flights(
    State(state): State<AppState>,
    Query(query): Query<FlightQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    // No flights matching is an empty list, not an error.
    let flights = state.catalog.find_flights(&query).await?;
    Ok(Json(SearchResponse {
        success: true,
        flights,
    }))
}

async fn list_airports(
    State(state): State<AppState>,
) -> Result<Json<AirportsResponse>, AppError> {
    let airports = state.catalog.list_airports().await?;
    Ok(Json(AirportsResponse {
        success: true,
        airports,
    }))
}
