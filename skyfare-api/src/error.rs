use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use skyfare_core::{BookingError, StoreError};

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    Booking(BookingError),
    InternalServerError(String),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError::Booking(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Booking(BookingError::Persistence(err))
    }
}

fn booking_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::SeatsUnavailable
        | BookingError::DuplicateReservation
        | BookingError::AlreadyCancelled => StatusCode::CONFLICT,
        BookingError::ReservationNotFound => StatusCode::NOT_FOUND,
        BookingError::DepartedAlready => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::NotificationFailed => StatusCode::BAD_GATEWAY,
        BookingError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Booking(err) => {
                if let BookingError::Persistence(source) = &err {
                    tracing::error!("persistence failure: {}", source);
                }
                (booking_status(&err), err.to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}
