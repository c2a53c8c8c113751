use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    customer_id: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    success: bool,
    token: String,
    name: String,
    is_admin: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/auth/login", post(login))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let customer = state
        .customers
        .verify_credentials(&req.customer_id, &req.password)
        .await?
        .ok_or_else(|| {
            AppError::AuthenticationError("Customer id or password does not match".into())
        })?;

    let role = if customer.is_admin {
        ROLE_ADMIN
    } else {
        ROLE_CUSTOMER
    };
    let claims = Claims {
        sub: customer.customer_id.clone(),
        email: customer.email.clone(),
        role: role.to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.auth.secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))?;

    Ok(Json(LoginResponse {
        success: true,
        token,
        name: customer.name,
        is_admin: customer.is_admin,
    }))
}

/// Decodes and validates a bearer token, yielding the request-scoped
/// identity every protected handler passes down into the booking core.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::AuthenticationError(e.to_string()))
}

pub fn require_admin(claims: &Claims) -> Result<(), AppError> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(AppError::AuthorizationError(
            "Administrator access required".into(),
        ))
    }
}
