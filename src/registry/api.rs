//! REST API handlers for the reference bed registry
//!
//! Errors are answered as `{"message": "..."}` with 400 for invalid input,
//! 401 for missing credentials, 404 for unknown beds and 409 for state
//! conflicts.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequestParts, Path, State,
    },
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::models::{Bed, BedStats, BookingRequest};

use super::client::{LoginRequest, LoginResponse, UserProfile};
use super::server::AppState;
use super::{BedRegistry, RegistryError};

// ============================================================================
// API Response Types
// ============================================================================

/// Error body understood by `RegistryClient`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Registry error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub RegistryError);

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        Self(err)
    }
}

// Extractor rejections keep the `{"message"}` shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(RegistryError::Rejected {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        })
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(RegistryError::Rejected {
            status: rejection.status().as_u16(),
            message: rejection.body_text(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::new(self.0.user_message()))).into_response()
    }
}

/// Initialization acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub message: String,
    pub count: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        // Auth endpoints
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/profile", get(profile))
        // Bed endpoints
        .route("/api/beds", get(list_beds))
        .route("/api/beds/initialize", post(initialize_beds))
        .route("/api/beds/available", get(list_available))
        .route("/api/beds/booked", get(list_booked))
        .route("/api/beds/stats", get(bed_stats))
        .route("/api/beds/{id}/book", post(book_bed))
        .route("/api/beds/{id}/unbook", post(unbook_bed))
        .with_state(state)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

async fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if !state.auth.is_required() {
        return Ok(());
    }
    match bearer_token(headers) {
        Some(token) if state.auth.accepts(token).await => Ok(()),
        _ => Err(ApiError(RegistryError::Unauthorized)),
    }
}

/// Request carried an accepted credential.
///
/// Runs before path and body extraction, so unauthenticated requests get a
/// 401 whatever their body.
pub struct Authorized;

impl FromRequestParts<AppState> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        authorize(state, &parts.headers).await.map(|()| Self)
    }
}

// ============================================================================
// Health Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

// ============================================================================
// Auth Handlers
// ============================================================================

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = body?;
    match state.auth.login(&request.email, &request.password).await {
        Some(token) => {
            tracing::info!(email = %request.email, "Login succeeded");
            Ok(Json(LoginResponse {
                token,
                user: Some(UserProfile {
                    email: request.email,
                    name: None,
                }),
            }))
        }
        None => {
            tracing::warn!(email = %request.email, "Login rejected");
            Err(ApiError(RegistryError::Unauthorized))
        }
    }
}

/// Revoke the presented token; always succeeds
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<ErrorResponse> {
    if let Some(token) = bearer_token(&headers) {
        if state.auth.revoke(token).await {
            tracing::info!("Token revoked");
        }
    }
    Json(ErrorResponse::new("Logged out"))
}

async fn profile(
    State(state): State<AppState>,
    _auth: Authorized,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let email = match bearer_token(&headers) {
        Some(token) => state.auth.email_for(token).await,
        None => None,
    };
    Ok(Json(UserProfile {
        email: email.unwrap_or_default(),
        name: None,
    }))
}

// ============================================================================
// Bed Handlers
// ============================================================================

async fn list_beds(
    State(state): State<AppState>,
    _auth: Authorized,
) -> Result<Json<Vec<Bed>>, ApiError> {
    Ok(Json(state.registry.get_all().await?))
}

async fn initialize_beds(
    State(state): State<AppState>,
    _auth: Authorized,
) -> Result<Json<InitializeResponse>, ApiError> {
    state.registry.initialize().await?;
    Ok(Json(InitializeResponse {
        message: "Beds initialized successfully".to_string(),
        count: state.registry.len().await,
    }))
}

async fn list_available(
    State(state): State<AppState>,
    _auth: Authorized,
) -> Result<Json<Vec<Bed>>, ApiError> {
    Ok(Json(state.registry.get_available().await?))
}

async fn list_booked(
    State(state): State<AppState>,
    _auth: Authorized,
) -> Result<Json<Vec<Bed>>, ApiError> {
    Ok(Json(state.registry.get_booked().await?))
}

async fn bed_stats(
    State(state): State<AppState>,
    _auth: Authorized,
) -> Result<Json<BedStats>, ApiError> {
    Ok(Json(state.registry.get_stats().await?))
}

async fn book_bed(
    State(state): State<AppState>,
    _auth: Authorized,
    path: Result<Path<u32>, PathRejection>,
    body: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<Json<Bed>, ApiError> {
    let Path(id) = path?;
    let Json(request) = body?;
    Ok(Json(state.registry.book(id, &request).await?))
}

async fn unbook_bed(
    State(state): State<AppState>,
    _auth: Authorized,
    path: Result<Path<u32>, PathRejection>,
) -> Result<Json<Bed>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.registry.unbook(id).await?))
}
