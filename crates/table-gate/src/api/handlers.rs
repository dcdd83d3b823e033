//! HTTP request handlers.

use super::middleware::client_ip;
use super::types::{
    BlockedResponse, HealthResponse, MessageResponse, PublicConfigResponse, QrUrl,
    QrUrlsResponse, RegisterRequest, RegisterResponse, ScanQuery, ScanResponse,
    SessionsResponse, StatusUpdateRequest, SuccessResponse, TableStatusResponse,
    ValidateResponse,
};
use super::AppState;
use crate::error::{ErrorResponse, GateError, Rejection};
use crate::registration::Validation;
use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header::HOST, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use tracing::{error, info};

/// Customer-facing routes answer policy declines with 200 and a structured
/// body; only unexpected failures use an error status.
fn decline(rejection: Rejection) -> Response {
    Json(ErrorResponse {
        success: false,
        error: rejection.to_string(),
        code: rejection.code().to_string(),
    })
    .into_response()
}

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let workflow = &state.workflow;

    Json(HealthResponse {
        status: "ok".to_string(),
        venue: state.config.venue.name.clone(),
        tables: state.config.venue.total_tables,
        hours: state.config.hours_label(),
        is_open: workflow.is_open(),
        active_sessions: workflow.sessions().count_active().await,
    })
}

/// Signed QR URLs for every table.
pub async fn qr_urls(State(state): State<AppState>, headers: HeaderMap) -> Json<QrUrlsResponse> {
    let base = match &state.config.token.public_base_url {
        Some(url) => url.clone(),
        None => {
            let host = headers
                .get(HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or("localhost");
            format!("https://{}", host)
        }
    };

    let signer = state.workflow.signer();
    let urls = state
        .workflow
        .policy()
        .tables()
        .map(|table| QrUrl {
            url: signer.qr_url(&base, &table),
            table,
        })
        .collect();

    Json(QrUrlsResponse {
        success: true,
        urls,
    })
}

/// QR scan landing: verify the token and spend one unit of the IP budget.
pub async fn scan(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(query): Query<ScanQuery>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let ip = client_ip(&headers, connect_info.as_ref());
    let signature = query.sig.unwrap_or_default();

    match state.workflow.scan(&table, &signature, &ip).await {
        Ok(()) => Json(ScanResponse {
            success: true,
            venue: state.config.venue.name.clone(),
            table_number: table,
            signature,
        })
        .into_response(),
        Err(rejection) => {
            info!(code = rejection.code(), "Scan declined");
            decline(rejection)
        }
    }
}

/// Register a phone at a table.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    let ip = client_ip(&headers, connect_info.as_ref());

    let result = state
        .workflow
        .register(
            request.table_number.as_deref().unwrap_or_default(),
            request.phone_number.as_deref().unwrap_or_default(),
            request.signature.as_deref().unwrap_or_default(),
            &ip,
        )
        .await;

    match result {
        Ok(registration) => Json(RegisterResponse {
            success: true,
            action: registration.action,
            message: registration.message,
        })
        .into_response(),
        Err(GateError::Rejected(rejection)) => decline(rejection),
        Err(e) => {
            error!("Registration failed: {}", e);
            e.into_response()
        }
    }
}

/// Whether a phone may order right now.
pub async fn validate_session(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<ValidateResponse>, GateError> {
    let response = match state.workflow.validate(&phone).await? {
        Validation::Valid(session) => ValidateResponse::Valid {
            valid: true,
            phone: session.phone,
            table: session.table,
            status: session.status,
            expires_at: session.expires_at,
        },
        Validation::Invalid { reason, message } => ValidateResponse::Invalid {
            valid: false,
            reason,
            message,
        },
    };

    Ok(Json(response))
}

/// External status update, e.g. PAID from the ordering system.
pub async fn update_status(
    State(state): State<AppState>,
    Path(phone): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<SuccessResponse>, GateError> {
    let success = state.workflow.set_status(&phone, &request.status).await?;
    Ok(Json(SuccessResponse { success }))
}

/// Customer-initiated checkout.
pub async fn end_session(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<SuccessResponse>, GateError> {
    let success = state.workflow.end_session(&phone).await?;
    Ok(Json(SuccessResponse { success }))
}

/// Public venue settings.
pub async fn public_config(State(state): State<AppState>) -> Json<PublicConfigResponse> {
    let config = &state.config;

    Json(PublicConfigResponse {
        venue_name: config.venue.name.clone(),
        staff_phones: config.venue.staff_phones.clone(),
        total_tables: config.venue.total_tables,
        opening_time: config.hours.opening.clone(),
        closing_time: config.hours.closing.clone(),
        auto_approve: config.venue.auto_approve,
    })
}

/// List live sessions.
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    let sessions = state.workflow.list_active().await;

    Json(SessionsResponse {
        success: true,
        count: sessions.len(),
        sessions,
    })
}

/// Floor view: one row per table.
pub async fn table_status(State(state): State<AppState>) -> Json<TableStatusResponse> {
    Json(TableStatusResponse {
        success: true,
        tables: state.workflow.table_status().await,
    })
}

pub async fn approve(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<MessageResponse>, GateError> {
    let session = state.workflow.approve(&phone).await?;
    Ok(Json(MessageResponse::ok(format!(
        "Session approved for {}",
        session.table
    ))))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<MessageResponse>, GateError> {
    state.workflow.reject(&phone).await?;
    Ok(Json(MessageResponse::ok("Session rejected")))
}

pub async fn block(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<MessageResponse>, GateError> {
    state.workflow.block(&phone).await?;
    Ok(Json(MessageResponse::ok(format!("Number blocked: {}", phone))))
}

pub async fn unblock(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<MessageResponse>, GateError> {
    state.workflow.unblock(&phone).await?;
    Ok(Json(MessageResponse::ok(format!("Number unblocked: {}", phone))))
}

pub async fn list_blocked(State(state): State<AppState>) -> Json<BlockedResponse> {
    Json(BlockedResponse {
        success: true,
        blocked: state.workflow.blocked().await,
    })
}

/// Staff-initiated checkout.
pub async fn force_end_session(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<MessageResponse>, GateError> {
    if !state.workflow.end_session(&phone).await? {
        return Err(GateError::NotFound);
    }
    Ok(Json(MessageResponse::ok("Session ended")))
}
