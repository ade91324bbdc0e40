//! HTTP route handlers for the read API

use super::AppState;
use crate::db::{hosts, utmp};
use crate::error::CoreError;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

// ============================================================================
// Health Check
// ============================================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

fn internal_error(e: CoreError) -> axum::response::Response {
    tracing::error!("Read query failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": e.to_string() })),
    )
        .into_response()
}

// ============================================================================
// Hosts
// ============================================================================

pub async fn list_hosts(State(state): State<AppState>) -> impl IntoResponse {
    let result = state
        .db
        .with_conn(|conn| hosts::list_hosts(conn))
        .await
        .and_then(|r| r.map_err(CoreError::from));

    match result {
        Ok(hosts) => Json(serde_json::json!({
            "total": hosts.len(),
            "hosts": hosts,
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn get_host(
    State(state): State<AppState>,
    Path(host): Path<String>,
) -> impl IntoResponse {
    let lookup = host.clone();
    let result = state
        .db
        .with_conn(
            move |conn| -> rusqlite::Result<Option<(hosts::Host, Vec<utmp::StoredSession>)>> {
                let Some(row) = hosts::get_host(conn, &lookup)? else {
                    return Ok(None);
                };
                let sessions = utmp::list_for_host(conn, &lookup)?;
                Ok(Some((row, sessions)))
            },
        )
        .await
        .and_then(|r| r.map_err(CoreError::from));

    match result {
        Ok(Some((row, sessions))) => Json(serde_json::json!({
            "host": row,
            "sessions": sessions,
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("host not found: {}", host) })),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub user: Option<String>,
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> impl IntoResponse {
    let result = state
        .db
        .with_conn(move |conn| utmp::list_sessions(conn, query.user.as_deref()))
        .await
        .and_then(|r| r.map_err(CoreError::from));

    match result {
        Ok(sessions) => Json(serde_json::json!({
            "total": sessions.len(),
            "sessions": sessions,
        }))
        .into_response(),
        Err(e) => internal_error(e),
    }
}
