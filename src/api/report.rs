//! Report endpoint: resolves host and action, then hands off to the handlers.
//!
//! Responses are single plain-text lines. Rejections happen before the
//! audit log or the database are touched.

use super::AppState;
use crate::handlers::{Action, RequestContext};
use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        ConnectInfo, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use std::net::SocketAddr;

pub const OK: &str = "OK\n";
pub const NO_DATA: &str = "error: no data\n";

/// Form fields of a report
#[derive(Debug, Default)]
pub struct ReportForm {
    pub fqdn: Option<String>,
    pub host: Option<String>,
    pub action: Option<String>,
    pub utmp: Option<String>,
}

impl ReportForm {
    /// Fold decoded key/value pairs into the form. A repeated key keeps its
    /// last value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = ReportForm::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "fqdn" => &mut form.fqdn,
                "host" => &mut form.host,
                "action" => &mut form.action,
                "utmp" => &mut form.utmp,
                _ => continue,
            };
            *slot = Some(value);
        }
        form
    }
}

/// Why a report was turned away before any action ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    HostNotSpecified,
    ActionNotSpecified,
    UnknownAction,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::HostNotSpecified => "Host not specified\n",
            Rejection::ActionNotSpecified => "Action not specified\n",
            Rejection::UnknownAction => "Unknown action\n",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        self.message().into_response()
    }
}

/// Non-empty `fqdn` wins over non-empty `host`; no normalization is applied
pub fn resolve_host<'a>(fqdn: Option<&'a str>, host: Option<&'a str>) -> Option<&'a str> {
    fqdn.filter(|s| !s.is_empty())
        .or_else(|| host.filter(|s| !s.is_empty()))
}

/// The form body's `action` takes precedence over the query string's
pub fn resolve_action(form: Option<&str>, query: Option<&str>) -> Result<Action, Rejection> {
    let name = form.or(query).ok_or(Rejection::ActionNotSpecified)?;
    Action::from_name(name).ok_or(Rejection::UnknownAction)
}

/// Client address: the socket peer, or the first `X-Forwarded-For` hop when trusted
fn remote_addr(peer: SocketAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(addr) = forwarded {
            return addr.to_string();
        }
    }
    peer.ip().to_string()
}

/// POST / - apply one report
pub async fn report(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    query: std::result::Result<Query<Vec<(String, String)>>, QueryRejection>,
    form: std::result::Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Response {
    // Only `action` is read from the query string
    let query = match query {
        Ok(Query(pairs)) => ReportForm::from_pairs(pairs),
        Err(e) => {
            tracing::debug!("Unreadable query string, ignoring it: {}", e);
            ReportForm::default()
        }
    };
    let form = match form {
        Ok(Form(pairs)) => ReportForm::from_pairs(pairs),
        Err(e) => {
            tracing::debug!("Unreadable report body, treating as empty: {}", e);
            ReportForm::default()
        }
    };

    let Some(host) = resolve_host(form.fqdn.as_deref(), form.host.as_deref()) else {
        return Rejection::HostNotSpecified.into_response();
    };

    let action = match resolve_action(form.action.as_deref(), query.action.as_deref()) {
        Ok(action) => action,
        Err(rejection) => return rejection.into_response(),
    };

    let ctx = RequestContext {
        host: host.to_string(),
        remote_addr: remote_addr(peer, &headers, state.trust_forwarded_for),
        payload: form.utmp,
    };

    state.audit.record(action, &ctx);

    let host = ctx.host.clone();
    match state.handler.handle(action, ctx).await {
        Ok(()) => OK.into_response(),
        Err(e) if e.is_payload_error() => {
            tracing::debug!(host = %host, action = %action, "Rejected payload: {}", e);
            NO_DATA.into_response()
        }
        Err(e) => {
            tracing::error!(host = %host, action = %action, "Report failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
