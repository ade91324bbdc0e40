//! Business logic handlers
//!
//! These handlers turn a resolved report into Session Store and Host
//! Registry mutations. The HTTP layer only resolves the request and renders
//! the outcome.

pub mod action;
pub mod payload;

pub use action::Action;

use crate::db::Database;
use crate::error::Result;
use std::sync::Arc;

/// Everything a handler needs to know about the request it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Reporting host identity, exactly as submitted
    pub host: String,
    /// Network address the request came from
    pub remote_addr: String,
    /// Raw `utmp` form field, if any
    pub payload: Option<String>,
}

impl RequestContext {
    /// Byte length of the raw payload (0 when absent)
    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, String::len)
    }
}

/// Report handler: runs actions against the database
#[derive(Clone)]
pub struct ReportHandler {
    db: Arc<Database>,
}

impl ReportHandler {
    pub fn new(db: Arc<Database>) -> Self {
        ReportHandler { db }
    }

    /// Apply `action` for the reporting host, stamping writes with the current time
    pub async fn handle(&self, action: Action, ctx: RequestContext) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        self.db
            .with_conn(move |conn| action.apply(conn, &ctx, now))
            .await?
    }
}
