//! Audit trail of dispatched report actions.
//!
//! Every accepted action is recorded on the `rwho::audit` tracing target.
//! The subscriber installed by the binary may route that target to a
//! rotated file through a non-blocking writer, so recording never waits on
//! I/O and never fails the request.

use crate::handlers::{Action, RequestContext};
use std::fmt::Write as _;

/// Tracing target carrying audit events
pub const AUDIT_TARGET: &str = "rwho::audit";

/// Records one line per dispatched action
#[derive(Debug, Clone, Copy)]
pub struct AuditLogger {
    enabled: bool,
}

impl AuditLogger {
    pub fn new(enabled: bool) -> Self {
        AuditLogger { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record that `action` is about to run for `ctx`
    pub fn record(&self, action: Action, ctx: &RequestContext) {
        if !self.enabled {
            return;
        }
        tracing::info!(
            target: AUDIT_TARGET,
            "{}",
            format_entry(action, ctx)
        );
    }
}

/// Render an audit line: `addr=<addr> host=<escaped host> action=<name> data=<bytes>`
pub fn format_entry(action: Action, ctx: &RequestContext) -> String {
    format!(
        "addr={} host={} action={} data={}",
        ctx.remote_addr,
        escape_control(&ctx.host),
        action,
        ctx.payload_len()
    )
}

/// Backslash-escape ASCII control characters (0x00-0x1F).
///
/// The usual C mnemonics are used where one exists, octal otherwise, so a
/// hostile host name cannot inject line breaks into the log.
pub fn escape_control(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\{:03o}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}


#[cfg(test)]
pub(crate) mod testing {
    use super::AUDIT_TARGET;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::subscriber::DefaultGuard;
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Counts events on the audit target
    #[derive(Clone, Default)]
    pub(crate) struct AuditCounter(Arc<AtomicUsize>);

    impl AuditCounter {
        pub(crate) fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }

        /// Make this counter the current thread's subscriber until the guard drops
        pub(crate) fn install(&self) -> DefaultGuard {
            tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
        }
    }

    impl<S: Subscriber> Layer<S> for AuditCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if event.metadata().target() == AUDIT_TARGET {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}
