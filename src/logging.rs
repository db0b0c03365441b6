//! Structured logging for reconciliation runs.
//!
//! Every order touched by a pass is logged through [`log_order_event`], which
//! wraps the line in an `order_event` span carrying the business order id.
//! Runs themselves are wrapped in a `reconcile_run` span (see [`run_span`])
//! so a failing pass can be picked out of the log stream by its `run_id`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_reconciler::logging::init_tracing;
//!
//! init_tracing("info");
//! ```

use chrono::{DateTime, Utc};
use tracing::{info, info_span, warn, Span};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Repeated calls are ignored.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Order state change event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEvent {
    /// Order was picked up by the pass
    Processing,
    /// Order status was set to cancelled
    Cancelled,
    /// Order was already cancelled; nothing written
    AlreadyCancelled,
    /// Order is in a protected status; nothing written
    Protected,
}

impl std::fmt::Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderEvent::Processing => "processing",
            OrderEvent::Cancelled => "cancelled",
            OrderEvent::AlreadyCancelled => "already_cancelled",
            OrderEvent::Protected => "protected",
        };
        write!(f, "{}", s)
    }
}

/// Log an order state change event.
///
/// # Arguments
///
/// * `event` - The type of order event
/// * `order_id` - The business order identifier (not the primary key)
/// * `details` - Optional additional details about the event
pub fn log_order_event(event: OrderEvent, order_id: &str, details: Option<&str>) {
    let span = info_span!(
        "order_event",
        event = %event,
        order_id = %order_id,
    );
    let _enter = span.enter();

    let message = match event {
        OrderEvent::Processing => "Processing order",
        OrderEvent::Cancelled => "Order status updated to Cancelled",
        OrderEvent::AlreadyCancelled => "Order already cancelled, skipping",
        OrderEvent::Protected => "Order in protected status, not cancelling",
    };

    match (event, details) {
        (OrderEvent::Protected, Some(d)) => warn!(status = %d, "{message}"),
        (OrderEvent::Protected, None) => warn!("{message}"),
        (_, Some(d)) => info!(details = %d, "{message}"),
        (_, None) => info!("{message}"),
    }
}

/// Generate a new unique run ID.
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span that ties together every log line of one reconciliation pass.
pub fn run_span(run_id: &str, run_at: DateTime<Utc>) -> Span {
    info_span!(
        "reconcile_run",
        run_id = %run_id,
        run_at = %run_at.to_rfc3339(),
    )
}
