//! # Notification Hook
//!
//! Fire-and-forget event emission after state changes commit.
//!
//! The hook runs OUTSIDE the persistence transaction: a failed emit is
//! logged and swallowed, never propagated to the caller and never able to
//! roll back a committed sale. Downstream consumers (label printers, BI
//! exports) must tolerate missed events.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

/// A state change worth telling the outside world about.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SaleCompleted {
        sale_id: String,
        invoice_number: String,
        total_cents: i64,
    },
    SaleRefunded {
        sale_id: String,
    },
    PaymentReceived {
        sale_id: String,
        amount_cents: i64,
        balance_cents: i64,
    },
    GoldBuyCreated {
        ticket_id: String,
        ticket_number: String,
        payout_cents: i64,
    },
    GoldBuyCancelled {
        ticket_id: String,
    },
}

/// Emission failure. Only ever logged by the services.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receiver for engine events.
///
/// Implementations must be cheap and non-blocking; anything slow should
/// queue internally.
pub trait NotificationHook: Send + Sync {
    fn emit(&self, event: &EngineEvent) -> Result<(), NotifyError>;
}

/// Default hook: writes events to the log and nothing else.
#[derive(Debug, Default, Clone)]
pub struct LoggingHook;

impl NotificationHook for LoggingHook {
    fn emit(&self, event: &EngineEvent) -> Result<(), NotifyError> {
        info!(event = ?event, "Engine event");
        Ok(())
    }
}

/// Emits an event, logging (and dropping) any failure.
pub(crate) fn emit_quietly(hook: &dyn NotificationHook, event: EngineEvent) {
    if let Err(e) = hook.emit(&event) {
        warn!(error = %e, event = ?event, "Notification hook failed, continuing");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
