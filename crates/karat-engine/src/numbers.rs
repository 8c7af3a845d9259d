//! Business-number generation.
//!
//! Every aggregate carries two identities: a UUID for relations and a
//! human-readable number for receipts and phone calls. Numbers are
//! date-stamped with a random suffix; the UNIQUE column constraint is the
//! actual uniqueness guarantee.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// `INV-20260829-3F9A2C`
pub fn invoice_number(at: DateTime<Utc>) -> String {
    format!("INV-{}-{}", at.format("%Y%m%d"), random_suffix())
}

/// `GB-20260829-3F9A2C`
pub fn ticket_number(at: DateTime<Utc>) -> String {
    format!("GB-{}-{}", at.format("%Y%m%d"), random_suffix())
}

fn random_suffix() -> String {
    let id = Uuid::new_v4().simple().to_string();
    id[..6].to_uppercase()
}
