//! Audit record data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured summary of one intercepted request, its input, and its outcome.
///
/// One record exists per intercepted request. It is assembled automatically
/// at request entry, may be customized by the handler through an
/// [`Overlay`](crate::Overlay), and is handed to the configured sink exactly
/// once after the handler completes. After emission it is immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Label for the logical operation, assigned at route registration.
    pub name: String,
    /// Request path, without the query string.
    pub path: String,
    /// HTTP method; one of GET, POST, PUT, DELETE, PATCH.
    pub method: String,
    /// Request payload summary: the raw query string for GET requests, a
    /// content-type-tagged body for the other methods.
    pub condition: String,
    /// Outcome of the operation. Defaults to the response body text unless
    /// the handler overrides it.
    pub result: String,
    /// Identity of the acting user, settable only through an overlay.
    pub user_id: Option<i64>,
    /// Stamped once, when the record is finalized after the handler returns.
    pub created_at: Option<DateTime<Utc>>,
    /// Peer address with any port suffix stripped.
    pub remote_addr: String,
    /// Client address resolved from proxy headers, falling back to the raw
    /// peer address.
    pub real_ip: String,
    /// Free-form extension field, overlay-only.
    pub ext1: String,
    /// Free-form extension field, overlay-only.
    pub ext2: String,
    /// Free-form integer extension field, overlay-only.
    pub ext_int1: i64,
    /// Free-form integer extension field, overlay-only.
    pub ext_int2: i64,
}
