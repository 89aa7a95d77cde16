//! Audit-specific error types

use thiserror::Error;

/// Errors surfaced to handler code by the overlay binding.
///
/// Capture-time failures (an unreadable body, a malformed multipart form)
/// are recovered locally and logged; they leave `condition` empty but never
/// appear here and never affect the HTTP response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    /// No record is bound to the current request: either the audit layer was
    /// not installed on this route, or the record has already been emitted.
    #[error("no active audit record for this request")]
    NoActiveRecord,
}
