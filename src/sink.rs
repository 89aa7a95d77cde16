//! Emission sinks for finalized audit records

use crate::record::AuditRecord;

/// Receives each finalized [`AuditRecord`] exactly once per intercepted
/// request.
///
/// A sink is shared across all requests on a route and may be called
/// concurrently; implementations are responsible for their own internal
/// synchronization. Closures work directly:
///
/// ```
/// use axum_audit::{AuditLayer, AuditRecord};
///
/// let layer = AuditLayer::new("create-item")
///     .with_sink(|record: AuditRecord| println!("{}", record.name));
/// ```
pub trait AuditSink: Send + Sync {
    fn emit(&self, record: AuditRecord);
}

impl<F> AuditSink for F
where
    F: Fn(AuditRecord) + Send + Sync,
{
    fn emit(&self, record: AuditRecord) {
        self(record)
    }
}

/// Default sink; discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl AuditSink for NoopSink {
    fn emit(&self, _record: AuditRecord) {}
}

/// Sink that writes each record as a structured tracing event at INFO level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn emit(&self, record: AuditRecord) {
        tracing::info!(
            name = %record.name,
            method = %record.method,
            path = %record.path,
            condition = %record.condition,
            result = %record.result,
            user_id = ?record.user_id,
            remote_addr = %record.remote_addr,
            real_ip = %record.real_ip,
            "audit record emitted"
        );
    }
}
