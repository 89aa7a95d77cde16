//! Audit trail middleware for axum
//!
//! This crate intercepts requests on selected routes, captures what was
//! asked and what was answered, and hands a structured [`AuditRecord`] to a
//! configurable sink — one record per request, emitted exactly once after
//! the handler completes.
//!
//! # Architecture
//!
//! - **Capture**: before the handler runs, the method, path, client address
//!   and payload are extracted. Request bodies are buffered and restored, so
//!   the handler still sees an unconsumed body. Multipart forms are reduced
//!   to their non-file fields; file content is never inlined.
//! - **Customization**: the in-flight record is bound to the request through
//!   an [`AuditHandle`] extension. Handlers layer overrides onto it with a
//!   typed, chainable [`Overlay`] — condition, result, user identity, and
//!   extension fields. Overlay values always win over captured ones.
//! - **Emission**: after the handler returns, the response body is buffered
//!   (the client receives the identical bytes), an empty `result` is filled
//!   from it, the completion time is stamped, and the finished record goes
//!   to the configured [`AuditSink`].
//!
//! Only GET, POST, PUT, DELETE, and PATCH requests are audited; other
//! methods pass through untouched. Audit failures are invisible to the
//! client: a body that cannot be read or parsed only leaves `condition`
//! empty, it never fails the request.
//!
//! # Usage
//!
//! ```no_run
//! use axum::{routing::post, Extension, Router};
//! use axum_audit::{AuditHandle, AuditLayer, AuditRecord, Overlay};
//!
//! async fn create_item(Extension(audit): Extension<AuditHandle>) -> &'static str {
//!     // Override what was captured automatically.
//!     let _ = Overlay::new().result("OK").user_id(42).apply(&audit);
//!     "created"
//! }
//!
//! let app: Router = Router::new().route(
//!     "/items",
//!     post(create_item).layer(
//!         AuditLayer::new("create-item")
//!             .with_sink(|record: AuditRecord| println!("{record:?}")),
//!     ),
//! );
//! ```

mod capture;
mod error;
mod handle;
mod middleware;
mod overlay;
mod record;
mod sink;


pub use error::AuditError;
pub use handle::AuditHandle;
pub use middleware::{AuditLayer, AuditMiddleware};
pub use overlay::Overlay;
pub use record::AuditRecord;
pub use sink::{AuditSink, NoopSink, TracingSink};
