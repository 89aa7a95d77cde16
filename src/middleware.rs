//! Audit interceptor layer and service
//!
//! The layer wraps a single handler invocation with capture, finalization,
//! and emission:
//! - Requests with a method outside GET/POST/PUT/DELETE/PATCH pass straight
//!   through with no record created and no sink call.
//! - For audited methods, a default record is captured before the handler
//!   runs and bound to the request through an [`AuditHandle`] extension.
//! - The response body is buffered so the audit copy and the client see the
//!   same bytes; status and headers are untouched.
//! - The record is finalized and emitted exactly once, synchronously, on the
//!   request's own task, after the handler has fully completed.

use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::Method,
    response::Response,
};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::capture::capture_default;
use crate::handle::AuditHandle;
use crate::sink::{AuditSink, NoopSink};

/// Audit interceptor layer
///
/// Carries the per-route operation name and the emission sink. The default
/// sink discards every record, so the layer is safe to install before a real
/// sink is wired up.
#[derive(Clone)]
pub struct AuditLayer {
    name: String,
    sink: Arc<dyn AuditSink>,
    multipart_limit: Option<u64>,
}

impl AuditLayer {
    /// Create a layer labelling intercepted requests with `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sink: Arc::new(NoopSink),
            multipart_limit: None,
        }
    }

    /// Set the sink that receives each finalized record.
    pub fn with_sink<S: AuditSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Cap the number of multipart body bytes parsed during capture.
    /// Forms over the cap leave `condition` empty; the request itself is
    /// unaffected.
    pub fn with_multipart_limit(mut self, bytes: u64) -> Self {
        self.multipart_limit = Some(bytes);
        self
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            name: self.name.clone(),
            sink: self.sink.clone(),
            multipart_limit: self.multipart_limit,
        }
    }
}

/// Audit interceptor service
#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    name: String,
    sink: Arc<dyn AuditSink>,
    multipart_limit: Option<u64>,
}

fn is_audited(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    )
}

impl<S> Service<Request> for AuditMiddleware<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let mut inner = self.inner.clone();
        let name = self.name.clone();
        let sink = self.sink.clone();
        let multipart_limit = self.multipart_limit;

        Box::pin(async move {
            if !is_audited(request.method()) {
                return inner.call(request).await;
            }

            let (mut request, mut record) = capture_default(request, multipart_limit).await;
            record.name = name;

            let handle = AuditHandle::new(record);
            request.extensions_mut().insert(handle.clone());

            let response = inner.call(request).await?;

            // Buffer the response so the audit copy and the client see the
            // same bytes.
            let (parts, body) = response.into_parts();
            let body_bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(e) => {
                    warn!(error = %e, "failed to buffer response body for audit");
                    Bytes::new()
                },
            };

            match handle.take() {
                Some(mut record) => {
                    if record.result.is_empty() {
                        record.result = String::from_utf8_lossy(&body_bytes).into_owned();
                    }
                    record.created_at = Some(Utc::now());
                    debug!(
                        name = %record.name,
                        method = %record.method,
                        path = %record.path,
                        "emitting audit record"
                    );
                    sink.emit(record);
                },
                None => warn!("audit record missing at finalization"),
            }

            Ok(Response::from_parts(parts, Body::from(body_bytes)))
        })
    }
}
