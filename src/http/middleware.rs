//! Tower middleware that gates every request through the limiter store.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures::future::{self, BoxFuture, FutureExt};
use tower::{Layer, Service, ServiceExt};
use tracing::{trace, warn};

use super::identity::IdentitySource;
use super::response::RateLimitExceeded;
use crate::ratelimit::{Decision, LimiterStore};

/// Layer applying [`AdmissionService`] to an inner service.
#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    store: Arc<LimiterStore>,
    source: IdentitySource,
}

impl AdmissionLayer {
    /// Create a layer that consults `store`, identifying callers via `source`.
    pub fn new(store: Arc<LimiterStore>, source: IdentitySource) -> Self {
        Self { store, source }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = AdmissionService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AdmissionService {
            inner,
            store: Arc::clone(&self.store),
            source: self.source,
        }
    }
}

/// Admission control in front of an inner service.
///
/// Admitted requests are passed through untouched. Denied requests never
/// reach the inner service and are answered with a 429 response.
#[derive(Debug, Clone)]
pub struct AdmissionService<S> {
    inner: S,
    store: Arc<LimiterStore>,
    source: IdentitySource,
}

impl<S, B> Service<Request<B>> for AdmissionService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    /// Always ready: inner readiness is only awaited for admitted requests,
    /// so a denial never holds capacity reserved on the inner service.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<B>) -> Self::Future {
        let identity = self.source.extract(&request);

        match self.store.allow_now(&identity) {
            Decision::Admit => {
                trace!(identity = %identity, path = %request.uri().path(), "Request admitted");

                let inner = self.inner.clone();
                async move { inner.oneshot(request).await }.boxed()
            }
            Decision::Deny { retry_after } => {
                let rejection = RateLimitExceeded::new(retry_after);

                warn!(
                    identity = %identity,
                    method = %request.method(),
                    path = %request.uri().path(),
                    retry_after_secs = rejection.retry_after_secs(),
                    "Rate limit exceeded"
                );

                future::ready(Ok(rejection.into_response())).boxed()
            }
        }
    }
}
