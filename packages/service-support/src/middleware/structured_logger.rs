use std::future::{ready, Ready};
use std::time::Instant;

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::{Error as ActixError, HttpMessage};
use futures_util::future::LocalBoxFuture;
use tracing::{error, info, warn, Level};

use super::jwt_extract::AuthOutcome;
use super::request_trace::TraceId;

/// Logs one `request_completed` event per request.
///
/// The event carries the gate decision when one was made: `user_id` for an
/// accepted bearer token, `auth_failure` with the rejection code otherwise.
/// Rejected tokens log at warn like any other 4xx.
pub struct StructuredLogger;

impl<S, B> Transform<S, ServiceRequest> for StructuredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type InitError = ();
    type Transform = StructuredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StructuredLoggerMiddleware { service }))
    }
}

pub struct StructuredLoggerMiddleware<S> {
    service: S,
}

/// Everything `request_completed` reports.
struct Completion {
    method: String,
    path: String,
    trace_id: String,
    status: StatusCode,
    duration_us: u64,
    auth: Option<AuthOutcome>,
}

impl Completion {
    fn emit(&self) {
        let user_id = self.auth.and_then(|a| a.user_id());
        let auth_failure = self.auth.and_then(|a| a.failure());

        macro_rules! completed {
            ($level:ident) => {
                $level!(
                    http.method = %self.method,
                    url.path = %self.path,
                    http.status_code = self.status.as_u16(),
                    duration_us = self.duration_us,
                    trace_id = %self.trace_id,
                    user_id,
                    auth_failure,
                    message = "request_completed"
                )
            };
        }

        let level = level_for(self.status);
        if level == Level::ERROR {
            completed!(error);
        } else if level == Level::WARN {
            completed!(warn);
        } else {
            completed!(info);
        }
    }
}

fn level_for(status: StatusCode) -> Level {
    if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    }
}

impl<S, B> Service<ServiceRequest> for StructuredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let trace_id = req
            .extensions()
            .get::<TraceId>()
            .map(|id| id.0.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let fut = self.service.call(req);

        Box::pin(async move {
            let result = fut.await;

            // The gate writes its decision into the shared request extensions
            let (status, auth) = match &result {
                Ok(res) => (
                    res.status(),
                    res.request().extensions().get::<AuthOutcome>().copied(),
                ),
                Err(err) => (err.as_response_error().status_code(), None),
            };

            Completion {
                method,
                path,
                trace_id,
                status,
                duration_us: u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
                auth,
            }
            .emit();

            result
        })
    }
}
