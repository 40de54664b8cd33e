//! Bearer-token middleware for protected scopes.
//!
//! Runs the registered [`AuthGate`] on the `Authorization` header and stores
//! the resulting [`Identity`](token_core::Identity) in request extensions for
//! [`CurrentUser`](crate::extractors::CurrentUser). Requests that fail the
//! gate are answered with a problem-details 401 and never reach the handler.
//! Either way the decision is left behind as an [`AuthOutcome`].

use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{web, Error, HttpMessage, ResponseError};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use token_core::{AuthGate, Identity, Unauthenticated};

use crate::error::AppError;
use crate::extractors::UserId;

/// Gate decision for a request, stored in request extensions and reported
/// by [`StructuredLogger`](super::StructuredLogger).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated(UserId),
    /// Machine-readable rejection code, e.g. `token_expired`
    Rejected(&'static str),
}

impl AuthOutcome {
    pub fn of(decision: &Result<Identity<UserId>, Unauthenticated>) -> Self {
        match decision {
            Ok(identity) => Self::Authenticated(identity.principal),
            Err(reason) => Self::Rejected(reason.code()),
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Authenticated(id) => Some(*id),
            Self::Rejected(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&'static str> {
        match self {
            Self::Authenticated(_) => None,
            Self::Rejected(code) => Some(code),
        }
    }
}

pub struct JwtExtract;

impl<S, B> Transform<S, ServiceRequest> for JwtExtract
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtExtractMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtExtractMiddleware { service }))
    }
}

pub struct JwtExtractMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JwtExtractMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // A non-UTF-8 header counts as missing
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let Some(gate) = req.app_data::<web::Data<AuthGate>>().cloned() else {
            let err = AppError::internal("AuthGate not registered");
            return Box::pin(async move {
                Ok(req.into_response(err.error_response()).map_into_right_body())
            });
        };

        let decision = gate.authenticate::<UserId>(authorization.as_deref());
        req.extensions_mut().insert(AuthOutcome::of(&decision));

        match decision.map_err(AppError::from) {
            Ok(identity) => {
                req.extensions_mut().insert(identity);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            // Rendered inside the future so the problem details carry the trace id
            Err(err) => Box::pin(async move {
                let response = err.error_response();
                Ok(req.into_response(response).map_into_right_body())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use token_core::{Claims, TokenError};

    use super::*;

    #[test]
    fn test_outcome_of_decision() {
        let claims = Claims {
            sub: "9".to_string(),
            exp: 2_000_000_000,
            iat: None,
            nbf: None,
            iss: None,
            jti: None,
            token_use: None,
            extra: serde_json::Map::new(),
        };
        let accepted = Ok(Identity { principal: 9, claims });
        assert_eq!(AuthOutcome::of(&accepted), AuthOutcome::Authenticated(9));
        assert_eq!(AuthOutcome::of(&accepted).user_id(), Some(9));
        assert_eq!(AuthOutcome::of(&accepted).failure(), None);

        let expired = Err(Unauthenticated::InvalidToken(TokenError::TokenExpired));
        assert_eq!(AuthOutcome::of(&expired), AuthOutcome::Rejected("token_expired"));
        assert_eq!(AuthOutcome::of(&expired).user_id(), None);

        let missing = Err(Unauthenticated::MissingCredentials);
        assert_eq!(AuthOutcome::of(&missing).failure(), Some("missing_credentials"));
    }
}
