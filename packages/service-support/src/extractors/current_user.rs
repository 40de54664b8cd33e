use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use token_core::{AuthGate, Claims, Identity};

use crate::error::AppError;
use crate::middleware::AuthOutcome;

/// Principal id carried in `sub`.
pub type UserId = i64;

/// The authenticated caller.
///
/// Taken from the identity stored by the `JwtExtract` middleware; on routes
/// without the middleware the registered `AuthGate` is run directly.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub id: UserId,
    pub claims: Claims,
}

impl CurrentUser {
    pub fn username(&self) -> Option<&str> {
        self.claims.get_str("username")
    }

    pub fn email(&self) -> Option<&str> {
        self.claims.get_str("email")
    }

    pub fn is_admin(&self) -> bool {
        self.claims
            .get("is_admin")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

impl From<Identity<UserId>> for CurrentUser {
    fn from(identity: Identity<UserId>) -> Self {
        Self {
            id: identity.principal,
            claims: identity.claims,
        }
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            if let Some(identity) = req.extensions().get::<Identity<UserId>>() {
                return Ok(identity.clone().into());
            }

            let gate = req
                .app_data::<web::Data<AuthGate>>()
                .ok_or_else(|| AppError::internal("AuthGate not registered"))?;

            let authorization = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok());

            let decision = gate.authenticate::<UserId>(authorization);
            req.extensions_mut().insert(AuthOutcome::of(&decision));
            Ok(decision?.into())
        })
    }
}
