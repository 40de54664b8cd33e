//! Bearer-token gate in front of protected operations.

use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;
use tracing::{error, warn};

use crate::claims::Claims;
use crate::error::TokenError;
use crate::verifier::TokenVerifier;

/// Reasons a request is not allowed through the gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unauthenticated {
    #[error("missing or malformed authorization")]
    MissingCredentials,

    #[error("{}", .0.public_reason())]
    InvalidToken(TokenError),

    #[error("refresh token cannot be used as bearer")]
    WrongTokenUse,

    #[error("token missing subject")]
    MissingSubject,

    /// The verification key could not be loaded. Not the caller's fault.
    #[error("{}", .0.public_reason())]
    KeyUnavailable(TokenError),
}

impl Unauthenticated {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "missing_credentials",
            Self::InvalidToken(e) => e.code(),
            Self::WrongTokenUse => "wrong_token_use",
            Self::MissingSubject => "missing_subject",
            Self::KeyUnavailable(e) => e.code(),
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, Self::InvalidToken(TokenError::TokenExpired))
    }
}

/// An authenticated principal for the duration of one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity<P> {
    pub principal: P,
    pub claims: Claims,
}

/// Extracts the token from an `Authorization` header value.
///
/// The scheme must be `Bearer` (any case) followed by exactly one token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Some(token),
        _ => None,
    }
}

#[derive(Clone)]
pub struct AuthGate {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthGate {
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    pub fn authenticate<P: FromStr>(
        &self,
        authorization: Option<&str>,
    ) -> Result<Identity<P>, Unauthenticated> {
        self.authenticate_at(authorization, SystemTime::now())
    }

    pub fn authenticate_at<P: FromStr>(
        &self,
        authorization: Option<&str>,
        now: SystemTime,
    ) -> Result<Identity<P>, Unauthenticated> {
        let result = self.check(authorization, now);
        if let Err(e) = &result {
            match e {
                Unauthenticated::KeyUnavailable(cause) => {
                    error!(error = %cause, code = e.code(), "verification key unavailable");
                }
                _ => warn!(code = e.code(), "request not authenticated"),
            }
        }
        result
    }

    fn check<P: FromStr>(
        &self,
        authorization: Option<&str>,
        now: SystemTime,
    ) -> Result<Identity<P>, Unauthenticated> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or(Unauthenticated::MissingCredentials)?;

        let claims = self.verifier.verify_at(token, now).map_err(|e| {
            if e.is_fatal() {
                Unauthenticated::KeyUnavailable(e)
            } else {
                Unauthenticated::InvalidToken(e)
            }
        })?;

        if claims.is_refresh() {
            return Err(Unauthenticated::WrongTokenUse);
        }

        let principal = claims
            .sub
            .trim()
            .parse::<P>()
            .map_err(|_| Unauthenticated::MissingSubject)?;

        Ok(Identity { principal, claims })
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate").finish_non_exhaustive()
    }
}
