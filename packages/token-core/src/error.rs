//! Failure taxonomy for key loading, issuance and verification.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the token protocol.
///
/// Key errors (`KeyNotFound`, `KeyParseError`) are fatal at startup: a
/// service that cannot load its key must refuse to serve. `SigningError` is
/// fatal for the single request. Every other variant is a per-request
/// authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("key file not found ({} candidate paths tried)", tried.len())]
    KeyNotFound { tried: Vec<PathBuf> },

    #[error("failed to load {kind} key from {}: {reason}", path.display())]
    KeyParseError {
        kind: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("failed to sign token: {0}")]
    SigningError(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid claims: {0}")]
    InvalidClaims(String),

    #[error("token expired")]
    TokenExpired,

    #[error("token not yet valid")]
    TokenNotYetValid,

    #[error("issuer mismatch: expected '{expected}', found '{found}'")]
    IssuerMismatch { expected: String, found: String },
}

impl TokenError {
    /// Stable snake_case identifier, suitable for log fields.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound { .. } => "key_not_found",
            Self::KeyParseError { .. } => "key_parse_error",
            Self::SigningError(_) => "signing_error",
            Self::MalformedToken(_) => "malformed_token",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidClaims(_) => "invalid_claims",
            Self::TokenExpired => "token_expired",
            Self::TokenNotYetValid => "token_not_yet_valid",
            Self::IssuerMismatch { .. } => "issuer_mismatch",
        }
    }

    /// Short reason that is safe to show to an untrusted caller.
    ///
    /// Never includes paths, key material or the offending claim values.
    pub const fn public_reason(&self) -> &'static str {
        match self {
            Self::KeyNotFound { .. } | Self::KeyParseError { .. } => "key material unavailable",
            Self::SigningError(_) => "token could not be issued",
            Self::MalformedToken(_) => "malformed token",
            Self::InvalidSignature => "invalid signature",
            Self::InvalidClaims(_) => "invalid claims",
            Self::TokenExpired => "token expired",
            Self::TokenNotYetValid => "token not yet valid",
            Self::IssuerMismatch { .. } => "issuer mismatch",
        }
    }

    /// Key loading failures; the process should not keep serving.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. } | Self::KeyParseError { .. })
    }

    /// Failures that mean "the presented token is not acceptable".
    pub const fn is_verification_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken(_)
                | Self::InvalidSignature
                | Self::InvalidClaims(_)
                | Self::TokenExpired
                | Self::TokenNotYetValid
                | Self::IssuerMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TokenError>;
