//! Key material loading.
//!
//! Keys are PEM files distributed out-of-band: a PKCS8 RSA private key for
//! the issuer and a SubjectPublicKeyInfo RSA public key for verifiers. A
//! [`KeyCache`] resolves the configured path against a list of candidate
//! directories, parses the key once and hands out the same `Arc` for the
//! rest of the process lifetime.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use once_cell::sync::OnceCell;
use rsa::pkcs1::EncodeRsaPublicKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, info, warn};

use crate::error::{Result, TokenError};

/// Smallest RSA modulus accepted for RS256.
pub const MIN_RSA_BITS: usize = 2048;

/// Container root used by the deployment images.
const CONTAINER_ROOT: &str = "/app";

/// A key type that can be parsed from PEM bytes.
pub trait KeyMaterial: Sized + Send + Sync + 'static {
    /// Human-readable kind used in errors and logs ("private" / "public").
    const KIND: &'static str;

    /// Parse PEM bytes. The error string explains why the bytes were rejected.
    fn from_pem(pem: &[u8]) -> std::result::Result<Self, String>;
}

/// Issuer-side RSA private key.
///
/// Also carries the matching public half so the issuer can verify its own
/// tokens without a second key file.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    verification: VerificationKey,
    bits: usize,
}

impl SigningKey {
    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    /// The public half of this key.
    pub fn verification_key(&self) -> VerificationKey {
        self.verification.clone()
    }

    pub fn bits(&self) -> usize {
        self.bits
    }
}

impl KeyMaterial for SigningKey {
    const KIND: &'static str = "private";

    fn from_pem(pem: &[u8]) -> std::result::Result<Self, String> {
        let text = std::str::from_utf8(pem).map_err(|_| "file is not PEM text".to_string())?;
        let private = RsaPrivateKey::from_pkcs8_pem(text)
            .map_err(|e| format!("not a PKCS8 RSA private key: {e}"))?;
        let bits = check_modulus(private.size())?;

        let encoding = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| format!("RSA private key rejected by signer: {e}"))?;
        let verification = VerificationKey::from_public(&RsaPublicKey::from(&private))?;

        Ok(Self {
            encoding,
            verification,
            bits,
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

/// Verifier-side RSA public key.
#[derive(Clone)]
pub struct VerificationKey {
    decoding: DecodingKey,
    bits: usize,
}

impl VerificationKey {
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub fn bits(&self) -> usize {
        self.bits
    }

    fn from_public(public: &RsaPublicKey) -> std::result::Result<Self, String> {
        let bits = check_modulus(public.size())?;
        let der = public
            .to_pkcs1_der()
            .map_err(|e| format!("cannot encode RSA public key: {e}"))?;

        Ok(Self {
            decoding: DecodingKey::from_rsa_der(der.as_bytes()),
            bits,
        })
    }
}

impl KeyMaterial for VerificationKey {
    const KIND: &'static str = "public";

    fn from_pem(pem: &[u8]) -> std::result::Result<Self, String> {
        let text = std::str::from_utf8(pem).map_err(|_| "file is not PEM text".to_string())?;
        let public = RsaPublicKey::from_public_key_pem(text)
            .map_err(|e| format!("not a SubjectPublicKeyInfo RSA public key: {e}"))?;
        Self::from_public(&public)
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("bits", &self.bits)
            .finish_non_exhaustive()
    }
}

fn check_modulus(size_bytes: usize) -> std::result::Result<usize, String> {
    let bits = size_bytes * 8;
    if bits < MIN_RSA_BITS {
        return Err(format!(
            "RSA key is {bits} bits, at least {MIN_RSA_BITS} required"
        ));
    }
    Ok(bits)
}

/// Where to look for a key file.
///
/// An absolute path is used as is. A relative path is tried as given
/// (relative to the working directory), then joined onto each configured
/// search root, the working directory and the container root, in that order.
#[derive(Debug, Clone)]
pub struct KeyLocation {
    path: PathBuf,
    search_roots: Vec<PathBuf>,
    default_roots: bool,
}

impl KeyLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            search_roots: Vec::new(),
            default_roots: true,
        }
    }

    /// Add directories searched before the defaults.
    pub fn with_search_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Only search the path itself and explicitly configured roots.
    pub fn without_default_roots(mut self) -> Self {
        self.default_roots = false;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Candidate paths in lookup order, without duplicates.
    pub fn candidates(&self) -> Vec<PathBuf> {
        if self.path.is_absolute() {
            return vec![self.path.clone()];
        }

        let mut roots = self.search_roots.clone();
        if self.default_roots {
            if let Ok(cwd) = env::current_dir() {
                roots.push(cwd);
            }
            roots.push(PathBuf::from(CONTAINER_ROOT));
        }

        let mut candidates = vec![self.path.clone()];
        for root in roots {
            let candidate = root.join(&self.path);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    /// First candidate that exists as a regular file.
    pub fn resolve(&self) -> Result<PathBuf> {
        let candidates = self.candidates();
        match candidates.iter().find(|candidate| candidate.is_file()) {
            Some(found) => Ok(found.clone()),
            None => {
                warn!(
                    path = %self.path.display(),
                    candidates = candidates.len(),
                    "key file not found"
                );
                Err(TokenError::KeyNotFound { tried: candidates })
            }
        }
    }
}

/// Process-lifetime cache for one parsed key.
///
/// The first successful [`get`](Self::get) parses the key; concurrent
/// callers during a cold start block on that single initialization instead
/// of parsing in parallel. A failed load leaves the cache empty.
pub struct KeyCache<K> {
    location: Option<KeyLocation>,
    cell: OnceCell<Arc<K>>,
    loads: AtomicUsize,
}

impl<K: KeyMaterial> KeyCache<K> {
    pub fn new(location: KeyLocation) -> Self {
        Self {
            location: Some(location),
            cell: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// A cache that already holds a key and never touches the filesystem.
    pub fn from_key(key: K) -> Self {
        Self {
            location: None,
            cell: OnceCell::with_value(Arc::new(key)),
            loads: AtomicUsize::new(0),
        }
    }

    /// The cached key, loading it on first use.
    pub fn get(&self) -> Result<Arc<K>> {
        self.cell.get_or_try_init(|| self.load()).map(Arc::clone)
    }

    /// Load eagerly; used during startup so a bad key aborts the process.
    pub fn warm(&self) -> Result<()> {
        self.get().map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// How many times a key file has been parsed.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn location(&self) -> Option<&KeyLocation> {
        self.location.as_ref()
    }

    fn load(&self) -> Result<Arc<K>> {
        let location = self.location.as_ref().ok_or_else(|| TokenError::KeyNotFound {
            tried: Vec::new(),
        })?;
        let path = location.resolve()?;
        debug!(kind = K::KIND, path = %path.display(), "loading key material");

        let parse_error = |reason: String| TokenError::KeyParseError {
            kind: K::KIND,
            path: path.clone(),
            reason,
        };

        let bytes = fs::read(&path).map_err(|e| parse_error(format!("unreadable: {e}")))?;

        self.loads.fetch_add(1, Ordering::SeqCst);
        let key = K::from_pem(&bytes).map_err(|reason| {
            warn!(kind = K::KIND, path = %path.display(), %reason, "key material rejected");
            parse_error(reason)
        })?;

        info!(kind = K::KIND, path = %path.display(), "key material loaded");
        Ok(Arc::new(key))
    }
}

impl<K> fmt::Debug for KeyCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCache")
            .field("location", &self.location)
            .field("loaded", &self.cell.get().is_some())
            .field("loads", &self.loads.load(Ordering::SeqCst))
            .finish()
    }
}
