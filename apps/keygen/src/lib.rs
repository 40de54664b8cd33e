//! RSA key pair generation for the token services.
//!
//! The private key is written as PKCS8 PEM for the auth service, the public
//! key as SubjectPublicKeyInfo PEM for the resource service.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_BITS: usize = 2048;
pub const MIN_BITS: usize = 2048;

#[derive(Debug, Error)]
pub enum KeygenError {
    #[error("key size {0} is below the {MIN_BITS}-bit minimum")]
    KeyTooSmall(usize),

    #[error("failed to generate RSA key: {0}")]
    Generate(String),

    #[error("failed to encode key: {0}")]
    Encode(String),

    #[error("{} already exists (pass --force to overwrite)", .0.display())]
    Exists(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A freshly generated key pair in PEM form.
pub struct KeyPairPem {
    pub private_pem: String,
    pub public_pem: String,
}

impl std::fmt::Debug for KeyPairPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairPem")
            .field("public_pem", &self.public_pem)
            .finish_non_exhaustive()
    }
}

pub fn generate(bits: usize) -> Result<KeyPairPem, KeygenError> {
    if bits < MIN_BITS {
        return Err(KeygenError::KeyTooSmall(bits));
    }

    let private =
        RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| KeygenError::Generate(e.to_string()))?;
    let public = RsaPublicKey::from(&private);

    let private_pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeygenError::Encode(e.to_string()))?;
    let public_pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeygenError::Encode(e.to_string()))?;

    Ok(KeyPairPem {
        private_pem: private_pem.to_string(),
        public_pem,
    })
}

/// Destinations for the two halves of a key pair.
#[derive(Debug, Clone)]
pub struct Output {
    pub private_path: PathBuf,
    pub public_path: PathBuf,
    pub overwrite: bool,
}

/// Write both files, creating parent directories.
///
/// Neither file is written when one of them exists and `overwrite` is off.
pub fn write_pair(pair: &KeyPairPem, output: &Output) -> Result<(), KeygenError> {
    if !output.overwrite {
        for path in [&output.private_path, &output.public_path] {
            if path.exists() {
                return Err(KeygenError::Exists(path.clone()));
            }
        }
    }

    write_file(&output.private_path, &pair.private_pem, true)?;
    write_file(&output.public_path, &pair.public_pem, false)?;

    info!(
        private = %output.private_path.display(),
        public = %output.public_path.display(),
        "key pair written"
    );
    Ok(())
}

fn write_file(path: &Path, contents: &str, secret: bool) -> Result<(), KeygenError> {
    let wrap = |source| KeygenError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(wrap)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        if secret {
            options.mode(0o600);
        }
    }
    #[cfg(not(unix))]
    let _ = secret;

    let mut file = options.open(path).map_err(wrap)?;
    file.write_all(contents.as_bytes()).map_err(wrap)
}

/// Generate a pair and write it to `output`, logging the outcome.
pub fn run(bits: usize, output: &Output) -> Result<(), KeygenError> {
    generate(bits)
        .and_then(|pair| write_pair(&pair, output))
        .inspect_err(|e| error!(error = %e, bits, "key generation failed"))
}
