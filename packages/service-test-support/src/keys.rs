//! Pre-generated key fixtures.
//!
//! Generating RSA keys inside tests is slow, so the pairs are checked in.
//! `Primary` and `Secondary` are unrelated RSA-2048 pairs (PKCS8 private,
//! SPKI public). `Ec*` is a P-256 pair and `WeakPrivate` an RSA-1024 key.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixture {
    PrimaryPrivate,
    PrimaryPublic,
    SecondaryPrivate,
    SecondaryPublic,
    EcPrivate,
    EcPublic,
    WeakPrivate,
}

pub fn fixture_pem(fixture: Fixture) -> &'static [u8] {
    match fixture {
        Fixture::PrimaryPrivate => include_bytes!("../fixtures/primary_private.pem"),
        Fixture::PrimaryPublic => include_bytes!("../fixtures/primary_public.pem"),
        Fixture::SecondaryPrivate => include_bytes!("../fixtures/secondary_private.pem"),
        Fixture::SecondaryPublic => include_bytes!("../fixtures/secondary_public.pem"),
        Fixture::EcPrivate => include_bytes!("../fixtures/ec_private.pem"),
        Fixture::EcPublic => include_bytes!("../fixtures/ec_public.pem"),
        Fixture::WeakPrivate => include_bytes!("../fixtures/weak_private.pem"),
    }
}

/// Write a fixture to `dir/name` and return the full path.
pub fn write_fixture(dir: &Path, name: &str, fixture: Fixture) -> io::Result<PathBuf> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, fixture_pem(fixture))?;
    Ok(path)
}

/// Lay out `rsa_keys/private.pem` and `rsa_keys/public.pem` under `dir`
/// from the primary pair, mirroring the default deployment layout.
pub fn write_primary_pair(dir: &Path) -> io::Result<(PathBuf, PathBuf)> {
    let private = write_fixture(dir, "rsa_keys/private.pem", Fixture::PrimaryPrivate)?;
    let public = write_fixture(dir, "rsa_keys/public.pem", Fixture::PrimaryPublic)?;
    Ok((private, public))
}
