//! In-memory user directory and password hashing.

use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::config::AdminSeed;

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, UserError>;

    /// True when `password` matches a value produced by [`hash`](Self::hash).
    /// Unparseable stored values never match.
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// bcrypt in the modular crypt format (`$2b$<cost>$...`).
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, UserError> {
        bcrypt::hash(password, self.cost).map_err(|e| UserError::Hashing(e.to_string()))
    }

    fn verify(&self, password: &str, stored: &str) -> bool {
        bcrypt::verify(password, stored).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub is_admin: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(skip)]
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account is deactivated")]
    Inactive,
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub is_admin: bool,
}

/// Users kept in process memory; ids start at 1.
pub struct UserStore {
    users: RwLock<Vec<User>>,
    next_id: AtomicI64,
    hasher: Box<dyn PasswordHasher>,
}

impl UserStore {
    pub fn new(hasher: impl PasswordHasher + 'static) -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
            hasher: Box::new(hasher),
        }
    }

    /// Store with the admin account created.
    pub fn seeded(admin: &AdminSeed, hasher: impl PasswordHasher + 'static) -> Self {
        let store = Self::new(hasher);
        store.seed_admin(admin);
        store
    }

    pub fn seed_admin(&self, admin: &AdminSeed) {
        let created = self.create(NewUser {
            username: &admin.username,
            email: &admin.email,
            password: &admin.password,
            is_admin: true,
        });
        match created {
            Ok(_) => info!(username = %admin.username, "admin user created"),
            Err(UserError::UsernameTaken(_)) => {}
            Err(e) => error!(error = %e, "failed to seed admin user"),
        }
    }

    pub fn create(&self, new: NewUser<'_>) -> Result<User, UserError> {
        if self.find_by_username(new.username).is_some() {
            return Err(UserError::UsernameTaken(new.username.to_string()));
        }

        // Hashing is slow on purpose; keep it outside the lock
        let password_hash = self.hasher.hash(new.password)?;

        let mut users = self.users.write();
        if users.iter().any(|u| u.username == new.username) {
            return Err(UserError::UsernameTaken(new.username.to_string()));
        }

        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            username: new.username.to_string(),
            email: new.email.to_string(),
            is_active: true,
            is_admin: new.is_admin,
            created_at: OffsetDateTime::now_utc(),
            password_hash,
        };
        users.push(user.clone());
        Ok(user)
    }

    pub fn find_by_id(&self, id: i64) -> Option<User> {
        self.users.read().iter().find(|u| u.id == id).cloned()
    }

    pub fn find_by_username(&self, username: &str) -> Option<User> {
        self.users
            .read()
            .iter()
            .find(|u| u.username == username)
            .cloned()
    }

    /// Returns false when no such user exists.
    pub fn set_active(&self, id: i64, active: bool) -> bool {
        match self.users.write().iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Check a login attempt.
    ///
    /// The password is checked before the account state so that a wrong
    /// password never reveals whether an account is deactivated.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<User, UserError> {
        let user = self
            .find_by_username(username)
            .ok_or(UserError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash) {
            return Err(UserError::InvalidCredentials);
        }
        if !user.is_active {
            return Err(UserError::Inactive);
        }
        Ok(user)
    }
}
