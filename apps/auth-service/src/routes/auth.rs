use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use service_support::extractors::{CurrentUser, ValidatedJson};
use service_support::AppError;
use token_core::{AuthGate, Claims};
use tracing::{info, warn};

use crate::state::AppState;
use crate::users::{NewUser, User, UserError};

pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
    pub claims: Claims,
}

impl From<UserError> for AppError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::InvalidCredentials | UserError::Inactive => {
                AppError::unauthorized(e.to_string())
            }
            UserError::UsernameTaken(_) => AppError::conflict("USERNAME_TAKEN", e.to_string()),
            UserError::Hashing(_) => AppError::internal(e.to_string()),
        }
    }
}

/// Run password hashing on the blocking pool.
async fn off_thread<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, UserError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
        .map_err(AppError::from)
}

fn refresh_cookie(state: &AppState, value: String) -> Cookie<'static> {
    let max_age = i64::try_from(state.refresh_ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build(REFRESH_COOKIE, value)
        .path("/")
        .http_only(true)
        .secure(state.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age))
        .finish()
}

/// Claims carried by every token minted for `user`.
fn user_claims(user: &User) -> Map<String, Value> {
    let mut extra = Map::new();
    extra.insert("username".to_string(), json!(user.username));
    extra.insert("email".to_string(), json!(user.email));
    extra.insert("is_admin".to_string(), json!(user.is_admin));
    extra
}

async fn login(
    body: ValidatedJson<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (username, password) = (body.username.clone(), body.password.clone());
    let users = state.clone();
    let user = off_thread(move || users.users.authenticate(&username, &password))
        .await
        .inspect_err(|e| warn!(username = %body.username, reason = %e, "login rejected"))?;

    let pair = state
        .issuer
        .issue_pair(&user.id.to_string(), &user_claims(&user))?;

    info!(user_id = user.id, "login succeeded");

    Ok(HttpResponse::Ok()
        .cookie(refresh_cookie(&state, pair.refresh_token))
        .json(TokenResponse {
            access_token: pair.access_token,
            token_type: pair.token_type,
            expires_in: pair.expires_in,
        }))
}

async fn register(
    body: ValidatedJson<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let username = body.username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request(
            "INVALID_USERNAME",
            "Username cannot be empty",
        ));
    }
    let email = body.email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => {
            return Err(AppError::bad_request(
                "INVALID_EMAIL",
                "Email must look like name@domain",
            ))
        }
    }
    if body.password.is_empty() {
        return Err(AppError::bad_request(
            "INVALID_PASSWORD",
            "Password cannot be empty",
        ));
    }

    let (username, email, password) = (
        username.to_string(),
        email.to_string(),
        body.password.clone(),
    );
    let users = state.clone();
    let user = off_thread(move || {
        users.users.create(NewUser {
            username: &username,
            email: &email,
            password: &password,
            is_admin: false,
        })
    })
    .await?;

    info!(user_id = user.id, "user registered");
    Ok(HttpResponse::Created().json(user))
}

async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let mut cookie = refresh_cookie(&state, String::new());
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "message": "Successfully logged out" }))
}

async fn me(user: CurrentUser, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let record = state
        .users
        .find_by_id(user.id)
        .ok_or_else(|| AppError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(HttpResponse::Ok().json(record))
}

/// Checks a bearer token against the service's own key.
async fn verify_token(
    req: HttpRequest,
    gate: web::Data<AuthGate>,
) -> Result<HttpResponse, AppError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let identity = gate.authenticate::<String>(authorization)?;

    Ok(HttpResponse::Ok().json(VerifyResponse {
        valid: true,
        claims: identity.claims,
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/login", web::post().to(login))
            .route("/register", web::post().to(register))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me))
            .route("/verify-token", web::post().to(verify_token)),
    );
}
