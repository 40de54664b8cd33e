use std::env;

use actix_cors::Cors;
use actix_web::http::header;

/// CORS policy from `CORS_ALLOWED_ORIGINS` (comma separated).
pub fn cors_middleware() -> Cors {
    cors_for_origins(&env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default())
}

/// Only explicit http(s) origins are allowed; credentials are supported so
/// the refresh-token cookie can travel. Falls back to localhost when no
/// valid origin is configured.
pub fn cors_for_origins(allowed_raw: &str) -> Cors {
    let mut origins: Vec<&str> = allowed_raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "null" && *s != "*")
        .filter(|s| s.starts_with("http://") || s.starts_with("https://"))
        .collect();

    if origins.is_empty() {
        origins = vec![
            "http://localhost:3000",
            "http://127.0.0.1:3000",
            "http://localhost:8000",
        ];
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .expose_headers(vec![
            header::HeaderName::from_static("x-trace-id"),
            header::HeaderName::from_static("x-request-id"),
        ])
        .supports_credentials()
        .max_age(3600);

    for origin in origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}
