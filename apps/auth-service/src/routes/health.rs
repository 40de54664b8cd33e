use actix_web::{web, HttpResponse};
use serde_json::json;

async fn root() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": "Auth Service is running" }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "healthy", "service": "auth_service" }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(root))
        .route("/health", web::get().to(health));
}
