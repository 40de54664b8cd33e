use actix_web::web;

pub mod health;
pub mod products;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.configure(health::configure_routes)
        .configure(products::configure_routes);
}
