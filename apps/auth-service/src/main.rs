use actix_web::{web, App, HttpServer};
use auth_service::{routes, AppState, Config};
use service_support::middleware::{cors_middleware, RequestTrace, StructuredLogger, TraceSpan};
use service_support::telemetry;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    // Refuse to serve without a usable signing key
    let (state, gate) = match AppState::build(&config) {
        Ok(built) => built,
        Err(e) => {
            error!(error = %e, code = e.code(), "failed to load signing key");
            std::process::exit(1);
        }
    };

    info!(host = %config.host, port = config.port, "starting auth service");

    let state = web::Data::new(state);
    let gate = web::Data::new(gate);

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .wrap(StructuredLogger)
            .wrap(TraceSpan)
            .wrap(RequestTrace)
            .app_data(state.clone())
            .app_data(gate.clone())
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
