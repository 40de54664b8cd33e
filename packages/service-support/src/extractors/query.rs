use actix_web::web;

use crate::error::AppError;

/// Query-string parse failures as problem-details 400s.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::bad_request("INVALID_QUERY", format!("Invalid query string: {err}")).into()
    })
}
