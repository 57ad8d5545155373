use actix_web::web;

pub mod config;
pub mod databases;
pub mod errors;
pub mod routes;
pub mod services;
pub mod session;

use errors::ApiError;

/// Malformed JSON bodies are reported in the same `{"error": ...}` shape as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ApiError::validation(err.to_string()).into())
}

/// Registers every API route. Shared state (`PgPool`, `Settings`) is added by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config());
    routes::init(cfg);
}
