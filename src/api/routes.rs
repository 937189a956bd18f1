use actix_web::web;

use super::handlers;

/// Configures the API routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/chain", web::get().to(handlers::get_chain))
            .route("/chain/last", web::get().to(handlers::get_last_block))
            .route("/validate", web::get().to(handlers::validate_chain))
            .route("/blocks", web::post().to(handlers::append_block))
            .route("/wallet/new", web::post().to(handlers::create_wallet))
            .route("/wallet/send", web::post().to(handlers::send_transfer))
    );
}
