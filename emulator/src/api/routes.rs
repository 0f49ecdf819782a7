//! Route table — §6: a single `POST /` dispatch target plus the JWKS
//! well-known endpoint, scoped per user pool.

use actix_web::web;

use crate::api::handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::post().to(handlers::dispatch))
        .route("/health", web::get().to(handlers::health))
        .route("/{user_pool_id}/.well-known/jwks.json", web::get().to(handlers::jwks));
}
