//! # Local User-Pool Identity Emulator
//!
//! A self-contained, single-process emulator of a managed identity-provider
//! service, wire-compatible with its hosted-SaaS protocol. Every user pool,
//! app client, and user lives in a JSON file on disk under
//! [`shared::config::DataStoreConfig::directory`]; nothing talks to a real
//! cloud account.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer (api/)                             │
//! │  POST / dispatches on X-Amz-Target; GET /<PoolId>/.well-known/jwks.json│
//! └──────────────────────────────┬──────────────────────────────────────┘
//!                                 │
//!                                 ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                      Targets + Router (targets/)                      │
//! │  One struct per operation; Router holds the operationName → target map │
//! └──────────────────────────────┬──────────────────────────────────────┘
//!                                 │
//!                 ┌───────────────┼────────────────┬─────────────────────┐
//!                 ▼               ▼                ▼                     ▼
//! ┌───────────────────┐ ┌──────────────────┐ ┌──────────────┐ ┌────────────────────┐
//! │ CognitoService /   │ │     Triggers      │ │   Messages   │ │   TokenGenerator   │
//! │ UserPoolService     │ │ (service/)        │ │ (messages/)  │ │ (tokens/)          │
//! │ (service/)          │ │                   │ │              │ │                     │
//! └──────────┬─────────┘ └─────────┬────────┘ └──────────────┘ └────────────────────┘
//!            ▼                     ▼
//! ┌────────────────────┐ ┌───────────────────┐
//! │ DataStore /          │ │ Lambda (HTTP POST) │
//! │ DataStoreFactory     │ │ (triggers/lambda)  │
//! │ (store/)             │ │                    │
//! └────────────────────┘ └───────────────────┘
//! ```
//!
//! ## Configuration
//!
//! Loaded once via [`shared::config::AppConfig::from_env`] — a `.env` file
//! plus `EMULATOR_*`-prefixed environment variables, see `shared::config`.
//!
//! ## Graceful shutdown
//!
//! actix-web handles SIGTERM/SIGINT: stops accepting new connections, waits
//! for in-flight requests, then exits.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use shared::config::AppConfig;
use shared::tracing_config;

mod api;
mod clock;
mod context;
mod domain;
mod messages;
mod otp;
mod service;
mod store;
mod targets;
mod tokens;
mod triggers;

use clock::SystemClock;
use messages::{LoggingMessageDelivery, Messages};
use otp::RandomOtpGenerator;
use service::CognitoService;
use store::DataStoreFactory;
use targets::{Deps, Router};
use tokens::{KeyMaterial, TokenGenerator};
use triggers::lambda::HttpLambda;
use triggers::{events::TriggerName, Triggers};

/// Builds the `triggerName → functionName` map [`HttpLambda`] dispatches
/// against from the optional URLs in [`shared::config::TriggersConfig`].
fn lambda_functions(config: &shared::config::TriggersConfig) -> HashMap<TriggerName, String> {
    let mut functions = HashMap::new();
    let mut insert = |trigger, url: &Option<String>| {
        if let Some(url) = url {
            functions.insert(trigger, url.clone());
        }
    };
    insert(TriggerName::PreSignUp, &config.pre_sign_up);
    insert(TriggerName::PostConfirmation, &config.post_confirmation);
    insert(TriggerName::PostAuthentication, &config.post_authentication);
    insert(TriggerName::UserMigration, &config.user_migration);
    insert(TriggerName::CustomMessage, &config.custom_message);
    insert(TriggerName::PreTokenGeneration, &config.pre_token_generation);
    functions
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("Failed to load configuration");
    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "Starting local identity-provider emulator"
    );

    let clock = Arc::new(SystemClock);
    let store_factory = Arc::new(DataStoreFactory::new(PathBuf::from(&config.data_store.directory)));
    let cognito = Arc::new(CognitoService::new(store_factory, clock.clone()));

    let lambda = Arc::new(HttpLambda::new(lambda_functions(&config.triggers)));
    let triggers = Arc::new(Triggers::new(lambda));

    let messages = Arc::new(Messages::new(triggers.clone(), Arc::new(LoggingMessageDelivery)));

    let key_material = Arc::new(KeyMaterial::generate(uuid::Uuid::new_v4().to_string()));
    let tokens = Arc::new(TokenGenerator::new(key_material.clone(), clock.clone(), triggers.clone(), config.server.port));

    let deps = Arc::new(Deps {
        cognito,
        triggers,
        messages,
        tokens,
        clock,
        otp: Arc::new(RandomOtpGenerator),
    });
    let router = web::Data::new(Router::build(deps));
    let key_material = web::Data::from(key_material);

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    info!("Server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let cors = Cors::default().allow_any_origin().allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(router.clone())
            .app_data(key_material.clone())
            .configure(api::routes::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
