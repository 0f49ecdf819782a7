//! # Service layer
//!
//! §4.2: the registry of user pools (`CognitoService`) and the per-pool
//! façade over its `DataStore` (`UserPoolService`). Concrete structs, not
//! traits — the same rationale the teacher gives for its own repository
//! layer applies here (`auth-service/src/repository/mod.rs`: "concrete
//! implementation... rather than trait, for simplicity"; there is exactly
//! one implementation of either type at runtime).

pub mod cognito_service;
pub mod user_pool_service;

pub use cognito_service::CognitoService;
pub use user_pool_service::UserPoolService;
