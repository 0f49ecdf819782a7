//! `CognitoService` — §4.2. The registry of user pools and the shared
//! clients/app-client directory.
//!
//! The DataStore contract (§4.1) only supports lookup by a single id; it has
//! no wildcard "list all ids" operation. `ListUserPools` and
//! `CreateUserPoolClient`/`GetAppClient` need exactly that, so this adds one
//! extra shared document (id `__directory__`) holding `UserPools` and
//! `Clients` maps alongside the per-pool documents the factory already
//! manages. **[SUPPLEMENT]** — not named by §4.1, but required to implement
//! `ListUserPools` faithfully without inventing a directory-listing
//! DataStore primitive the spec doesn't define.

use std::sync::Arc;

use serde_json::{json, Value};

use shared::errors::{ApiResult, CognitoError};

use crate::clock::Clock;
use crate::context::Context;
use crate::domain::{AppClient, UserPool};
use crate::service::user_pool_service::UserPoolService;
use crate::store::{DataStore, DataStoreFactory};

const DIRECTORY_STORE_ID: &str = "__directory__";

pub struct CognitoService {
    store_factory: Arc<DataStoreFactory>,
    clock: Arc<dyn Clock>,
}

impl CognitoService {
    pub fn new(store_factory: Arc<DataStoreFactory>, clock: Arc<dyn Clock>) -> Self {
        Self { store_factory, clock }
    }

    async fn directory(&self, ctx: &Context) -> ApiResult<Arc<DataStore>> {
        self.store_factory
            .create(ctx, DIRECTORY_STORE_ID, json!({"Clients": {}, "UserPools": {}}))
            .await
    }

    /// Creates the pool's directory entry and its own per-pool document.
    pub async fn create_user_pool(&self, ctx: &Context, config: UserPool) -> ApiResult<UserPool> {
        let directory = self.directory(ctx).await?;
        directory.set(ctx, &["UserPools", &config.id], &config).await?;
        self.store_factory
            .create(ctx, &config.id, json!({"Users": {}, "Groups": {}}))
            .await?;
        Ok(config)
    }

    /// Resolves a pool by id, failing `ResourceNotFoundError` if unknown.
    pub async fn get_user_pool(&self, ctx: &Context, pool_id: &str) -> ApiResult<UserPoolService> {
        let directory = self.directory(ctx).await?;
        let config: UserPool = directory
            .get(ctx, &["UserPools", pool_id], None)
            .await?
            .ok_or_else(|| CognitoError::ResourceNotFound(format!("User pool {pool_id} does not exist.")))?;
        let store = self
            .store_factory
            .get(ctx, pool_id)
            .await?
            .ok_or_else(|| CognitoError::ResourceNotFound(format!("User pool {pool_id} does not exist.")))?;
        Ok(UserPoolService::new(config, store, directory, self.clock.clone()))
    }

    /// Resolves a pool via the client id it was issued to.
    pub async fn get_user_pool_for_client_id(&self, ctx: &Context, client_id: &str) -> ApiResult<UserPoolService> {
        let client = self.get_app_client(ctx, client_id).await?;
        self.get_user_pool(ctx, &client.user_pool_id).await
    }

    pub async fn delete_user_pool(&self, ctx: &Context, pool: &UserPool) -> ApiResult<()> {
        let directory = self.directory(ctx).await?;
        directory.delete(ctx, &["UserPools", &pool.id]).await?;
        self.store_factory.delete(ctx, &pool.id).await
    }

    pub async fn list_user_pools(&self, ctx: &Context) -> ApiResult<Vec<UserPool>> {
        let directory = self.directory(ctx).await?;
        let root = directory.get_root(ctx).await?;
        let pools = root
            .get("UserPools")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        pools
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(CognitoError::from))
            .collect()
    }

    pub async fn get_app_client(&self, ctx: &Context, client_id: &str) -> ApiResult<AppClient> {
        let directory = self.directory(ctx).await?;
        directory
            .get(ctx, &["Clients", client_id], None)
            .await?
            .ok_or_else(|| CognitoError::ResourceNotFound(format!("App client {client_id} does not exist.")))
    }

    pub async fn delete_app_client(&self, ctx: &Context, client: &AppClient) -> ApiResult<()> {
        let directory = self.directory(ctx).await?;
        directory.delete(ctx, &["Clients", &client.client_id]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    fn service() -> CognitoService {
        let dir = std::env::temp_dir().join(format!("emulator-cognito-test-{}", uuid::Uuid::new_v4()));
        CognitoService::new(Arc::new(DataStoreFactory::new(dir)), Arc::new(SystemClock))
    }

    fn pool(id: &str) -> UserPool {
        let now = chrono::Utc::now();
        UserPool {
            id: id.to_string(),
            pool_name: Some("test-pool".to_string()),
            username_attributes: vec![],
            auto_verified_attributes: vec![],
            mfa_configuration: Default::default(),
            schema_attributes: crate::domain::user_pool::default_schema_attributes(),
            sms_verification_message: None,
            sms_configuration: None,
            creation_date: now,
            last_modified_date: now,
        }
    }

    #[tokio::test]
    async fn get_user_pool_fails_with_resource_not_found_when_missing() {
        let svc = service();
        let ctx = Context::new();
        let err = svc.get_user_pool(&ctx, "missing").await.unwrap_err();
        assert_eq!(err.error_name(), "ResourceNotFoundException");
    }

    #[tokio::test]
    async fn create_then_list_user_pools_round_trips() {
        let svc = service();
        let ctx = Context::new();
        svc.create_user_pool(&ctx, pool("pool-a")).await.unwrap();
        svc.create_user_pool(&ctx, pool("pool-b")).await.unwrap();
        let pools = svc.list_user_pools(&ctx).await.unwrap();
        assert_eq!(pools.len(), 2);
    }

    #[tokio::test]
    async fn delete_user_pool_removes_directory_entry() {
        let svc = service();
        let ctx = Context::new();
        svc.create_user_pool(&ctx, pool("pool-a")).await.unwrap();
        svc.delete_user_pool(&ctx, &pool("pool-a")).await.unwrap();
        assert!(svc.get_user_pool(&ctx, "pool-a").await.is_err());
    }
}
