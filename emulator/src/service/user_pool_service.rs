//! `UserPoolService` — §4.2. Owns one pool's `DataStore`; borrows the
//! shared clients/directory `DataStore` (Design Note §9: "A UserPoolService
//! *borrows* the shared Clients DataStore but *owns* its own pool
//! DataStore").

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use shared::errors::{ApiResult, CognitoError};

use crate::clock::Clock;
use crate::context::Context;
use crate::domain::user_pool::AliasAttribute;
use crate::domain::{AppClient, Group, User, UserPool};
use crate::store::DataStore;

pub struct UserPoolService {
    config: UserPool,
    store: Arc<DataStore>,
    directory: Arc<DataStore>,
    clock: Arc<dyn Clock>,
}

impl UserPoolService {
    pub(crate) fn new(config: UserPool, store: Arc<DataStore>, directory: Arc<DataStore>, clock: Arc<dyn Clock>) -> Self {
        Self { config, store, directory, clock }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn config(&self) -> &UserPool {
        &self.config
    }

    /// Generates a `ClientId`, writes the new `AppClient` into the shared
    /// Clients store, returns it.
    pub async fn create_app_client(&self, ctx: &Context, name: impl Into<String>) -> ApiResult<AppClient> {
        let now = self.clock.now();
        let client = AppClient {
            client_id: Uuid::new_v4().to_string(),
            client_name: name.into(),
            user_pool_id: self.config.id.clone(),
            client_secret: None,
            refresh_token_validity: 30,
            creation_date: now,
            last_modified_date: now,
        };
        self.directory.set(ctx, &["Clients", &client.client_id], &client).await?;
        Ok(client)
    }

    /// Resolves a client id scoped to this pool; fails if the client
    /// belongs to a different pool or doesn't exist.
    pub async fn get_app_client(&self, ctx: &Context, client_id: &str) -> ApiResult<AppClient> {
        let client: AppClient = self
            .directory
            .get(ctx, &["Clients", client_id], None)
            .await?
            .ok_or_else(|| CognitoError::ResourceNotFound(format!("App client {client_id} does not exist.")))?;
        if client.user_pool_id != self.config.id {
            return Err(CognitoError::ResourceNotFound(format!(
                "App client {client_id} does not exist."
            )));
        }
        Ok(client)
    }

    pub async fn delete_app_client(&self, ctx: &Context, client_id: &str) -> ApiResult<()> {
        self.directory.delete(ctx, &["Clients", client_id]).await
    }

    pub async fn save_user(&self, ctx: &Context, user: &User) -> ApiResult<()> {
        self.store.set(ctx, &["Users", &user.username], user).await
    }

    pub async fn delete_user(&self, ctx: &Context, user: &User) -> ApiResult<()> {
        self.store.delete(ctx, &["Users", &user.username]).await
    }

    /// Direct key lookup; on miss, scans `Users` and matches `sub`, then
    /// (if alias enabled) `email`, then `phone_number`. First match in
    /// insertion order.
    pub async fn get_user_by_username(&self, ctx: &Context, username: &str) -> ApiResult<Option<User>> {
        if let Some(user) = self.store.get::<User>(ctx, &["Users", username], None).await? {
            return Ok(Some(user));
        }

        let users = self.list_users(ctx).await?;
        if let Some(user) = users.iter().find(|u| u.sub() == username) {
            return Ok(Some(user.clone()));
        }

        if self.config.alias_enabled(AliasAttribute::Email) {
            if let Some(user) = users
                .iter()
                .find(|u| u.attribute("email").is_some_and(|a| a.value == username))
            {
                return Ok(Some(user.clone()));
            }
        }

        if self.config.alias_enabled(AliasAttribute::PhoneNumber) {
            if let Some(user) = users
                .iter()
                .find(|u| u.attribute("phone_number").is_some_and(|a| a.value == username))
            {
                return Ok(Some(user.clone()));
            }
        }

        Ok(None)
    }

    pub async fn get_user_by_refresh_token(&self, ctx: &Context, token: &str) -> ApiResult<Option<User>> {
        let users = self.list_users(ctx).await?;
        Ok(users.into_iter().find(|u| u.refresh_tokens.iter().any(|t| t == token)))
    }

    pub async fn list_users(&self, ctx: &Context) -> ApiResult<Vec<User>> {
        let root = self.store.get_root(ctx).await?;
        let users = root.get("Users").and_then(Value::as_object).cloned().unwrap_or_default();
        users
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(CognitoError::from))
            .collect()
    }

    pub async fn list_groups(&self, ctx: &Context) -> ApiResult<Vec<Group>> {
        let root = self.store.get_root(ctx).await?;
        let groups = root.get("Groups").and_then(Value::as_object).cloned().unwrap_or_default();
        groups
            .values()
            .map(|value| serde_json::from_value(value.clone()).map_err(CognitoError::from))
            .collect()
    }

    pub async fn save_group(&self, ctx: &Context, group: &Group) -> ApiResult<()> {
        self.store.set(ctx, &["Groups", &group.group_name], group).await
    }

    /// Appends `token` to `user.refresh_tokens` and persists. `user` is
    /// mutated in place so the caller can keep using the updated record.
    pub async fn store_refresh_token(&self, ctx: &Context, token: String, user: &mut User) -> ApiResult<()> {
        user.refresh_tokens.push(token);
        self.save_user(ctx, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::domain::{Attribute, UserStatus};
    use crate::store::DataStoreFactory;
    use serde_json::json;

    async fn harness() -> (DataStoreFactory, UserPool) {
        let dir = std::env::temp_dir().join(format!("emulator-upsvc-test-{}", uuid::Uuid::new_v4()));
        let factory = DataStoreFactory::new(dir);
        let now = chrono::Utc::now();
        let config = UserPool {
            id: "pool-1".to_string(),
            pool_name: None,
            username_attributes: vec![AliasAttribute::Email],
            auto_verified_attributes: vec![],
            mfa_configuration: Default::default(),
            schema_attributes: crate::domain::user_pool::default_schema_attributes(),
            sms_verification_message: None,
            sms_configuration: None,
            creation_date: now,
            last_modified_date: now,
        };
        (factory, config)
    }

    async fn service(factory: &DataStoreFactory, config: UserPool) -> UserPoolService {
        let ctx = Context::new();
        let directory = factory.create(&ctx, "__directory__", json!({"Clients": {}, "UserPools": {}})).await.unwrap();
        let store = factory.create(&ctx, &config.id.clone(), json!({"Users": {}, "Groups": {}})).await.unwrap();
        UserPoolService::new(config, store, directory, Arc::new(SystemClock))
    }

    #[tokio::test]
    async fn get_user_by_username_falls_back_to_email_alias() {
        let (factory, config) = harness().await;
        let svc = service(&factory, config).await;
        let ctx = Context::new();
        let user = User::new(
            "alice",
            "p",
            vec![Attribute::new("email", "alice@example.com")],
            UserStatus::Confirmed,
            chrono::Utc::now(),
        );
        svc.save_user(&ctx, &user).await.unwrap();

        let found = svc.get_user_by_username(&ctx, "alice@example.com").await.unwrap();
        assert_eq!(found.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn get_user_by_username_falls_back_to_sub() {
        let (factory, config) = harness().await;
        let svc = service(&factory, config).await;
        let ctx = Context::new();
        let user = User::new("alice", "p", vec![], UserStatus::Confirmed, chrono::Utc::now());
        let sub = user.sub().to_string();
        svc.save_user(&ctx, &user).await.unwrap();

        let found = svc.get_user_by_username(&ctx, &sub).await.unwrap();
        assert_eq!(found.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn create_app_client_is_scoped_to_its_pool() {
        let (factory, config) = harness().await;
        let svc = service(&factory, config).await;
        let ctx = Context::new();
        let client = svc.create_app_client(&ctx, "my-app").await.unwrap();
        let fetched = svc.get_app_client(&ctx, &client.client_id).await.unwrap();
        assert_eq!(fetched.client_name, "my-app");
    }
}
