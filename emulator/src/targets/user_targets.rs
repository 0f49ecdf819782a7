//! §4.3.3 user-lookup and session-teardown targets: GetUser, DeleteUser,
//! AdminGetUser, AdminDeleteUser, RevokeToken.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
use crate::targets::support::{attributes_json, require_str, Deps};
use crate::targets::Target;

async fn resolve_caller(deps: &Deps, ctx: &Context, access_token: &str) -> ApiResult<(crate::service::user_pool_service::UserPoolService, crate::domain::User)> {
    let claims = deps.tokens.decode_access_token(access_token)?;
    let pool = deps.cognito.get_user_pool(ctx, claims.user_pool_id()).await?;
    let user = pool
        .get_user_by_username(ctx, &claims.username)
        .await?
        .ok_or_else(|| CognitoError::UserNotFound(format!("User {} does not exist.", claims.username)))?;
    Ok((pool, user))
}

pub struct GetUser {
    deps: Arc<Deps>,
}

impl GetUser {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for GetUser {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let access_token = require_str(&request, "AccessToken")?;
        let (_pool, user) = resolve_caller(&self.deps, ctx, access_token).await?;
        Ok(json!({
            "Username": user.username,
            "UserAttributes": attributes_json(&user.attributes),
            "MFAOptions": serde_json::to_value(&user.mfa_options).expect("MfaOption always serializes"),
        }))
    }
}

pub struct DeleteUser {
    deps: Arc<Deps>,
}

impl DeleteUser {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for DeleteUser {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let access_token = require_str(&request, "AccessToken")?;
        let (pool, user) = resolve_caller(&self.deps, ctx, access_token).await?;
        pool.delete_user(ctx, &user).await?;
        Ok(json!({}))
    }
}

pub struct AdminGetUser {
    deps: Arc<Deps>,
}

impl AdminGetUser {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminGetUser {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let username = require_str(&request, "Username")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;
        Ok(json!({
            "Username": user.username,
            "UserAttributes": attributes_json(&user.attributes),
            "UserStatus": user.user_status,
            "Enabled": user.enabled,
            "MFAOptions": serde_json::to_value(&user.mfa_options).expect("MfaOption always serializes"),
            "UserCreateDate": user.user_create_date,
            "UserLastModifiedDate": user.user_last_modified_date,
        }))
    }
}

pub struct AdminDeleteUser {
    deps: Arc<Deps>,
}

impl AdminDeleteUser {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminDeleteUser {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let username = require_str(&request, "Username")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;
        pool.delete_user(ctx, &user).await?;
        Ok(json!({}))
    }
}

pub struct RevokeToken {
    deps: Arc<Deps>,
}

impl RevokeToken {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for RevokeToken {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let token = require_str(&request, "Token")?;
        let client_id = require_str(&request, "ClientId")?;
        let pool = self.deps.cognito.get_user_pool_for_client_id(ctx, client_id).await?;
        if let Some(mut user) = pool.get_user_by_refresh_token(ctx, token).await? {
            user.refresh_tokens.retain(|t| t != token);
            pool.save_user(ctx, &user).await?;
        }
        Ok(json!({}))
    }
}
