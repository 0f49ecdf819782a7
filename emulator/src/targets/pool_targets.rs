//! Pool, client, and group management targets — the create/describe/delete/
//! list operations named in §4.3 as following "the common pattern: (a)
//! resolve pool (404 if missing), (b) resolve/mutate user or group, (c)
//! persist."

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use shared::errors::ApiResult;

use crate::context::Context;
use crate::domain::user_pool::{default_schema_attributes, AliasAttribute};
use crate::domain::{Group, UserPool};
use crate::targets::support::{attributes_json, optional_str, optional_value, require_str, Deps};
use crate::targets::Target;

fn parse_alias_list(request: &Value, field: &str) -> Vec<AliasAttribute> {
    request
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|s| match s {
                    "email" => Some(AliasAttribute::Email),
                    "phone_number" => Some(AliasAttribute::PhoneNumber),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn user_pool_json(pool: &UserPool) -> Value {
    serde_json::to_value(pool).expect("UserPool always serializes")
}

pub struct CreateUserPool {
    deps: Arc<Deps>,
}

impl CreateUserPool {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for CreateUserPool {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let now = self.deps.clock.now();
        let pool = UserPool {
            id: uuid::Uuid::new_v4().to_string(),
            pool_name: optional_str(&request, "PoolName").map(str::to_string),
            username_attributes: parse_alias_list(&request, "UsernameAttributes"),
            auto_verified_attributes: parse_alias_list(&request, "AutoVerifiedAttributes"),
            mfa_configuration: Default::default(),
            schema_attributes: default_schema_attributes(),
            sms_verification_message: optional_str(&request, "SmsVerificationMessage").map(str::to_string),
            sms_configuration: optional_value(&request, "SmsConfiguration"),
            creation_date: now,
            last_modified_date: now,
        };
        let created = self.deps.cognito.create_user_pool(ctx, pool).await?;
        Ok(json!({ "UserPool": user_pool_json(&created) }))
    }
}

pub struct DescribeUserPool {
    deps: Arc<Deps>,
}

impl DescribeUserPool {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for DescribeUserPool {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        Ok(json!({ "UserPool": user_pool_json(pool.config()) }))
    }
}

pub struct DeleteUserPool {
    deps: Arc<Deps>,
}

impl DeleteUserPool {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for DeleteUserPool {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        self.deps.cognito.delete_user_pool(ctx, pool.config()).await?;
        Ok(json!({}))
    }
}

pub struct ListUserPools {
    deps: Arc<Deps>,
}

impl ListUserPools {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for ListUserPools {
    async fn execute(&self, ctx: &Context, _request: Value) -> ApiResult<Value> {
        let pools = self.deps.cognito.list_user_pools(ctx).await?;
        let pools: Vec<Value> = pools.iter().map(user_pool_json).collect();
        Ok(json!({ "UserPools": pools }))
    }
}

pub struct GetUserPoolMfaConfig {
    deps: Arc<Deps>,
}

impl GetUserPoolMfaConfig {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for GetUserPoolMfaConfig {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        Ok(json!({ "MfaConfiguration": pool.config().mfa_configuration }))
    }
}

pub struct CreateUserPoolClient {
    deps: Arc<Deps>,
}

impl CreateUserPoolClient {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for CreateUserPoolClient {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let client_name = require_str(&request, "ClientName")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let client = pool.create_app_client(ctx, client_name).await?;
        Ok(json!({ "UserPoolClient": serde_json::to_value(&client).expect("AppClient always serializes") }))
    }
}

pub struct DescribeUserPoolClient {
    deps: Arc<Deps>,
}

impl DescribeUserPoolClient {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for DescribeUserPoolClient {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let client_id = require_str(&request, "ClientId")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let client = pool.get_app_client(ctx, client_id).await?;
        Ok(json!({ "UserPoolClient": serde_json::to_value(&client).expect("AppClient always serializes") }))
    }
}

pub struct DeleteUserPoolClient {
    deps: Arc<Deps>,
}

impl DeleteUserPoolClient {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for DeleteUserPoolClient {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let client_id = require_str(&request, "ClientId")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        pool.delete_app_client(ctx, client_id).await?;
        Ok(json!({}))
    }
}

pub struct CreateGroup {
    deps: Arc<Deps>,
}

impl CreateGroup {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for CreateGroup {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let group_name = require_str(&request, "GroupName")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let now = self.deps.clock.now();
        let group = Group {
            group_name: group_name.to_string(),
            user_pool_id: pool_id.to_string(),
            description: optional_str(&request, "Description").map(str::to_string),
            precedence: request.get("Precedence").and_then(Value::as_i64).map(|p| p as i32),
            role_arn: optional_str(&request, "RoleArn").map(str::to_string),
            creation_date: now,
            last_modified_date: now,
        };
        pool.save_group(ctx, &group).await?;
        Ok(json!({ "Group": serde_json::to_value(&group).expect("Group always serializes") }))
    }
}

pub struct ListGroups {
    deps: Arc<Deps>,
}

impl ListGroups {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for ListGroups {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let groups = pool.list_groups(ctx).await?;
        let groups: Vec<Value> = groups.iter().map(|g| serde_json::to_value(g).expect("Group always serializes")).collect();
        Ok(json!({ "Groups": groups }))
    }
}

pub struct ListUsers {
    deps: Arc<Deps>,
}

impl ListUsers {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for ListUsers {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let users = pool.list_users(ctx).await?;
        let users: Vec<Value> = users
            .iter()
            .map(|u| {
                json!({
                    "Username": u.username,
                    "Attributes": attributes_json(&u.attributes),
                    "UserStatus": u.user_status,
                    "Enabled": u.enabled,
                    "UserCreateDate": u.user_create_date,
                    "UserLastModifiedDate": u.user_last_modified_date,
                })
            })
            .collect();
        Ok(json!({ "Users": users }))
    }
}
