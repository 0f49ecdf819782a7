//! §4.3.3 attribute-mutation and verification targets: UpdateUserAttributes,
//! AdminUpdateUserAttributes, AdminDeleteUserAttributes, DeleteUserAttributes,
//! VerifyUserAttribute, GetUserAttributeVerificationCode.
//!
//! "enforce schema (validatePermittedAttributeChanges) — reject
//! unknown/immutable attributes; reject `email_verified` without `email`
//! and analogously for `phone_number`. On modification of `email` or
//! `phone_number`, default the corresponding `*_verified` to `"false"` if
//! not supplied."

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
use crate::domain::{Attribute, User, UserPool};
use crate::messages::DeliveryMedium;
use crate::service::user_pool_service::UserPoolService;
use crate::targets::support::{optional_value, parse_attributes, require_str, Deps};
use crate::targets::Target;
use crate::triggers::CustomMessageSource;

/// Applies §4.3.3's `validatePermittedAttributeChanges` rule set in place,
/// then defaults the paired `*_verified` flag for any changed `email` /
/// `phone_number`.
fn apply_attribute_changes(pool: &UserPool, user: &mut User, changes: &[Attribute]) -> ApiResult<()> {
    for change in changes {
        let schema = pool
            .schema_for(&change.name)
            .ok_or_else(|| CognitoError::InvalidParameter(format!("Attribute does not exist in the schema: {}", change.name)))?;
        if !schema.mutable && user.has_attribute(&change.name) {
            return Err(CognitoError::InvalidParameter(format!(
                "Attribute cannot be updated. (changing immutable attribute: {})",
                change.name
            )));
        }
        if change.name == "email_verified" && !user.has_attribute("email") {
            return Err(CognitoError::InvalidParameter(
                "Email is required to verify/modify email_verified".to_string(),
            ));
        }
        if change.name == "phone_number_verified" && !user.has_attribute("phone_number") {
            return Err(CognitoError::InvalidParameter(
                "Phone number is required to verify/modify phone_number_verified".to_string(),
            ));
        }
    }

    for change in changes {
        user.set_attribute(change.name.clone(), change.value.clone());
        if change.name == "email" && !changes.iter().any(|c| c.name == "email_verified") {
            user.set_attribute("email_verified", "false");
        }
        if change.name == "phone_number" && !changes.iter().any(|c| c.name == "phone_number_verified") {
            user.set_attribute("phone_number_verified", "false");
        }
    }

    Ok(())
}

async fn resolve_caller(deps: &Deps, ctx: &Context, access_token: &str) -> ApiResult<(UserPoolService, User, crate::tokens::AccessClaims)> {
    let claims = deps.tokens.decode_access_token(access_token)?;
    let pool = deps.cognito.get_user_pool(ctx, claims.user_pool_id()).await?;
    let user = pool
        .get_user_by_username(ctx, &claims.username)
        .await?
        .ok_or_else(|| CognitoError::UserNotFound(format!("User {} does not exist.", claims.username)))?;
    Ok((pool, user, claims))
}

pub struct UpdateUserAttributes {
    deps: Arc<Deps>,
}

impl UpdateUserAttributes {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for UpdateUserAttributes {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let access_token = require_str(&request, "AccessToken")?;
        let changes = parse_attributes(&request, "UserAttributes");
        let (pool, mut user, _claims) = resolve_caller(&self.deps, ctx, access_token).await?;
        apply_attribute_changes(pool.config(), &mut user, &changes)?;
        pool.save_user(ctx, &user).await?;
        Ok(json!({ "CodeDeliveryDetailsList": [] }))
    }
}

pub struct AdminUpdateUserAttributes {
    deps: Arc<Deps>,
}

impl AdminUpdateUserAttributes {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminUpdateUserAttributes {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let username = require_str(&request, "Username")?;
        let changes = parse_attributes(&request, "UserAttributes");
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;
        apply_attribute_changes(pool.config(), &mut user, &changes)?;
        pool.save_user(ctx, &user).await?;
        Ok(json!({}))
    }
}

pub struct AdminDeleteUserAttributes {
    deps: Arc<Deps>,
}

impl AdminDeleteUserAttributes {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminDeleteUserAttributes {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let username = require_str(&request, "Username")?;
        let names = request
            .get("UserAttributeNames")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_default();

        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;

        for name in names {
            let schema = pool
                .config()
                .schema_for(name)
                .ok_or_else(|| CognitoError::InvalidParameter(format!("Attribute does not exist in the schema: {name}")))?;
            if !schema.mutable {
                return Err(CognitoError::InvalidParameter(format!(
                    "Attribute cannot be deleted. (immutable attribute: {name})"
                )));
            }
            user.remove_attribute(name);
        }
        pool.save_user(ctx, &user).await?;
        Ok(json!({}))
    }
}

pub struct DeleteUserAttributes {
    deps: Arc<Deps>,
}

impl DeleteUserAttributes {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for DeleteUserAttributes {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let access_token = require_str(&request, "AccessToken")?;
        let names = request
            .get("UserAttributeNames")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect::<Vec<_>>())
            .unwrap_or_default();

        let (pool, mut user, _claims) = resolve_caller(&self.deps, ctx, access_token).await?;
        for name in names {
            let schema = pool
                .config()
                .schema_for(name)
                .ok_or_else(|| CognitoError::InvalidParameter(format!("Attribute does not exist in the schema: {name}")))?;
            if !schema.mutable {
                return Err(CognitoError::InvalidParameter(format!(
                    "Attribute cannot be deleted. (immutable attribute: {name})"
                )));
            }
            user.remove_attribute(name);
        }
        pool.save_user(ctx, &user).await?;
        Ok(json!({}))
    }
}

pub struct VerifyUserAttribute {
    deps: Arc<Deps>,
}

impl VerifyUserAttribute {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for VerifyUserAttribute {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let access_token = require_str(&request, "AccessToken")?;
        let attribute_name = require_str(&request, "AttributeName")?;
        let code = require_str(&request, "Code")?;

        let (pool, mut user, _claims) = resolve_caller(&self.deps, ctx, access_token).await?;
        if user.attribute_verification_code.as_deref() != Some(code) {
            return Err(CognitoError::CodeMismatch);
        }
        user.set_attribute(format!("{attribute_name}_verified"), "true");
        user.attribute_verification_code = None;
        pool.save_user(ctx, &user).await?;
        Ok(json!({}))
    }
}

pub struct GetUserAttributeVerificationCode {
    deps: Arc<Deps>,
}

impl GetUserAttributeVerificationCode {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for GetUserAttributeVerificationCode {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let access_token = require_str(&request, "AccessToken")?;
        let attribute_name = require_str(&request, "AttributeName")?;
        let client_metadata = optional_value(&request, "ClientMetadata");

        let (pool, mut user, claims) = resolve_caller(&self.deps, ctx, access_token).await?;
        if !user.has_attribute(attribute_name) {
            return Err(CognitoError::InvalidParameter(format!("User has no attribute named {attribute_name}")));
        }
        let medium = match attribute_name {
            "phone_number" => DeliveryMedium::Sms,
            "email" => DeliveryMedium::Email,
            other => return Err(CognitoError::InvalidParameter(format!("Verification of attribute {other} is not supported"))),
        };

        let code = self.deps.otp.generate();
        user.attribute_verification_code = Some(code.clone());
        let details = self
            .deps
            .messages
            .deliver(
                ctx,
                CustomMessageSource::VerifyUserAttribute,
                &claims.client_id,
                pool.id(),
                &user,
                &code,
                client_metadata,
                medium,
                attribute_name,
            )
            .await?;
        pool.save_user(ctx, &user).await?;

        Ok(json!({ "CodeDeliveryDetails": serde_json::to_value(details).expect("CodeDeliveryDetails always serializes") }))
    }
}
