//! §4.3.3 password-lifecycle targets: ForgotPassword, ConfirmForgotPassword,
//! ChangePassword, AdminSetUserPassword.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
use crate::domain::UserStatus;
use crate::targets::support::{auto_verified_channel, optional_bool, optional_value, require_str, Deps};
use crate::targets::Target;
use crate::triggers::CustomMessageSource;

pub struct ForgotPassword {
    deps: Arc<Deps>,
}

impl ForgotPassword {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for ForgotPassword {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let client_id = require_str(&request, "ClientId")?;
        let username = require_str(&request, "Username")?;
        let client_metadata = optional_value(&request, "ClientMetadata");

        let pool = self.deps.cognito.get_user_pool_for_client_id(ctx, client_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;

        let (medium, attribute_name) = auto_verified_channel(pool.config(), &user)?.ok_or_else(|| {
            CognitoError::InvalidParameter("User has no attribute matching desired auto verified attributes".to_string())
        })?;

        let code = self.deps.otp.generate();
        user.confirmation_code = Some(code.clone());
        user.user_status = UserStatus::ResetRequired;
        let details = self
            .deps
            .messages
            .deliver(ctx, CustomMessageSource::ForgotPassword, client_id, pool.id(), &user, &code, client_metadata, medium, attribute_name)
            .await?;
        pool.save_user(ctx, &user).await?;

        Ok(json!({ "CodeDeliveryDetails": serde_json::to_value(details).expect("CodeDeliveryDetails always serializes") }))
    }
}

pub struct ConfirmForgotPassword {
    deps: Arc<Deps>,
}

impl ConfirmForgotPassword {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for ConfirmForgotPassword {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let client_id = require_str(&request, "ClientId")?;
        let username = require_str(&request, "Username")?;
        let confirmation_code = require_str(&request, "ConfirmationCode")?;
        let password = require_str(&request, "Password")?;

        let pool = self.deps.cognito.get_user_pool_for_client_id(ctx, client_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;

        if user.confirmation_code.as_deref() != Some(confirmation_code) {
            return Err(CognitoError::CodeMismatch);
        }

        user.password = password.to_string();
        user.user_status = UserStatus::Confirmed;
        user.confirmation_code = None;
        pool.save_user(ctx, &user).await?;

        if self.deps.triggers.enabled(crate::triggers::events::TriggerName::PostConfirmation) {
            self.deps
                .triggers
                .post_confirmation(
                    ctx,
                    crate::triggers::PostConfirmationSource::ForgotPassword,
                    client_id,
                    pool.id(),
                    username,
                    &user.attributes,
                    None,
                )
                .await?;
        }

        Ok(json!({}))
    }
}

pub struct ChangePassword {
    deps: Arc<Deps>,
}

impl ChangePassword {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for ChangePassword {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let access_token = require_str(&request, "AccessToken")?;
        let previous_password = require_str(&request, "PreviousPassword")?;
        let proposed_password = require_str(&request, "ProposedPassword")?;

        let claims = self.deps.tokens.decode_access_token(access_token)?;
        let pool = self.deps.cognito.get_user_pool(ctx, claims.user_pool_id()).await?;
        let mut user = pool
            .get_user_by_username(ctx, &claims.username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {} does not exist.", claims.username)))?;

        if user.password != previous_password {
            return Err(CognitoError::InvalidPassword);
        }
        user.password = proposed_password.to_string();
        pool.save_user(ctx, &user).await?;
        Ok(json!({}))
    }
}

pub struct AdminSetUserPassword {
    deps: Arc<Deps>,
}

impl AdminSetUserPassword {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminSetUserPassword {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let username = require_str(&request, "Username")?;
        let password = require_str(&request, "Password")?;
        let permanent = optional_bool(&request, "Permanent");

        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;

        user.password = password.to_string();
        user.user_status = if permanent { UserStatus::Confirmed } else { UserStatus::ForceChangePassword };
        pool.save_user(ctx, &user).await?;
        Ok(json!({}))
    }
}
