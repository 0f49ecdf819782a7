//! §4.3.1 SignUp and its siblings: ConfirmSignUp, AdminCreateUser,
//! AdminConfirmSignUp.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
use crate::domain::user_pool::AliasAttribute;
use crate::domain::{Attribute, User, UserStatus};
use crate::service::user_pool_service::UserPoolService;
use crate::targets::support::{auto_verified_channel, optional_str, optional_value, parse_attributes, require_str, Deps};
use crate::targets::Target;
use crate::triggers::{CustomMessageSource, PreSignUpSource};

#[allow(clippy::too_many_arguments)]
async fn create_user(
    deps: &Deps,
    ctx: &Context,
    pool: &UserPoolService,
    client_id: &str,
    username: &str,
    password: &str,
    user_attributes: Vec<Attribute>,
    initial_status: UserStatus,
    pre_sign_up_source: PreSignUpSource,
    custom_message_source: CustomMessageSource,
    client_metadata: Option<Value>,
) -> ApiResult<Value> {
    if pool.get_user_by_username(ctx, username).await?.is_some() {
        return Err(CognitoError::UsernameExists(format!(
            "User account {username} already exists"
        )));
    }

    let now = deps.clock.now();
    let mut user = User::new(username, password, user_attributes, initial_status, now);

    if deps.triggers.enabled(crate::triggers::events::TriggerName::PreSignUp) {
        let response = deps
            .triggers
            .pre_sign_up(ctx, pre_sign_up_source, client_id, pool.id(), username, &user.attributes, None, client_metadata.clone())
            .await?;
        if response.auto_confirm_user {
            user.user_status = UserStatus::Confirmed;
        }
        if response.auto_verify_email && user.has_attribute("email") {
            user.set_attribute("email_verified", "true");
        }
        if response.auto_verify_phone && user.has_attribute("phone_number") {
            user.set_attribute("phone_number_verified", "true");
        }
    }

    let mut code_delivery_details = None;
    if user.user_status != UserStatus::Confirmed {
        if let Some((medium, attribute_name)) = auto_verified_channel(pool.config(), &user)? {
            let code = deps.otp.generate();
            user.confirmation_code = Some(code.clone());
            let details = deps
                .messages
                .deliver(ctx, custom_message_source, client_id, pool.id(), &user, &code, client_metadata, medium, attribute_name)
                .await?;
            code_delivery_details = Some(details);
        }
    }

    pool.save_user(ctx, &user).await?;

    if user.user_status == UserStatus::Confirmed && deps.triggers.enabled(crate::triggers::events::TriggerName::PostConfirmation) {
        let mut attributes_with_status = user.attributes.clone();
        attributes_with_status.push(Attribute::new("cognito:user_status", "CONFIRMED"));
        deps.triggers
            .post_confirmation(
                ctx,
                crate::triggers::PostConfirmationSource::ConfirmSignUp,
                client_id,
                pool.id(),
                username,
                &attributes_with_status,
                None,
            )
            .await?;
    }

    Ok(json!({
        "UserConfirmed": user.user_status == UserStatus::Confirmed,
        "UserSub": user.sub(),
        "CodeDeliveryDetails": code_delivery_details.map(|d| serde_json::to_value(d).expect("CodeDeliveryDetails always serializes")),
    }))
}

pub struct SignUp {
    deps: Arc<Deps>,
}

impl SignUp {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for SignUp {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let client_id = require_str(&request, "ClientId")?;
        let username = require_str(&request, "Username")?;
        let password = require_str(&request, "Password")?;
        let attributes = parse_attributes(&request, "UserAttributes");
        let client_metadata = optional_value(&request, "ClientMetadata");

        let pool = self.deps.cognito.get_user_pool_for_client_id(ctx, client_id).await?;
        create_user(
            &self.deps,
            ctx,
            &pool,
            client_id,
            username,
            password,
            attributes,
            UserStatus::Unconfirmed,
            PreSignUpSource::SignUp,
            CustomMessageSource::SignUp,
            client_metadata,
        )
        .await
    }
}

pub struct AdminCreateUser {
    deps: Arc<Deps>,
}

impl AdminCreateUser {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminCreateUser {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let username = require_str(&request, "Username")?;
        let password = optional_str(&request, "TemporaryPassword")
            .map(str::to_string)
            .unwrap_or_else(|| self.deps.otp.generate());
        let attributes = parse_attributes(&request, "UserAttributes");
        let client_metadata = optional_value(&request, "ClientMetadata");

        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let client_id = pool_id;
        create_user(
            &self.deps,
            ctx,
            &pool,
            client_id,
            username,
            &password,
            attributes,
            UserStatus::ForceChangePassword,
            PreSignUpSource::AdminCreateUser,
            CustomMessageSource::AdminCreateUser,
            client_metadata,
        )
        .await
    }
}

pub struct ConfirmSignUp {
    deps: Arc<Deps>,
}

impl ConfirmSignUp {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for ConfirmSignUp {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let client_id = require_str(&request, "ClientId")?;
        let username = require_str(&request, "Username")?;
        let confirmation_code = require_str(&request, "ConfirmationCode")?;

        let pool = self.deps.cognito.get_user_pool_for_client_id(ctx, client_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;

        if user.user_status == UserStatus::Confirmed {
            return Err(CognitoError::NotAuthorized(
                "User cannot be confirmed. Current status is CONFIRMED.".to_string(),
            ));
        }
        if user.confirmation_code.as_deref() != Some(confirmation_code) {
            return Err(CognitoError::CodeMismatch);
        }

        user.user_status = UserStatus::Confirmed;
        user.confirmation_code = None;
        if pool.config().auto_verified(AliasAttribute::Email) && user.has_attribute("email") {
            user.set_attribute("email_verified", "true");
        }
        if pool.config().auto_verified(AliasAttribute::PhoneNumber) && user.has_attribute("phone_number") {
            user.set_attribute("phone_number_verified", "true");
        }
        pool.save_user(ctx, &user).await?;

        if self.deps.triggers.enabled(crate::triggers::events::TriggerName::PostConfirmation) {
            let mut attributes_with_status = user.attributes.clone();
            attributes_with_status.push(Attribute::new("cognito:user_status", "CONFIRMED"));
            self.deps
                .triggers
                .post_confirmation(
                    ctx,
                    crate::triggers::PostConfirmationSource::ConfirmSignUp,
                    client_id,
                    pool.id(),
                    username,
                    &attributes_with_status,
                    None,
                )
                .await?;
        }

        Ok(json!({}))
    }
}

pub struct AdminConfirmSignUp {
    deps: Arc<Deps>,
}

impl AdminConfirmSignUp {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminConfirmSignUp {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let username = require_str(&request, "Username")?;

        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::UserNotFound(format!("User {username} does not exist.")))?;

        user.user_status = UserStatus::Confirmed;
        user.confirmation_code = None;
        pool.save_user(ctx, &user).await?;

        if self.deps.triggers.enabled(crate::triggers::events::TriggerName::PostConfirmation) {
            let mut attributes_with_status = user.attributes.clone();
            attributes_with_status.push(Attribute::new("cognito:user_status", "CONFIRMED"));
            self.deps
                .triggers
                .post_confirmation(
                    ctx,
                    crate::triggers::PostConfirmationSource::AdminConfirmSignUp,
                    pool_id,
                    pool.id(),
                    username,
                    &attributes_with_status,
                    None,
                )
                .await?;
        }

        Ok(json!({}))
    }
}
