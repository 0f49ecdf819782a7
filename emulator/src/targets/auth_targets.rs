//! §4.3.2 InitiateAuth and its siblings: AdminInitiateAuth,
//! RespondToAuthChallenge.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
use crate::domain::{User, UserStatus};
use crate::messages::DeliveryMedium;
use crate::service::user_pool_service::UserPoolService;
use crate::targets::support::{optional_value, require_auth_parameter, require_nested_str, require_str, Deps};
use crate::targets::Target;
use crate::triggers::TokenSource;

/// §4.3.2 success path: issues tokens, stores the refresh token, fires
/// PostAuthentication (with `clientMetadata: undefined`, per the documented
/// behavior) if enabled.
async fn authentication_result(deps: &Deps, ctx: &Context, pool: &UserPoolService, client_id: &str, user: &mut User) -> ApiResult<Value> {
    let triple = deps.tokens.generate(ctx, TokenSource::Authentication, pool.id(), client_id, user, true).await?;
    if let Some(refresh_token) = triple.refresh_token.clone() {
        pool.store_refresh_token(ctx, refresh_token, user).await?;
    }

    if deps.triggers.enabled(crate::triggers::events::TriggerName::PostAuthentication) {
        deps.triggers
            .post_authentication(ctx, client_id, pool.id(), &user.username, &user.attributes)
            .await?;
    }

    Ok(json!({
        "AuthenticationResult": {
            "AccessToken": triple.access_token,
            "IdToken": triple.id_token,
            "RefreshToken": triple.refresh_token,
            "TokenType": "Bearer",
            "ExpiresIn": 86400,
        }
    }))
}

/// §4.3.2 step 7: MFA challenge path. Requires an `SMS` MFA option bound to
/// `phone_number`; generates and persists `MFACode`, delivers it, responds
/// with the `SMS_MFA` challenge. Never invokes PostAuthentication.
async fn sms_mfa_challenge(deps: &Deps, ctx: &Context, pool: &UserPoolService, client_id: &str, user: &mut User) -> ApiResult<Value> {
    let has_sms_option = user.mfa_options.iter().any(|o| o.delivery_medium == "SMS" && o.attribute_name == "phone_number");
    if !has_sms_option || !user.has_attribute("phone_number") {
        return Err(CognitoError::InvalidParameter(
            "User has no SMS MFA option configured".to_string(),
        ));
    }

    let code = deps.otp.generate();
    user.mfa_code = Some(code.clone());
    pool.save_user(ctx, user).await?;

    let details = deps
        .messages
        .deliver(
            ctx,
            crate::triggers::CustomMessageSource::Authentication,
            client_id,
            pool.id(),
            user,
            &code,
            None,
            DeliveryMedium::Sms,
            "phone_number",
        )
        .await?;

    Ok(json!({
        "ChallengeName": "SMS_MFA",
        "Session": Uuid::new_v4().to_string(),
        "ChallengeParameters": { "CODE_DELIVERY_DELIVERY_MEDIUM": "SMS", "CODE_DELIVERY_DESTINATION": details.destination },
    }))
}

fn new_password_required_challenge(user: &User) -> Value {
    let attributes_map: serde_json::Map<String, Value> =
        user.attributes.iter().map(|a| (a.name.clone(), json!(a.value))).collect();
    json!({
        "ChallengeName": "NEW_PASSWORD_REQUIRED",
        "Session": Uuid::new_v4().to_string(),
        "ChallengeParameters": {
            "USER_ID_FOR_SRP": user.username,
            "requiredAttributes": "[]",
            "userAttributes": serde_json::to_string(&attributes_map).unwrap_or_default(),
        },
    })
}

/// Shared USER_PASSWORD_AUTH / ADMIN_USER_PASSWORD_AUTH body, §4.3.2 steps
/// 1-7. `client_id` is the app client id in both cases; callers resolve the
/// pool differently (`InitiateAuth` via client id, `AdminInitiateAuth` via
/// an explicit `UserPoolId`).
async fn user_password_auth(
    deps: &Deps,
    ctx: &Context,
    pool: &UserPoolService,
    client_id: &str,
    request: &Value,
) -> ApiResult<Value> {
    let username = require_auth_parameter(request, "USERNAME")?;
    let password = require_auth_parameter(request, "PASSWORD")?;
    let client_metadata = optional_value(request, "ClientMetadata");

    let mut user = pool.get_user_by_username(ctx, username).await?;

    if user.is_none() && deps.triggers.enabled(crate::triggers::events::TriggerName::UserMigration) {
        let migrated = deps
            .triggers
            .user_migration(ctx, client_id, pool.id(), username, password, client_metadata.clone())
            .await?;
        if !migrated.user_attributes.is_empty() || migrated.final_user_status.is_some() {
            let now = deps.clock.now();
            let attributes = migrated
                .user_attributes
                .into_iter()
                .map(|(name, value)| crate::domain::Attribute::new(name, value))
                .collect();
            let status = match migrated.final_user_status.as_deref() {
                Some("RESET_REQUIRED") => UserStatus::ResetRequired,
                Some("FORCE_CHANGE_PASSWORD") => UserStatus::ForceChangePassword,
                _ => UserStatus::Confirmed,
            };
            let mut migrated_user = User::new(username, password, attributes, status, now);
            migrated_user.user_status = status;
            pool.save_user(ctx, &migrated_user).await?;
            user = Some(migrated_user);
        }
    }

    let mut user = user.ok_or_else(|| CognitoError::NotAuthorized("Incorrect username or password.".to_string()))?;

    if user.user_status == UserStatus::ResetRequired {
        return Err(CognitoError::PasswordResetRequired);
    }
    if user.user_status == UserStatus::ForceChangePassword {
        return Ok(new_password_required_challenge(&user));
    }
    if user.password != password {
        return Err(CognitoError::InvalidPassword);
    }

    let mfa_required = pool.config().mfa_configuration == crate::domain::MfaConfiguration::On
        || (pool.config().mfa_configuration == crate::domain::MfaConfiguration::Optional && !user.mfa_options.is_empty());
    if mfa_required {
        return sms_mfa_challenge(deps, ctx, pool, client_id, &mut user).await;
    }

    authentication_result(deps, ctx, pool, client_id, &mut user).await
}

/// §4.3.2 REFRESH_TOKEN / REFRESH_TOKEN_AUTH: no new refresh token minted.
async fn refresh_token_auth(deps: &Deps, ctx: &Context, pool: &UserPoolService, client_id: &str, request: &Value) -> ApiResult<Value> {
    let refresh_token = require_auth_parameter(request, "REFRESH_TOKEN")?;
    let user = pool
        .get_user_by_refresh_token(ctx, refresh_token)
        .await?
        .ok_or_else(|| CognitoError::NotAuthorized("Invalid Refresh Token".to_string()))?;

    let triple = deps.tokens.generate(ctx, TokenSource::RefreshTokens, pool.id(), client_id, &user, false).await?;
    Ok(json!({
        "AuthenticationResult": {
            "AccessToken": triple.access_token,
            "IdToken": triple.id_token,
            "TokenType": "Bearer",
            "ExpiresIn": 86400,
        }
    }))
}

pub struct InitiateAuth {
    deps: Arc<Deps>,
}

impl InitiateAuth {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for InitiateAuth {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let client_id = require_str(&request, "ClientId")?;
        let auth_flow = require_str(&request, "AuthFlow")?;
        let pool = self.deps.cognito.get_user_pool_for_client_id(ctx, client_id).await?;

        match auth_flow {
            "USER_PASSWORD_AUTH" => user_password_auth(&self.deps, ctx, &pool, client_id, &request).await,
            "REFRESH_TOKEN" | "REFRESH_TOKEN_AUTH" => refresh_token_auth(&self.deps, ctx, &pool, client_id, &request).await,
            other => Err(CognitoError::Unsupported(format!("{other} is not implemented"))),
        }
    }
}

pub struct AdminInitiateAuth {
    deps: Arc<Deps>,
}

impl AdminInitiateAuth {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for AdminInitiateAuth {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let pool_id = require_str(&request, "UserPoolId")?;
        let client_id = require_str(&request, "ClientId")?;
        let auth_flow = require_str(&request, "AuthFlow")?;
        let pool = self.deps.cognito.get_user_pool(ctx, pool_id).await?;

        match auth_flow {
            "ADMIN_USER_PASSWORD_AUTH" | "ADMIN_NO_SRP_AUTH" => user_password_auth(&self.deps, ctx, &pool, client_id, &request).await,
            "REFRESH_TOKEN" | "REFRESH_TOKEN_AUTH" => refresh_token_auth(&self.deps, ctx, &pool, client_id, &request).await,
            other => Err(CognitoError::Unsupported(format!("{other} is not implemented"))),
        }
    }
}

pub struct RespondToAuthChallenge {
    deps: Arc<Deps>,
}

impl RespondToAuthChallenge {
    pub fn new(deps: Arc<Deps>) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Target for RespondToAuthChallenge {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value> {
        let client_id = require_str(&request, "ClientId")?;
        let challenge_name = require_str(&request, "ChallengeName")?;
        let responses = request.get("ChallengeResponses").cloned().unwrap_or(Value::Null);
        let username = require_nested_str(&responses, "ChallengeResponses", "USERNAME")?;

        let pool = self.deps.cognito.get_user_pool_for_client_id(ctx, client_id).await?;
        let mut user = pool
            .get_user_by_username(ctx, username)
            .await?
            .ok_or_else(|| CognitoError::NotAuthorized("Incorrect username or password.".to_string()))?;

        match challenge_name {
            "SMS_MFA" => {
                let code = require_nested_str(&responses, "ChallengeResponses", "SMS_MFA_CODE")?;
                if user.mfa_code.as_deref() != Some(code) {
                    return Err(CognitoError::CodeMismatch);
                }
                user.mfa_code = None;
                pool.save_user(ctx, &user).await?;
                authentication_result(&self.deps, ctx, &pool, client_id, &mut user).await
            }
            "NEW_PASSWORD_REQUIRED" => {
                let new_password = require_nested_str(&responses, "ChallengeResponses", "NEW_PASSWORD")?;
                user.password = new_password.to_string();
                user.user_status = UserStatus::Confirmed;
                pool.save_user(ctx, &user).await?;
                authentication_result(&self.deps, ctx, &pool, client_id, &mut user).await
            }
            other => Err(CognitoError::Unsupported(format!("challenge {other} is not implemented"))),
        }
    }
}
