//! `Triggers` — §4.4. The typed façade over [`lambda::Lambda`]: each method
//! adapts ergonomic caller arguments into the structured event envelope a
//! real hook function expects, dispatches it, and decodes the `response`
//! Lambda already extracted back into a typed struct.
//!
//! Per Design Note §9, "the mapping from internal caller arguments to
//! external event envelopes is per-trigger-source" — modeled here as one
//! small source enum per trigger that knows its own `TriggerSource` string,
//! rather than a single sum type over all ~20 strings, since each trigger's
//! request/response shape already differs.

pub mod events;
pub mod lambda;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use shared::errors::ApiResult;

use crate::context::Context;
use crate::domain::Attribute;
use crate::triggers::events::{CallerContext, TriggerName, EVENT_REGION, EVENT_VERSION};
use crate::triggers::lambda::Lambda;

fn attributes_to_map(attributes: &[Attribute]) -> HashMap<&str, &str> {
    attributes.iter().map(|a| (a.name.as_str(), a.value.as_str())).collect()
}

/// `PreSignUp_*` — which internal flow is calling.
#[derive(Debug, Clone, Copy)]
pub enum PreSignUpSource {
    SignUp,
    AdminCreateUser,
}

impl PreSignUpSource {
    fn trigger_source(self) -> &'static str {
        match self {
            Self::SignUp => "PreSignUp_SignUp",
            Self::AdminCreateUser => "PreSignUp_AdminCreateUser",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PostConfirmationSource {
    ConfirmSignUp,
    AdminConfirmSignUp,
    ForgotPassword,
}

impl PostConfirmationSource {
    fn trigger_source(self) -> &'static str {
        match self {
            Self::ConfirmSignUp => "PostConfirmation_ConfirmSignUp",
            Self::AdminConfirmSignUp => "PostConfirmation_AdminConfirmSignUp",
            Self::ForgotPassword => "PostConfirmation_ConfirmForgotPassword",
        }
    }
}

/// The handful of message contexts `CustomMessage_<Source>` covers.
#[derive(Debug, Clone, Copy)]
pub enum CustomMessageSource {
    SignUp,
    AdminCreateUser,
    ResendCode,
    ForgotPassword,
    UpdateUserAttribute,
    VerifyUserAttribute,
    Authentication,
}

impl CustomMessageSource {
    fn trigger_source(self) -> &'static str {
        match self {
            Self::SignUp => "CustomMessage_SignUp",
            Self::AdminCreateUser => "CustomMessage_AdminCreateUser",
            Self::ResendCode => "CustomMessage_ResendCode",
            Self::ForgotPassword => "CustomMessage_ForgotPassword",
            Self::UpdateUserAttribute => "CustomMessage_UpdateUserAttribute",
            Self::VerifyUserAttribute => "CustomMessage_VerifyUserAttribute",
            Self::Authentication => "CustomMessage_Authentication",
        }
    }
}

/// `TokenGeneration_*` — also doubles as the `source` value §4.3.2 threads
/// through to `TokenGenerator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Authentication,
    NewPasswordChallenge,
    RefreshTokens,
}

impl TokenSource {
    fn trigger_source(self) -> &'static str {
        match self {
            Self::Authentication => "TokenGeneration_Authentication",
            Self::NewPasswordChallenge => "TokenGeneration_NewPasswordChallenge",
            Self::RefreshTokens => "TokenGeneration_RefreshTokens",
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "camelCase", default)]
pub struct PreSignUpResponse {
    pub auto_confirm_user: bool,
    pub auto_verify_email: bool,
    pub auto_verify_phone: bool,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct UserMigrationResponse {
    pub user_attributes: HashMap<String, String>,
    pub final_user_status: Option<String>,
    pub message_action: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomMessageResponse {
    pub sms_message: Option<String>,
    pub email_message: Option<String>,
    pub email_subject: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ClaimsOverrideDetails {
    pub claims_to_add_or_override: HashMap<String, Value>,
    pub claims_to_suppress: Vec<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct PreTokenGenerationResponse {
    pub claims_override_details: ClaimsOverrideDetails,
}

pub struct Triggers {
    lambda: Arc<dyn Lambda>,
}

impl Triggers {
    pub fn new(lambda: Arc<dyn Lambda>) -> Self {
        Self { lambda }
    }

    pub fn enabled(&self, trigger: TriggerName) -> bool {
        self.lambda.is_configured(trigger)
    }

    fn envelope(&self, trigger_source: &str, user_pool_id: &str, client_id: &str, username: &str, request: Value) -> Value {
        json!({
            "version": EVENT_VERSION,
            "triggerSource": trigger_source,
            "region": EVENT_REGION,
            "userPoolId": user_pool_id,
            "userName": username,
            "callerContext": CallerContext::new(client_id),
            "request": request,
            "response": {},
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn pre_sign_up(
        &self,
        ctx: &Context,
        source: PreSignUpSource,
        client_id: &str,
        user_pool_id: &str,
        username: &str,
        user_attributes: &[Attribute],
        validation_data: Option<Value>,
        client_metadata: Option<Value>,
    ) -> ApiResult<PreSignUpResponse> {
        let request = json!({
            "userAttributes": attributes_to_map(user_attributes),
            "validationData": validation_data,
            "clientMetadata": client_metadata,
        });
        let event = self.envelope(source.trigger_source(), user_pool_id, client_id, username, request);
        let response = self.lambda.invoke(ctx, TriggerName::PreSignUp, event).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn post_confirmation(
        &self,
        ctx: &Context,
        source: PostConfirmationSource,
        client_id: &str,
        user_pool_id: &str,
        username: &str,
        user_attributes: &[Attribute],
        client_metadata: Option<Value>,
    ) -> ApiResult<()> {
        let request = json!({
            "userAttributes": attributes_to_map(user_attributes),
            "clientMetadata": client_metadata,
        });
        let event = self.envelope(source.trigger_source(), user_pool_id, client_id, username, request);
        self.lambda.invoke(ctx, TriggerName::PostConfirmation, event).await?;
        Ok(())
    }

    /// Invoked with `clientMetadata: undefined` per the documented
    /// §4.3.2 success-path behavior.
    pub async fn post_authentication(
        &self,
        ctx: &Context,
        client_id: &str,
        user_pool_id: &str,
        username: &str,
        user_attributes: &[Attribute],
    ) -> ApiResult<()> {
        let request = json!({
            "userAttributes": attributes_to_map(user_attributes),
            "newDeviceUsed": false,
        });
        let event = self.envelope("PostAuthentication_Authentication", user_pool_id, client_id, username, request);
        self.lambda.invoke(ctx, TriggerName::PostAuthentication, event).await?;
        Ok(())
    }

    /// Note the documented argument swap: the value passed as this
    /// method's `client_metadata` lands in the event's `validationData`
    /// field, and the event's `clientMetadata` is always `null`.
    pub async fn user_migration(
        &self,
        ctx: &Context,
        client_id: &str,
        user_pool_id: &str,
        username: &str,
        password: &str,
        client_metadata: Option<Value>,
    ) -> ApiResult<UserMigrationResponse> {
        let request = json!({
            "password": password,
            "validationData": client_metadata,
            "clientMetadata": Value::Null,
        });
        let event = self.envelope("UserMigration_Authentication", user_pool_id, client_id, username, request);
        let response = self.lambda.invoke(ctx, TriggerName::UserMigration, event).await?;
        Ok(serde_json::from_value(response)?)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn custom_message(
        &self,
        ctx: &Context,
        source: CustomMessageSource,
        client_id: &str,
        user_pool_id: &str,
        username: &str,
        user_attributes: &[Attribute],
        client_metadata: Option<Value>,
    ) -> ApiResult<CustomMessageResponse> {
        let request = json!({
            "userAttributes": attributes_to_map(user_attributes),
            "codeParameter": "{####}",
            "usernameParameter": "{username}",
            "clientMetadata": client_metadata,
        });
        let event = self.envelope(source.trigger_source(), user_pool_id, client_id, username, request);
        let response = self.lambda.invoke(ctx, TriggerName::CustomMessage, event).await?;
        Ok(serde_json::from_value(response)?)
    }

    pub async fn pre_token_generation(
        &self,
        ctx: &Context,
        source: TokenSource,
        client_id: &str,
        user_pool_id: &str,
        username: &str,
        user_attributes: &[Attribute],
    ) -> ApiResult<PreTokenGenerationResponse> {
        let request = json!({
            "userAttributes": attributes_to_map(user_attributes),
            "groupConfiguration": {},
            "clientMetadata": Value::Null,
        });
        let event = self.envelope(source.trigger_source(), user_pool_id, client_id, username, request);
        let response = self.lambda.invoke(ctx, TriggerName::PreTokenGeneration, event).await?;
        Ok(serde_json::from_value(response)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triggers::lambda::MockLambda;
    use mockall::predicate::eq;

    fn ctx() -> Context {
        Context::new()
    }

    #[tokio::test]
    async fn pre_sign_up_decodes_auto_confirm_flags() {
        let mut mock = MockLambda::new();
        mock.expect_invoke()
            .with(mockall::predicate::always(), eq(TriggerName::PreSignUp), mockall::predicate::always())
            .returning(|_, _, _| {
                Box::pin(async { Ok(json!({"autoConfirmUser": true, "autoVerifyEmail": true, "autoVerifyPhone": false})) })
            });
        let triggers = Triggers::new(Arc::new(mock));
        let response = triggers
            .pre_sign_up(&ctx(), PreSignUpSource::SignUp, "client", "pool", "alice", &[], None, None)
            .await
            .unwrap();
        assert!(response.auto_confirm_user);
        assert!(response.auto_verify_email);
        assert!(!response.auto_verify_phone);
    }

    #[tokio::test]
    async fn enabled_reflects_lambda_configuration() {
        let mut mock = MockLambda::new();
        mock.expect_is_configured().with(eq(TriggerName::PreSignUp)).returning(|_| true);
        let triggers = Triggers::new(Arc::new(mock));
        assert!(triggers.enabled(TriggerName::PreSignUp));
    }
}
