//! # Targets and Router — §4.3, §4.7
//!
//! A target is "a single function `(ctx, request) → response`" (§4.3);
//! modeled here as one small struct per operation implementing [`Target`],
//! constructed once at startup with the [`support::Deps`] it needs and
//! stored in the [`Router`]'s dispatch table under its wire operation name.
//!
//! Grouped into one file per functional area rather than one file per
//! operation (33 one-method files would scatter related logic that shares
//! helpers — e.g. every attribute mutator reuses the same schema-enforcement
//! routine).

pub mod support;

pub mod attribute_targets;
pub mod auth_targets;
pub mod password_targets;
pub mod pool_targets;
pub mod signup_targets;
pub mod user_targets;

#[cfg(test)]
mod scenario_tests;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
pub use support::Deps;

/// One operation handler. Takes the raw JSON request body, returns the raw
/// JSON response body — the Router and HTTP boundary never need to know
/// the per-operation shape.
#[async_trait]
pub trait Target: Send + Sync {
    async fn execute(&self, ctx: &Context, request: Value) -> ApiResult<Value>;
}

/// §4.7: "Holds a closed map `operationName → target constructor`."
/// Constructed once via [`Router::build`]; `route` is the only entry point
/// used at request time.
pub struct Router {
    targets: HashMap<&'static str, Box<dyn Target>>,
}

impl Router {
    /// Builds the full dispatch table for the ~30-operation wire surface
    /// (§6), each target sharing the same [`Deps`].
    pub fn build(deps: Arc<Deps>) -> Self {
        let mut targets: HashMap<&'static str, Box<dyn Target>> = HashMap::new();

        macro_rules! register {
            ($name:literal, $target:expr) => {
                targets.insert($name, Box::new($target) as Box<dyn Target>);
            };
        }

        register!("CreateUserPool", pool_targets::CreateUserPool::new(deps.clone()));
        register!("DescribeUserPool", pool_targets::DescribeUserPool::new(deps.clone()));
        register!("DeleteUserPool", pool_targets::DeleteUserPool::new(deps.clone()));
        register!("ListUserPools", pool_targets::ListUserPools::new(deps.clone()));
        register!("GetUserPoolMfaConfig", pool_targets::GetUserPoolMfaConfig::new(deps.clone()));
        register!("CreateUserPoolClient", pool_targets::CreateUserPoolClient::new(deps.clone()));
        register!("DescribeUserPoolClient", pool_targets::DescribeUserPoolClient::new(deps.clone()));
        register!("DeleteUserPoolClient", pool_targets::DeleteUserPoolClient::new(deps.clone()));
        register!("CreateGroup", pool_targets::CreateGroup::new(deps.clone()));
        register!("ListGroups", pool_targets::ListGroups::new(deps.clone()));
        register!("ListUsers", pool_targets::ListUsers::new(deps.clone()));

        register!("SignUp", signup_targets::SignUp::new(deps.clone()));
        register!("ConfirmSignUp", signup_targets::ConfirmSignUp::new(deps.clone()));
        register!("AdminCreateUser", signup_targets::AdminCreateUser::new(deps.clone()));
        register!("AdminConfirmSignUp", signup_targets::AdminConfirmSignUp::new(deps.clone()));

        register!("InitiateAuth", auth_targets::InitiateAuth::new(deps.clone()));
        register!("AdminInitiateAuth", auth_targets::AdminInitiateAuth::new(deps.clone()));
        register!("RespondToAuthChallenge", auth_targets::RespondToAuthChallenge::new(deps.clone()));

        register!("ForgotPassword", password_targets::ForgotPassword::new(deps.clone()));
        register!("ConfirmForgotPassword", password_targets::ConfirmForgotPassword::new(deps.clone()));
        register!("ChangePassword", password_targets::ChangePassword::new(deps.clone()));
        register!("AdminSetUserPassword", password_targets::AdminSetUserPassword::new(deps.clone()));

        register!("GetUser", user_targets::GetUser::new(deps.clone()));
        register!("DeleteUser", user_targets::DeleteUser::new(deps.clone()));
        register!("AdminGetUser", user_targets::AdminGetUser::new(deps.clone()));
        register!("AdminDeleteUser", user_targets::AdminDeleteUser::new(deps.clone()));
        register!("RevokeToken", user_targets::RevokeToken::new(deps.clone()));

        register!("UpdateUserAttributes", attribute_targets::UpdateUserAttributes::new(deps.clone()));
        register!("AdminUpdateUserAttributes", attribute_targets::AdminUpdateUserAttributes::new(deps.clone()));
        register!("AdminDeleteUserAttributes", attribute_targets::AdminDeleteUserAttributes::new(deps.clone()));
        register!("DeleteUserAttributes", attribute_targets::DeleteUserAttributes::new(deps.clone()));
        register!("VerifyUserAttribute", attribute_targets::VerifyUserAttribute::new(deps.clone()));
        register!("GetUserAttributeVerificationCode", attribute_targets::GetUserAttributeVerificationCode::new(deps.clone()));

        Self { targets }
    }

    /// §4.7: unknown operation ⇒ `UnsupportedError`; a known target's error
    /// propagates as-is with its error name/status mapping (§7).
    pub async fn route(&self, ctx: &Context, operation: &str, request: Value) -> ApiResult<Value> {
        match self.targets.get(operation) {
            Some(target) => target.execute(ctx, request).await,
            None => Err(CognitoError::Unsupported(format!("Operation {operation} is not supported"))),
        }
    }
}
