//! `Lambda` — §4.4. Owns the `triggerName → functionName` map and invokes
//! the external function synchronously.
//!
//! **[SUPPLEMENT]** Transport resolved as HTTP POST (see SPEC_FULL.md
//! §4.4): `functionName` is a URL, invoked with the JSON event envelope as
//! body, mirroring how SAM Local / `serverless-offline` expose functions as
//! local HTTP endpoints. `reqwest` is already in the dependency set.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
use crate::triggers::events::TriggerName;

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Lambda: Send + Sync {
    /// Whether a function is configured for `trigger` — backs
    /// `Triggers::enabled`.
    fn is_configured(&self, trigger: TriggerName) -> bool;

    /// Invokes the function configured for `trigger` with `event`, and
    /// returns its `response` field.
    async fn invoke(&self, ctx: &Context, trigger: TriggerName, event: Value) -> ApiResult<Value>;
}

pub struct HttpLambda {
    functions: HashMap<TriggerName, String>,
    client: reqwest::Client,
}

impl HttpLambda {
    pub fn new(functions: HashMap<TriggerName, String>) -> Self {
        Self {
            functions,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Lambda for HttpLambda {
    fn is_configured(&self, trigger: TriggerName) -> bool {
        self.functions.contains_key(&trigger)
    }

    async fn invoke(&self, ctx: &Context, trigger: TriggerName, event: Value) -> ApiResult<Value> {
        let function_name = self.functions.get(&trigger).ok_or_else(|| CognitoError::Internal(
            format!("no function configured for trigger {trigger}"),
        ))?;

        let response = self
            .client
            .post(function_name)
            .timeout(ctx.lambda_timeout)
            .json(&event)
            .send()
            .await
            .map_err(|err| CognitoError::UnexpectedLambdaException {
                trigger: trigger.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if status.as_u16() != 200 {
            let reason = body
                .get("FunctionError")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("lambda responded with status {status}"));
            return Err(CognitoError::UserLambdaValidation {
                trigger: trigger.to_string(),
                reason,
            });
        }

        body.get("response")
            .cloned()
            .ok_or_else(|| CognitoError::InvalidLambdaResponse {
                trigger: trigger.to_string(),
                reason: "response body missing a `response` field".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_configured_reflects_the_function_map() {
        let mut functions = HashMap::new();
        functions.insert(TriggerName::PreSignUp, "http://localhost:4000/pre-sign-up".to_string());
        let lambda = HttpLambda::new(functions);
        assert!(lambda.is_configured(TriggerName::PreSignUp));
        assert!(!lambda.is_configured(TriggerName::PostConfirmation));
    }
}
