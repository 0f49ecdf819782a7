//! Wire-shape helpers shared by every target in this module: pulling typed
//! fields out of the raw request `Value` and building the `{Name, Value}`
//! attribute-list shape the wire protocol uses everywhere.

use std::sync::Arc;

use serde_json::Value;

use shared::errors::{ApiResult, CognitoError};
use shared::validation::validators::not_blank;

use crate::clock::Clock;
use crate::domain::user_pool::AliasAttribute;
use crate::domain::{Attribute, User, UserPool};
use crate::messages::{DeliveryMedium, Messages};
use crate::otp::OtpGenerator;
use crate::service::CognitoService;
use crate::tokens::TokenGenerator;
use crate::triggers::Triggers;

/// The collaborators every target is constructed with. Grouped into one
/// struct so `Router`'s builder doesn't have to thread six separate `Arc`
/// clones through each of the ~30 target constructors individually.
pub struct Deps {
    pub cognito: Arc<CognitoService>,
    pub triggers: Arc<Triggers>,
    pub messages: Arc<Messages>,
    pub tokens: Arc<TokenGenerator>,
    pub clock: Arc<dyn Clock>,
    pub otp: Arc<dyn OtpGenerator>,
}

pub fn require_str<'a>(request: &'a Value, field: &str) -> ApiResult<&'a str> {
    let value = request
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| CognitoError::InvalidParameter(format!("{field} is required")))?;
    not_blank(value).map_err(|_| CognitoError::InvalidParameter(format!("{field} is required")))?;
    Ok(value)
}

pub fn optional_str<'a>(request: &'a Value, field: &str) -> Option<&'a str> {
    request.get(field).and_then(Value::as_str)
}

pub fn optional_bool(request: &Value, field: &str) -> bool {
    request.get(field).and_then(Value::as_bool).unwrap_or(false)
}

pub fn optional_value(request: &Value, field: &str) -> Option<Value> {
    request.get(field).cloned().filter(|v| !v.is_null())
}

/// Decodes a wire `[{Name, Value}, ...]` attribute list.
pub fn parse_attributes(request: &Value, field: &str) -> Vec<Attribute> {
    request
        .get(field)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = item.get("Name")?.as_str()?.to_string();
                    let value = item.get("Value").and_then(Value::as_str).unwrap_or_default().to_string();
                    Some(Attribute::new(name, value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Encodes a `[{Name, Value}, ...]` attribute list for a response body.
pub fn attributes_json(attributes: &[Attribute]) -> Value {
    serde_json::to_value(attributes).expect("Attribute always serializes")
}

/// Reads a required string field out of a nested request object (e.g.
/// `AuthParameters.USERNAME`, `ChallengeResponses.SMS_MFA_CODE`), erroring
/// with `"<container>.<field> is required"` — the one place both
/// `InitiateAuth`'s `AuthParameters` and `RespondToAuthChallenge`'s
/// `ChallengeResponses` lookups go through, instead of each target inlining
/// its own `.get(...).and_then(Value::as_str)` chain.
pub fn require_nested_str<'a>(container: &'a Value, container_name: &str, field: &str) -> ApiResult<&'a str> {
    container
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CognitoError::InvalidParameter(format!("{container_name}.{field} is required")))
}

pub fn require_auth_parameter<'a>(request: &'a Value, field: &str) -> ApiResult<&'a str> {
    let params = request.get("AuthParameters").unwrap_or(&Value::Null);
    require_nested_str(params, "AuthParameters", field)
}

/// §4.3.1 step 4: which attribute/channel a one-time code goes to for a
/// given user pool + user, or `None` if no auto-verified attribute is
/// configured at all. Shared by `SignUp` and `ForgotPassword`, both of
/// which pick a delivery channel this same way.
pub fn auto_verified_channel(pool: &UserPool, user: &User) -> ApiResult<Option<(DeliveryMedium, &'static str)>> {
    let phone_configured = pool.auto_verified(AliasAttribute::PhoneNumber);
    let email_configured = pool.auto_verified(AliasAttribute::Email);
    if !phone_configured && !email_configured {
        return Ok(None);
    }
    if phone_configured && user.has_attribute("phone_number") {
        return Ok(Some((DeliveryMedium::Sms, "phone_number")));
    }
    if email_configured && user.has_attribute("email") {
        return Ok(Some((DeliveryMedium::Email, "email")));
    }
    Err(CognitoError::InvalidParameter(
        "User has no attribute matching desired auto verified attributes".to_string(),
    ))
}
