//! `User` — §3 DATA MODEL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `{Name, Value}` entry in a user's `Attributes` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// §3: `UserStatus` state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Unconfirmed,
    Confirmed,
    ForceChangePassword,
    ResetRequired,
    Archived,
    Unknown,
}

/// `{DeliveryMedium, AttributeName}` — only `SMS`/`phone_number` is
/// supported (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MfaOption {
    pub delivery_medium: String,
    pub attribute_name: String,
}

impl MfaOption {
    pub fn sms(attribute_name: impl Into<String>) -> Self {
        Self {
            delivery_medium: "SMS".to_string(),
            attribute_name: attribute_name.into(),
        }
    }
}

/// Scoped to one UserPool. Identified by `Username`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub username: String,
    pub attributes: Vec<Attribute>,
    pub password: String,
    pub user_status: UserStatus,
    pub enabled: bool,
    #[serde(default)]
    pub mfa_options: Vec<MfaOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mfa_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_verification_code: Option<String>,
    #[serde(default)]
    pub refresh_tokens: Vec<String>,
    pub user_create_date: DateTime<Utc>,
    pub user_last_modified_date: DateTime<Utc>,
}

impl User {
    /// Invariant 2: every User has exactly one immutable `sub`, assigned
    /// at creation.
    pub fn sub(&self) -> &str {
        self.attribute("sub")
            .map(|a| a.value.as_str())
            .unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Inserts or replaces an attribute, preserving the position of an
    /// existing entry with the same name (appends if new).
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.attributes.iter_mut().find(|a| a.name == name) {
            existing.value = value;
        } else {
            self.attributes.push(Attribute::new(name, value));
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        self.attributes.retain(|a| a.name != name);
    }

    /// Builds a fresh user in the state every creation path starts from:
    /// a generated `sub` prepended to the caller-supplied attributes,
    /// `RefreshTokens` empty, and both timestamps set to `now`.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        mut caller_attributes: Vec<Attribute>,
        status: UserStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let mut attributes = vec![Attribute::new("sub", Uuid::new_v4().to_string())];
        attributes.append(&mut caller_attributes);

        Self {
            username: username.into(),
            attributes,
            password: password.into(),
            user_status: status,
            enabled: true,
            mfa_options: Vec::new(),
            confirmation_code: None,
            mfa_code: None,
            attribute_verification_code: None,
            refresh_tokens: Vec::new(),
            user_create_date: now,
            user_last_modified_date: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn new_user_has_exactly_one_sub_attribute() {
        let user = User::new(
            "alice",
            "hunter2",
            vec![Attribute::new("email", "alice@example.com")],
            UserStatus::Unconfirmed,
            now(),
        );
        let subs: Vec<_> = user.attributes.iter().filter(|a| a.name == "sub").collect();
        assert_eq!(subs.len(), 1);
        assert!(!subs[0].value.is_empty());
    }

    #[test]
    fn set_attribute_replaces_existing_in_place() {
        let mut user = User::new("alice", "p", vec![], UserStatus::Unconfirmed, now());
        user.set_attribute("email", "a@x.com");
        let position_before = user.attributes.iter().position(|a| a.name == "email");
        user.set_attribute("email", "b@x.com");
        let position_after = user.attributes.iter().position(|a| a.name == "email");
        assert_eq!(position_before, position_after);
        assert_eq!(user.attribute("email").unwrap().value, "b@x.com");
    }

    #[test]
    fn user_status_round_trips_through_json() {
        let json = serde_json::to_string(&UserStatus::ForceChangePassword).unwrap();
        assert_eq!(json, "\"FORCE_CHANGE_PASSWORD\"");
        let back: UserStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserStatus::ForceChangePassword);
    }
}
