//! `UserPool` and `AppClient` — §3 DATA MODEL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An attribute that may alias the primary username at sign-in, or
/// auto-receive a confirmation code on sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasAttribute {
    Email,
    PhoneNumber,
}

/// §3: `MfaConfiguration`: one of `OFF`, `OPTIONAL`, `ON`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MfaConfiguration {
    Off,
    Optional,
    On,
}

impl Default for MfaConfiguration {
    fn default() -> Self {
        Self::Off
    }
}

/// An entry in a pool's `SchemaAttributes`: describes one permitted user
/// attribute and whether it may be changed after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SchemaAttribute {
    pub name: String,
    pub mutable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_data_type: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// The default schema every new pool is seeded with: the mandatory
/// immutable `sub`, plus mutable `email` and `phone_number` so the common
/// alias-attribute scenarios work out of the box.
pub fn default_schema_attributes() -> Vec<SchemaAttribute> {
    vec![
        SchemaAttribute {
            name: "sub".to_string(),
            mutable: false,
            attribute_data_type: Some("String".to_string()),
            required: true,
        },
        SchemaAttribute {
            name: "email".to_string(),
            mutable: true,
            attribute_data_type: Some("String".to_string()),
            required: false,
        },
        SchemaAttribute {
            name: "email_verified".to_string(),
            mutable: true,
            attribute_data_type: Some("Boolean".to_string()),
            required: false,
        },
        SchemaAttribute {
            name: "phone_number".to_string(),
            mutable: true,
            attribute_data_type: Some("String".to_string()),
            required: false,
        },
        SchemaAttribute {
            name: "phone_number_verified".to_string(),
            mutable: true,
            attribute_data_type: Some("Boolean".to_string()),
            required: false,
        },
    ]
}

/// The top-level tenant. Identified by a free-form `Id` string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserPool {
    pub id: String,
    #[serde(default)]
    pub pool_name: Option<String>,
    #[serde(default)]
    pub username_attributes: Vec<AliasAttribute>,
    #[serde(default)]
    pub auto_verified_attributes: Vec<AliasAttribute>,
    #[serde(default)]
    pub mfa_configuration: MfaConfiguration,
    #[serde(default = "default_schema_attributes")]
    pub schema_attributes: Vec<SchemaAttribute>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_verification_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms_configuration: Option<serde_json::Value>,
    pub creation_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

impl UserPool {
    pub fn alias_enabled(&self, attribute: AliasAttribute) -> bool {
        self.username_attributes.contains(&attribute)
    }

    pub fn auto_verified(&self, attribute: AliasAttribute) -> bool {
        self.auto_verified_attributes.contains(&attribute)
    }

    pub fn schema_for(&self, name: &str) -> Option<&SchemaAttribute> {
        self.schema_attributes.iter().find(|s| s.name == name)
    }
}

/// A credential holder scoped to exactly one UserPool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AppClient {
    pub client_id: String,
    pub client_name: String,
    pub user_pool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default = "default_refresh_token_validity")]
    pub refresh_token_validity: u32,
    pub creation_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

fn default_refresh_token_validity() -> u32 {
    30
}

/// Scoped to one UserPool. Identified by `GroupName`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    pub group_name: String,
    pub user_pool_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precedence: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    pub creation_date: DateTime<Utc>,
    pub last_modified_date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_attribute_serializes_snake_case() {
        let json = serde_json::to_string(&AliasAttribute::PhoneNumber).unwrap();
        assert_eq!(json, "\"phone_number\"");
    }

    #[test]
    fn mfa_configuration_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&MfaConfiguration::Optional).unwrap();
        assert_eq!(json, "\"OPTIONAL\"");
    }

    #[test]
    fn default_schema_includes_immutable_sub() {
        let schema = default_schema_attributes();
        let sub = schema.iter().find(|s| s.name == "sub").unwrap();
        assert!(!sub.mutable);
    }
}
