//! Trigger identity and the envelope fields every invocation shares.
//!
//! `EVENT_VERSION`/`EVENT_REGION` are hardcoded per the documented fidelity
//! risk (see `DESIGN.md` open-question resolutions) rather than modeled as
//! configuration — no real AWS account or region backs this process.

use serde::Serialize;

pub const EVENT_VERSION: &str = "0";
pub const EVENT_REGION: &str = "local";

/// The six hooks a UserPool may wire to an external function (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerName {
    PreSignUp,
    PostConfirmation,
    PostAuthentication,
    UserMigration,
    CustomMessage,
    PreTokenGeneration,
}

impl TriggerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreSignUp => "PreSignUp",
            Self::PostConfirmation => "PostConfirmation",
            Self::PostAuthentication => "PostAuthentication",
            Self::UserMigration => "UserMigration",
            Self::CustomMessage => "CustomMessage",
            Self::PreTokenGeneration => "PreTokenGeneration",
        }
    }
}

impl std::fmt::Display for TriggerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The synthetic `callerContext` every event embeds — there is no real AWS
/// SDK caller, so these are fixed placeholder values.
#[derive(Debug, Clone, Serialize)]
pub struct CallerContext {
    #[serde(rename = "awsSdkVersion")]
    pub aws_sdk_version: String,
    #[serde(rename = "clientId")]
    pub client_id: String,
}

impl CallerContext {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            aws_sdk_version: "aws-sdk-unknown".to_string(),
            client_id: client_id.into(),
        }
    }
}
