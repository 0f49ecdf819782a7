//! # Error taxonomy
//!
//! The error type every collaborator (DataStore, CognitoService,
//! UserPoolService, Triggers, Lambda, Messages, TokenGenerator) propagates
//! with `?`, and the single place where HTTP status codes are assigned.
//!
//! ## Wire format
//!
//! Unlike a typical REST API, the wire protocol here is fixed by the
//! service being emulated: every error response is `{"__type":
//! "<ErrorName>", "message": "..."}`, with `<ErrorName>` matching the
//! taxonomy row name exactly. [`CognitoError::error_name()`] is the single
//! source of truth for that string; [`CognitoError::status_code()`] is the
//! single source of truth for the HTTP status.
//!
//! ## Adding a variant
//!
//! 1. Add the variant with `#[error("...")]` for the message template.
//! 2. Extend `error_name()` and `status_code()`.
//! 3. Add a test to the bottom of this file asserting the mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Result type alias used throughout the emulator.
pub type ApiResult<T> = Result<T, CognitoError>;

/// The closed error taxonomy. Every variant corresponds to one row in the
/// documented error table; `Io` and `Internal` are ambient additions for
/// failures the taxonomy doesn't name (malformed on-disk JSON, broken
/// pipes), both surfaced as a generic 500.
#[derive(Debug, Error)]
pub enum CognitoError {
    /// Missing user pool or app client.
    #[error("{0}")]
    ResourceNotFound(String),

    /// Admin operation targeting a user that doesn't exist.
    #[error("{0}")]
    UserNotFound(String),

    /// `SignUp`/`AdminCreateUser` with a username already taken.
    #[error("{0}")]
    UsernameExists(String),

    /// Missing user, missing required MFA option, or bad refresh token.
    #[error("{0}")]
    NotAuthorized(String),

    /// Stored password didn't match the one supplied.
    #[error("Incorrect username or password.")]
    InvalidPassword,

    /// User status is `RESET_REQUIRED`.
    #[error("Password reset required for the user")]
    PasswordResetRequired,

    /// Confirmation or MFA code didn't match the one on file.
    #[error("Invalid code provided, please request a code again.")]
    CodeMismatch,

    /// Schema, alias, or attribute validation rule failed.
    #[error("{0}")]
    InvalidParameter(String),

    /// Operation or auth flow not implemented.
    #[error("{0}")]
    Unsupported(String),

    /// Lambda invocation failed at the transport layer (timeout, connection
    /// refused, DNS failure).
    #[error("Unable to invoke lambda function for {trigger}: {reason}")]
    UnexpectedLambdaException { trigger: String, reason: String },

    /// Lambda returned a 2xx body that didn't parse into the expected
    /// `{response: {...}}` envelope.
    #[error("Could not parse response from lambda for {trigger}: {reason}")]
    InvalidLambdaResponse { trigger: String, reason: String },

    /// Lambda returned a non-2xx status; `reason` is its reported
    /// `FunctionError` detail.
    #[error("{reason}")]
    UserLambdaValidation { trigger: String, reason: String },

    /// On-disk document I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure, either persisted documents or wire
    /// payloads.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for conditions with no dedicated variant.
    #[error("{0}")]
    Internal(String),
}

impl CognitoError {
    /// The `__type` value the wire protocol expects in an error body.
    pub fn error_name(&self) -> &'static str {
        match self {
            Self::ResourceNotFound(_) => "ResourceNotFoundException",
            Self::UserNotFound(_) => "UserNotFoundException",
            Self::UsernameExists(_) => "UsernameExistsException",
            Self::NotAuthorized(_) => "NotAuthorizedException",
            Self::InvalidPassword => "InvalidPasswordException",
            Self::PasswordResetRequired => "PasswordResetRequiredException",
            Self::CodeMismatch => "CodeMismatchException",
            Self::InvalidParameter(_) => "InvalidParameterException",
            Self::Unsupported(_) => "UnsupportedOperationException",
            Self::UnexpectedLambdaException { .. } => "UnexpectedLambdaException",
            Self::InvalidLambdaResponse { .. } => "InvalidLambdaResponseException",
            Self::UserLambdaValidation { .. } => "UserLambdaValidationException",
            Self::Io(_) | Self::Serialization(_) | Self::Internal(_) => "InternalErrorException",
        }
    }

    /// Single source of truth for the HTTP status of every variant.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound(_)
            | Self::UserNotFound(_)
            | Self::UsernameExists(_)
            | Self::NotAuthorized(_)
            | Self::InvalidPassword
            | Self::PasswordResetRequired
            | Self::CodeMismatch
            | Self::InvalidParameter(_)
            | Self::UserLambdaValidation { .. } => StatusCode::BAD_REQUEST,

            Self::Unsupported(_)
            | Self::UnexpectedLambdaException { .. }
            | Self::InvalidLambdaResponse { .. }
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// The wire error body: `{"__type": "<ErrorName>", "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "__type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: &CognitoError) -> Self {
        Self {
            error_type: error.error_name().to_string(),
            message: error.to_string(),
        }
    }
}

impl ResponseError for CognitoError {
    fn status_code(&self) -> StatusCode {
        CognitoError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self))
    }
}
