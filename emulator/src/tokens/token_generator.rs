//! `TokenGenerator` — §4.5. Issues and verifies the RS256 token triple.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use shared::errors::{ApiResult, CognitoError};

use crate::clock::Clock;
use crate::context::Context;
use crate::domain::User;
use crate::triggers::events::TriggerName;
use crate::triggers::{TokenSource, Triggers};
use crate::tokens::key_material::KeyMaterial;

const ID_TOKEN_LIFETIME_SECS: i64 = 24 * 60 * 60;

pub struct TokenTriple {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
}

/// The subset of access-token claims targets need to resolve the caller:
/// `ChangePassword`, `GetUser`, `DeleteUser`, `RevokeToken` all take an
/// `AccessToken` body field rather than an `Authorization` header, matching
/// the upstream wire protocol.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub username: String,
    pub iss: String,
    pub client_id: String,
    pub token_use: String,
    pub exp: i64,
}

impl AccessClaims {
    /// The user pool id is the last path segment of `iss`
    /// (`http://localhost:<port>/<UserPoolId>`).
    pub fn user_pool_id(&self) -> &str {
        self.iss.rsplit('/').next().unwrap_or_default()
    }
}

pub struct TokenGenerator {
    key_material: Arc<KeyMaterial>,
    clock: Arc<dyn Clock>,
    triggers: Arc<Triggers>,
    issuer_base: String,
}

impl TokenGenerator {
    pub fn new(key_material: Arc<KeyMaterial>, clock: Arc<dyn Clock>, triggers: Arc<Triggers>, port: u16) -> Self {
        Self {
            key_material,
            clock,
            triggers,
            issuer_base: format!("http://localhost:{port}"),
        }
    }

    /// Issues an id/access token pair, and a refresh token when
    /// `issue_refresh_token` is set (the `REFRESH_TOKEN` flow re-uses this
    /// method but never mints a new refresh token, per §4.3.2).
    pub async fn generate(
        &self,
        ctx: &Context,
        source: TokenSource,
        user_pool_id: &str,
        client_id: &str,
        user: &User,
        issue_refresh_token: bool,
    ) -> ApiResult<TokenTriple> {
        let now = self.clock.now();
        let iat = now.timestamp();
        let exp = iat + ID_TOKEN_LIFETIME_SECS;
        let iss = format!("{}/{}", self.issuer_base, user_pool_id);

        let mut id_claims = Map::new();
        for attribute in &user.attributes {
            id_claims.insert(attribute.name.clone(), json!(attribute.value));
        }
        id_claims.insert("sub".to_string(), json!(user.sub()));
        id_claims.insert("cognito:username".to_string(), json!(user.username));
        id_claims.insert("iss".to_string(), json!(iss));
        id_claims.insert("aud".to_string(), json!(client_id));
        id_claims.insert("token_use".to_string(), json!("id"));
        id_claims.insert("auth_time".to_string(), json!(iat));
        id_claims.insert("iat".to_string(), json!(iat));
        id_claims.insert("exp".to_string(), json!(exp));
        id_claims.insert("jti".to_string(), json!(Uuid::new_v4().to_string()));

        if self.triggers.enabled(TriggerName::PreTokenGeneration) {
            let overrides = self
                .triggers
                .pre_token_generation(ctx, source, client_id, user_pool_id, &user.username, &user.attributes)
                .await?;
            for (key, value) in overrides.claims_override_details.claims_to_add_or_override {
                id_claims.insert(key, value);
            }
            for key in overrides.claims_override_details.claims_to_suppress {
                id_claims.remove(&key);
            }
        }

        let id_token = self.sign(&id_claims)?;

        let mut access_claims = Map::new();
        access_claims.insert("sub".to_string(), json!(user.sub()));
        access_claims.insert("username".to_string(), json!(user.username));
        access_claims.insert("iss".to_string(), json!(iss));
        access_claims.insert("client_id".to_string(), json!(client_id));
        access_claims.insert("token_use".to_string(), json!("access"));
        access_claims.insert("auth_time".to_string(), json!(iat));
        access_claims.insert("iat".to_string(), json!(iat));
        access_claims.insert("exp".to_string(), json!(exp));
        access_claims.insert("jti".to_string(), json!(Uuid::new_v4().to_string()));
        let access_token = self.sign(&access_claims)?;

        let refresh_token = issue_refresh_token.then(|| Uuid::new_v4().to_string());

        Ok(TokenTriple { access_token, id_token, refresh_token })
    }

    fn sign(&self, claims: &Map<String, Value>) -> ApiResult<String> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_material.kid().to_string());
        encode(&header, claims, self.key_material.encoding_key())
            .map_err(|err| CognitoError::Internal(format!("failed to sign token: {err}")))
    }

    /// Decodes and verifies a bearer access token, rejecting id tokens and
    /// anything that doesn't verify against this process's key material.
    pub fn decode_access_token(&self, token: &str) -> ApiResult<AccessClaims> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        let data = decode::<AccessClaims>(token, &self.key_material.decoding_key(), &validation)
            .map_err(|_| CognitoError::NotAuthorized("Invalid Access Token".to_string()))?;
        if data.claims.token_use != "access" {
            return Err(CognitoError::NotAuthorized("Invalid Access Token".to_string()));
        }
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::domain::{Attribute, UserStatus};
    use crate::triggers::lambda::MockLambda;

    fn generator() -> TokenGenerator {
        let mut lambda_mock = MockLambda::new();
        lambda_mock.expect_is_configured().returning(|_| false);
        let triggers = Arc::new(Triggers::new(Arc::new(lambda_mock)));
        TokenGenerator::new(Arc::new(KeyMaterial::generate("kid-1")), Arc::new(SystemClock), triggers, 9229)
    }

    fn user() -> User {
        User::new(
            "alice",
            "p",
            vec![Attribute::new("email", "alice@example.com")],
            UserStatus::Confirmed,
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn generate_issues_a_refresh_token_when_requested() {
        let generator = generator();
        let triple = generator
            .generate(&Context::new(), TokenSource::Authentication, "pool-1", "client-1", &user(), true)
            .await
            .unwrap();
        assert!(triple.refresh_token.is_some());
        assert!(!triple.access_token.is_empty());
        assert!(!triple.id_token.is_empty());
    }

    #[tokio::test]
    async fn refresh_flow_does_not_mint_a_new_refresh_token() {
        let generator = generator();
        let triple = generator
            .generate(&Context::new(), TokenSource::RefreshTokens, "pool-1", "client-1", &user(), false)
            .await
            .unwrap();
        assert!(triple.refresh_token.is_none());
    }

    #[tokio::test]
    async fn decode_access_token_round_trips() {
        let generator = generator();
        let triple = generator
            .generate(&Context::new(), TokenSource::Authentication, "pool-1", "client-1", &user(), true)
            .await
            .unwrap();
        let claims = generator.decode_access_token(&triple.access_token).unwrap();
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.user_pool_id(), "pool-1");
    }

    #[tokio::test]
    async fn decode_access_token_rejects_an_id_token() {
        let generator = generator();
        let triple = generator
            .generate(&Context::new(), TokenSource::Authentication, "pool-1", "client-1", &user(), true)
            .await
            .unwrap();
        assert!(generator.decode_access_token(&triple.id_token).is_err());
    }
}
