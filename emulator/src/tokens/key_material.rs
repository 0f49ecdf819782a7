//! `KeyMaterial` — §4.5 AMBIENT. One RSA-2048 keypair generated at process
//! startup, never persisted or rotated.
//!
//! Grounded on `examples/Plawn-r2e/r2e-oidc/src/keys.rs`'s `OidcKeyPair`:
//! the teacher's own dependency set has no RSA/JWKS support (its
//! `shared::auth::jwt` signs HS256 only), so this substitutes the same
//! crate combination the retrieval pack's OIDC crate uses for the same
//! problem, rather than inventing one.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;

/// Generated once in `main`, shared behind an `Arc` by the `TokenGenerator`
/// and the JWKS HTTP handler.
pub struct KeyMaterial {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    n: String,
    e: String,
    kid: String,
}

impl KeyMaterial {
    /// Generates a fresh RSA-2048 keypair and assigns it `kid`.
    pub fn generate(kid: impl Into<String>) -> Self {
        let private_key = RsaPrivateKey::new(&mut OsRng, 2048).expect("failed to generate RSA-2048 key");
        let public_key = RsaPublicKey::from(&private_key);

        let pkcs8_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .expect("failed to export RSA key as PKCS8 PEM");
        let encoding_key =
            EncodingKey::from_rsa_pem(pkcs8_pem.as_bytes()).expect("failed to build EncodingKey from RSA PEM");

        let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
        let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
        let decoding_key =
            DecodingKey::from_rsa_components(&n, &e).expect("failed to build DecodingKey from RSA components");

        Self {
            encoding_key,
            decoding_key,
            n,
            e,
            kid: kid.into(),
        }
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    pub fn decoding_key(&self) -> DecodingKey {
        self.decoding_key.clone()
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// The JWKS document served at `GET /<UserPoolId>/.well-known/jwks.json`.
    pub fn jwks_json(&self) -> JwksResponse<'_> {
        JwksResponse {
            keys: vec![JwkEntry {
                kty: "RSA",
                alg: "RS256",
                r#use: "sig",
                kid: &self.kid,
                n: &self.n,
                e: &self.e,
            }],
        }
    }
}

#[derive(Serialize)]
pub struct JwksResponse<'a> {
    pub keys: Vec<JwkEntry<'a>>,
}

#[derive(Serialize)]
pub struct JwkEntry<'a> {
    pub kty: &'a str,
    pub alg: &'a str,
    #[serde(rename = "use")]
    pub r#use: &'a str,
    pub kid: &'a str,
    pub n: &'a str,
    pub e: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
    use serde::{Deserialize, Serialize as SerializeDerive};

    #[derive(SerializeDerive, Deserialize)]
    struct Claims {
        sub: String,
    }

    #[test]
    fn token_signed_with_encoding_key_verifies_with_decoding_key() {
        let material = KeyMaterial::generate("test-kid");
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(material.kid().to_string());

        let token = encode(&header, &Claims { sub: "abc".into() }, material.encoding_key()).unwrap();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        let decoded = decode::<Claims>(&token, &material.decoding_key(), &validation).unwrap();
        assert_eq!(decoded.claims.sub, "abc");
    }

    #[test]
    fn jwks_json_exposes_exactly_one_rs256_signing_key() {
        let material = KeyMaterial::generate("kid-1");
        let jwks = material.jwks_json();
        assert_eq!(jwks.keys.len(), 1);
        assert_eq!(jwks.keys[0].alg, "RS256");
        assert_eq!(jwks.keys[0].kid, "kid-1");
    }
}
