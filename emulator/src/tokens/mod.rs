//! # Tokens
//!
//! §4.5: RSA key material and the `TokenGenerator` collaborator that signs
//! the `{AccessToken, IdToken, RefreshToken}` triple every successful auth
//! flow issues.

pub mod key_material;
pub mod token_generator;

pub use key_material::KeyMaterial;
pub use token_generator::{AccessClaims, TokenGenerator, TokenTriple};
