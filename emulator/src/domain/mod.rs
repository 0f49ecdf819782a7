//! # Domain layer
//!
//! The entities of §3 DATA MODEL: `UserPool`, `AppClient`, `Group`, `User`
//! and their constituent value types. Framework-agnostic — no persistence,
//! HTTP, or trigger concerns live here.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `user` | `User`, its attribute list, and the status/MFA value types |
//! | `user_pool` | `UserPool`, `AppClient`, `Group`, and pool configuration types |

pub mod user;
pub mod user_pool;

pub use user::{Attribute, MfaOption, User, UserStatus};
pub use user_pool::{AliasAttribute, AppClient, Group, MfaConfiguration, SchemaAttribute, UserPool};
