//! # API layer
//!
//! §6 EXTERNAL INTERFACES: a single `POST /` endpoint dispatching by the
//! `X-Amz-Target` header (the wire protocol being emulated), plus the JWKS
//! well-known endpoint token verification relies on.
//!
//! | Module     | Responsibility                                          |
//! |------------|----------------------------------------------------------|
//! | `routes`   | Route table, actix-web's `configure()`                   |
//! | `handlers` | Target-header dispatch → [`crate::targets::Router`]       |

pub mod handlers;
pub mod routes;
