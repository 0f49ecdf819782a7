//! §6 EXTERNAL INTERFACES: the two HTTP entry points. `dispatch` implements
//! the `X-Amz-Target: <ServiceName>.<Operation>` wire protocol over a single
//! `POST /`; `jwks` serves the signing key(s) at the well-known path.

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;

use shared::errors::{ApiResult, CognitoError};

use crate::context::Context;
use crate::targets::Router;
use crate::tokens::KeyMaterial;

const TARGET_HEADER: &str = "x-amz-target";

fn operation_name(req: &HttpRequest) -> ApiResult<String> {
    let header = req
        .headers()
        .get(TARGET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| CognitoError::InvalidParameter(format!("missing {TARGET_HEADER} header")))?;
    header
        .rsplit('.')
        .next()
        .filter(|op| !op.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CognitoError::InvalidParameter(format!("malformed {TARGET_HEADER} header")))
}

/// Reads the body as raw bytes rather than `web::Json` — the wire protocol
/// declares `Content-Type: application/x-amz-json-1.1`, which actix's JSON
/// extractor would reject by default.
pub async fn dispatch(req: HttpRequest, body: web::Bytes, router: web::Data<Router>) -> ApiResult<HttpResponse> {
    let operation = operation_name(&req)?;
    let request: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&body)?
    };
    let ctx = Context::new();
    let response = router.route(&ctx, &operation, request).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn jwks(key_material: web::Data<KeyMaterial>) -> HttpResponse {
    HttpResponse::Ok().json(key_material.jwks_json())
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}
