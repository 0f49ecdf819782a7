//! Per-request collaborator. Carries a request id and its tracing span;
//! never shared across requests (§5 CONCURRENCY & RESOURCE MODEL).

use std::time::Duration;
use uuid::Uuid;

/// The deadline a [`Context`] carries for external calls (Lambda
/// invocations). Matches §5's documented 15 second default.
pub const DEFAULT_LAMBDA_TIMEOUT: Duration = Duration::from_secs(15);

/// Threaded explicitly through every collaborator call rather than
/// recovered from a thread-local, per Design Note §9 "avoid any
/// process-wide mutable singletons."
#[derive(Debug, Clone)]
pub struct Context {
    pub request_id: Uuid,
    pub lambda_timeout: Duration,
}

impl Context {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            lambda_timeout: DEFAULT_LAMBDA_TIMEOUT,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_context_has_unique_request_id() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn default_lambda_timeout_is_fifteen_seconds() {
        assert_eq!(Context::new().lambda_timeout, Duration::from_secs(15));
    }
}
