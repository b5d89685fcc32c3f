//! Bearer-token gate.
//! Rejects the request before business logic runs when the token is wrong.

use axum::http::{header, StatusCode};
use futures_util::future::BoxFuture;

use crate::http::context::Context;
use crate::http::middleware::{Middleware, Next};

/// Interceptor comparing `Authorization: Bearer <token>` against a fixed key.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    expected: String,
}

/// Stop the chain with `401 Unauthorized` unless the request carries `token`.
pub fn bearer_auth(token: impl Into<String>) -> BearerAuth {
    BearerAuth {
        expected: format!("Bearer {}", token.into()),
    }
}

impl Middleware for BearerAuth {
    fn call<'a>(&'a self, cx: &'a mut Context, next: Next<'a>) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            let authorized = cx
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .is_some_and(|value| value == self.expected);

            if !authorized {
                tracing::warn!(path = %cx.path(), "Rejected request without valid bearer token");
                cx.respond((StatusCode::UNAUTHORIZED, "unauthorized"));
                return false;
            }

            next.run(cx).await
        })
    }
}
