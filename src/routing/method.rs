//! HTTP method table and method-list parsing.
//!
//! # Design Decisions
//! - Tokens are matched exactly against the uppercase verb names
//! - `ANY` expands to every standard verb, in table order
//! - Whitespace around comma-separated tokens is ignored

use axum::http::Method;

use crate::routing::RouteError;

/// Pseudo-method that registers a route under every standard verb.
pub const METHOD_ANY: &str = "ANY";

/// The fixed set of standard verbs a route can be registered under.
pub const STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::CONNECT,
    Method::OPTIONS,
    Method::TRACE,
];

/// Expand a method list such as `"GET,POST"` or `"ANY"` into verbs.
///
/// `path` is only used to make the error message point at the offending route.
pub fn parse_methods(methods: &str, path: &str) -> Result<Vec<Method>, RouteError> {
    let mut expanded = Vec::new();

    for token in methods.split(',').map(str::trim) {
        if token == METHOD_ANY {
            expanded.extend(STANDARD_METHODS.iter().cloned());
            continue;
        }

        match STANDARD_METHODS.iter().find(|m| m.as_str() == token) {
            Some(method) => expanded.push(method.clone()),
            None => {
                return Err(RouteError::InvalidMethod {
                    method: token.to_string(),
                    path: path.to_string(),
                })
            }
        }
    }

    Ok(expanded)
}
