//! Per-request context threaded through the middleware chain.

use axum::body::Body;
use axum::http::{header, Extensions, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// The request being dispatched together with the response sink.
///
/// Interceptors and handlers write their output into the sink; whatever the
/// sink holds when the chain unwinds is sent to the client. Request
/// extensions double as the request-scoped value store.
#[derive(Debug)]
pub struct Context {
    request: Request<Body>,
    response: Response,
}

impl Context {
    /// Wrap an incoming request with an empty `200 OK` response.
    pub fn new(request: Request<Body>) -> Self {
        Self {
            request,
            response: Response::new(Body::empty()),
        }
    }

    pub fn request(&self) -> &Request<Body> {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request<Body> {
        &mut self.request
    }

    /// Move the request (with its body) out of the context.
    ///
    /// A body-less copy of the method, URI, headers and extensions stays
    /// behind so that interceptors running after the handler can still
    /// inspect them.
    pub fn take_request(&mut self) -> Request<Body> {
        let (parts, body) = std::mem::take(&mut self.request).into_parts();
        self.request = Request::from_parts(parts.clone(), Body::empty());
        Request::from_parts(parts, body)
    }

    pub fn method(&self) -> &Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.uri().path()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    pub fn extensions(&self) -> &Extensions {
        self.request.extensions()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.request.extensions_mut()
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Replace the response sink with `response`.
    pub fn respond(&mut self, response: impl IntoResponse) {
        self.response = response.into_response();
    }

    /// Write `data` as a JSON body with `status`.
    ///
    /// On a serialization error the sink is left untouched.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        status: StatusCode,
        data: &T,
    ) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(data)?;
        let mut response = (status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        self.response = response;
        Ok(())
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}
