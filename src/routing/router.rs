//! Route registration surface and request dispatch.
//!
//! # Responsibilities
//! - Register routes under one or many verbs (`"GET,POST"`, `"ANY"`)
//! - Compose group middleware, route middleware and handler per route
//! - Nest prefixed groups that inherit and extend middleware
//! - Dispatch requests to the matched route or the not-found handler

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::task::Poll;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;

use crate::http::context::Context;
use crate::http::handler::{handler_fn, Handler, NotFound};
use crate::http::middleware::{Endpoint, MiddlewareChain, MiddlewareRef};
use crate::routing::method::parse_methods;
use crate::routing::route::Route;
use crate::routing::trie::RouteTrie;
use crate::routing::RouteError;

/// Path prefix and middleware inherited by everything registered in a scope.
#[derive(Debug, Clone, Default)]
struct Scope {
    prefix: String,
    chain: MiddlewareChain,
}

impl Scope {
    fn nested(&self, prefix: &str, middleware: &[MiddlewareRef]) -> Self {
        Self {
            prefix: format!("{}{}", self.prefix, prefix),
            chain: self.chain.extended(middleware),
        }
    }

    fn register(
        &self,
        table: &mut RouteTrie,
        methods: &str,
        path: &str,
        handler: Arc<dyn Handler>,
        middleware: &[MiddlewareRef],
    ) -> Result<(), RouteError> {
        let full_path = format!("{}{}", self.prefix, path);
        let methods = parse_methods(methods, &full_path)?;
        // Check the whole expansion first so a conflict leaves the table as
        // it was.
        for (i, method) in methods.iter().enumerate() {
            if methods[..i].contains(method) || table.contains(method, &full_path) {
                return Err(RouteError::Conflict {
                    method: method.to_string(),
                    path: full_path,
                });
            }
        }

        let endpoint = Endpoint::new(self.chain.extended(middleware), handler);
        for method in methods {
            table.add(Route::new(method.clone(), full_path.clone(), endpoint.clone()))?;
            tracing::debug!(
                method = %method,
                path = %full_path,
                middleware = endpoint.chain().len(),
                "Route registered"
            );
        }
        Ok(())
    }
}

/// Mutable view handed out by [`Routes`] implementors.
pub struct Registrar<'r> {
    table: &'r mut RouteTrie,
    scope: &'r mut Scope,
}

/// Registration operations shared by the root [`Router`] and its groups.
pub trait Routes {
    #[doc(hidden)]
    fn registrar(&mut self) -> Registrar<'_>;

    /// Append interceptors to this scope's chain.
    ///
    /// Only routes registered after the call are affected.
    fn use_middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = MiddlewareRef>,
        Self: Sized,
    {
        self.registrar().scope.chain.push(middleware);
        self
    }

    /// Register `handler` for every verb in `methods` at `path`.
    ///
    /// `methods` is a comma-separated verb list or `ANY`. The handler runs
    /// behind this scope's chain followed by `middleware`.
    fn handle_std<H: Handler>(
        &mut self,
        methods: &str,
        path: &str,
        handler: H,
        middleware: &[MiddlewareRef],
    ) -> Result<(), RouteError>
    where
        Self: Sized,
    {
        let registrar = self.registrar();
        registrar
            .scope
            .register(registrar.table, methods, path, Arc::new(handler), middleware)
    }

    /// Like [`Routes::handle_std`] for an `async fn(Request<Body>)`.
    fn handle_fn<F, Fut>(
        &mut self,
        methods: &str,
        path: &str,
        f: F,
        middleware: &[MiddlewareRef],
    ) -> Result<(), RouteError>
    where
        Self: Sized,
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: IntoResponse,
    {
        self.handle_std(methods, path, handler_fn(f), middleware)
    }

    /// Register routes under `prefix` with extra `middleware`.
    ///
    /// `configure` receives a child scope sharing this router's route table.
    /// The child's chain is a copy, so later `use_middleware` calls on the
    /// parent do not reach it.
    fn group<F>(
        &mut self,
        prefix: &str,
        configure: F,
        middleware: &[MiddlewareRef],
    ) -> Result<(), RouteError>
    where
        Self: Sized,
        F: FnOnce(&mut RouterGroup<'_>) -> Result<(), RouteError>,
    {
        let registrar = self.registrar();
        let mut child = RouterGroup {
            table: registrar.table,
            scope: registrar.scope.nested(prefix, middleware),
        };
        configure(&mut child)
    }
}

/// A prefixed scope created by [`Routes::group`].
pub struct RouterGroup<'r> {
    table: &'r mut RouteTrie,
    scope: Scope,
}

impl RouterGroup<'_> {
    pub fn prefix(&self) -> &str {
        &self.scope.prefix
    }
}

impl Routes for RouterGroup<'_> {
    fn registrar(&mut self) -> Registrar<'_> {
        Registrar {
            table: &mut *self.table,
            scope: &mut self.scope,
        }
    }
}

/// The root of the route table and the request dispatcher.
pub struct Router {
    table: RouteTrie,
    scope: Scope,
    not_found: Arc<dyn Handler>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            table: RouteTrie::new(),
            scope: Scope::default(),
            not_found: Arc::new(NotFound),
        }
    }

    /// Replace the built-in 404 responder.
    pub fn set_not_found(&mut self, handler: impl Handler) -> &mut Self {
        self.not_found = Arc::new(handler);
        self
    }

    pub fn find(&self, method: &Method, path: &str) -> Option<&Route> {
        self.table.find(method, path)
    }

    pub fn route_count(&self) -> usize {
        self.table.len()
    }

    /// (method, path) of every registered route, sorted.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.table
            .routes()
            .into_iter()
            .map(|r| (r.method().clone(), r.path().to_string()))
            .collect()
    }

    /// Serve one request.
    ///
    /// A matched route runs its precomposed chain. Otherwise the not-found
    /// handler runs behind this router's full chain, so global filters also
    /// see 404s.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        let mut cx = Context::new(request);

        match self.table.find(cx.method(), cx.path()) {
            Some(route) => {
                route.dispatch(&mut cx).await;
            }
            None => {
                tracing::debug!(method = %cx.method(), path = %cx.path(), "No route matched");
                self.scope.chain.run(&mut cx, self.not_found.as_ref()).await;
            }
        }

        cx.into_response()
    }

    /// Freeze the router into a cloneable `tower::Service`.
    pub fn into_service(self) -> RouterService {
        RouterService::new(Arc::new(self))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Routes for Router {
    fn registrar(&mut self) -> Registrar<'_> {
        Registrar {
            table: &mut self.table,
            scope: &mut self.scope,
        }
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.len())
            .field("middleware", &self.scope.chain.len())
            .finish()
    }
}

/// Read-only, shareable router usable as the HTTP engine's service.
#[derive(Debug, Clone)]
pub struct RouterService {
    router: Arc<Router>,
}

impl RouterService {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }
}

impl tower::Service<Request<Body>> for RouterService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let router = Arc::clone(&self.router);
        Box::pin(async move { Ok(router.dispatch(request).await) })
    }
}
