//! Per-method segment trie.
//!
//! # Responsibilities
//! - Split paths into segments
//! - Store at most one route per (method, path)
//! - Resolve a request path, honouring single-segment `*` wildcards

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::route::Route;
use crate::routing::RouteError;

/// Segment that matches exactly one arbitrary path segment.
pub const WILDCARD: &str = "*";

/// Segment key standing for the root path (`""` or `"/"`).
pub const ROOT_SEGMENT: &str = "/";

/// Split a path on `/`, dropping empty segments.
///
/// Repeated separators collapse and leading/trailing separators vanish, so
/// `//a///b/` and `/a/b` share segments. Case is preserved.
pub fn segment(path: &str) -> Vec<&str> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        vec![ROOT_SEGMENT]
    } else {
        segments
    }
}

#[derive(Debug, Default)]
struct RouteNode {
    route: Option<Route>,
    children: HashMap<String, RouteNode>,
}

impl RouteNode {
    fn collect<'a>(&'a self, out: &mut Vec<&'a Route>) {
        if let Some(route) = &self.route {
            out.push(route);
        }
        for child in self.children.values() {
            child.collect(out);
        }
    }
}

/// One independent segment tree per HTTP method.
#[derive(Debug, Default)]
pub struct RouteTrie {
    tree: HashMap<Method, RouteNode>,
}

impl RouteTrie {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `route`, failing if its method and path are already taken.
    /// The existing route is left untouched on conflict.
    pub fn add(&mut self, route: Route) -> Result<(), RouteError> {
        let mut node = self.tree.entry(route.method().clone()).or_default();
        for segment in segment(route.path()) {
            node = node.children.entry(segment.to_string()).or_default();
        }

        if node.route.is_some() {
            return Err(RouteError::Conflict {
                method: route.method().to_string(),
                path: route.path().to_string(),
            });
        }
        node.route = Some(route);
        Ok(())
    }

    /// Whether a route is registered at exactly `path` under `method`.
    ///
    /// Segments compare literally, so `*` only matches a registered `*`.
    pub fn contains(&self, method: &Method, path: &str) -> bool {
        let Some(mut node) = self.tree.get(method) else {
            return false;
        };
        for segment in segment(path) {
            match node.children.get(segment) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.route.is_some()
    }

    /// Resolve `path` under `method`.
    ///
    /// Expands the tree one level per segment. Every live node contributes
    /// its literal child first and its `*` child second, so among several
    /// full-depth matches the one preferring literals earliest wins.
    pub fn find(&self, method: &Method, path: &str) -> Option<&Route> {
        let root = self.tree.get(method)?;
        let mut frontier = vec![root];

        for segment in segment(path) {
            let mut next = Vec::with_capacity(frontier.len() * 2);
            for node in &frontier {
                if let Some(child) = node.children.get(segment) {
                    next.push(child);
                }
                // `*` never stands in for the root path.
                if segment != WILDCARD && segment != ROOT_SEGMENT {
                    if let Some(child) = node.children.get(WILDCARD) {
                        next.push(child);
                    }
                }
            }
            if next.is_empty() {
                return None;
            }
            frontier = next;
        }

        frontier.into_iter().find_map(|node| node.route.as_ref())
    }

    /// Number of registered routes across all methods.
    pub fn len(&self) -> usize {
        self.routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered route, ordered by method then path.
    pub fn routes(&self) -> Vec<&Route> {
        let mut out = Vec::new();
        for root in self.tree.values() {
            root.collect(&mut out);
        }
        out.sort_by(|a, b| {
            a.method()
                .as_str()
                .cmp(b.method().as_str())
                .then_with(|| a.path().cmp(b.path()))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::handler::NotFound;
    use crate::http::middleware::{Endpoint, MiddlewareChain};
    use std::sync::Arc;

    fn route(method: Method, path: &str) -> Route {
        Route::new(
            method,
            path,
            Endpoint::new(MiddlewareChain::new(), Arc::new(NotFound)),
        )
    }

    fn table(routes: &[(Method, &str)]) -> RouteTrie {
        let mut trie = RouteTrie::new();
        for (method, path) in routes {
            trie.add(route(method.clone(), path)).unwrap();
        }
        trie
    }

    fn found(trie: &RouteTrie, method: Method, path: &str) -> Option<String> {
        trie.find(&method, path).map(|r| r.path().to_string())
    }

    #[test]
    fn segments_collapse_and_trim() {
        assert_eq!(segment("/a/b"), vec!["a", "b"]);
        assert_eq!(segment("//a///b/"), vec!["a", "b"]);
        assert_eq!(segment(""), vec!["/"]);
        assert_eq!(segment("/"), vec!["/"]);
        assert_eq!(segment("///"), vec!["/"]);
        assert_eq!(segment("/Users/Bob"), vec!["Users", "Bob"]);
    }

    #[test]
    fn registered_routes_resolve_exactly() {
        let routes = [
            (Method::POST, "/"),
            (Method::POST, "/a/b/c/d"),
            (Method::POST, "/a/b"),
            (Method::GET, "/"),
            (Method::GET, "/users/list"),
        ];
        let trie = table(&routes);

        for (method, path) in &routes {
            let hit = trie.find(method, path).expect("registered route must resolve");
            assert_eq!(hit.method(), method);
            assert_eq!(hit.path(), *path);
        }

        assert_eq!(found(&trie, Method::GET, "/a/b"), None);
        assert_eq!(found(&trie, Method::POST, "/a"), None);
        assert_eq!(found(&trie, Method::POST, "/a/b/c"), None);
        assert_eq!(found(&trie, Method::DELETE, "/"), None);
        assert_eq!(trie.len(), routes.len());
    }

    #[test]
    fn contains_checks_exact_registration() {
        let trie = table(&[(Method::GET, "/files/*"), (Method::GET, "/a/b")]);

        assert!(trie.contains(&Method::GET, "/files/*"));
        assert!(trie.contains(&Method::GET, "//a/b/"));
        assert!(!trie.contains(&Method::GET, "/files/readme"));
        assert!(!trie.contains(&Method::GET, "/a"));
        assert!(!trie.contains(&Method::POST, "/a/b"));
    }

    #[test]
    fn duplicate_registration_conflicts_and_keeps_first() {
        let mut trie = RouteTrie::new();
        trie.add(route(Method::POST, "/a/b")).unwrap();

        let err = trie.add(route(Method::POST, "//a/b/")).unwrap_err();
        assert_eq!(
            err,
            RouteError::Conflict {
                method: "POST".into(),
                path: "//a/b/".into()
            }
        );
        assert_eq!(found(&trie, Method::POST, "/a/b").as_deref(), Some("/a/b"));

        // Same path under another method is unrelated.
        trie.add(route(Method::GET, "/a/b")).unwrap();
    }

    #[test]
    fn wildcard_matches_exactly_one_segment() {
        let trie = table(&[(Method::POST, "/a/b/*/d")]);

        assert!(trie.find(&Method::POST, "/a/b/X/d").is_some());
        assert!(trie.find(&Method::POST, "/a/b/anything-else/d").is_some());
        assert!(trie.find(&Method::POST, "/a/b/X/Y/d").is_none());
        assert!(trie.find(&Method::POST, "/a/b/d").is_none());
    }

    #[test]
    fn wildcard_does_not_match_root() {
        let trie = table(&[(Method::GET, "/*")]);
        assert!(trie.find(&Method::GET, "/x").is_some());
        assert!(trie.find(&Method::GET, "/").is_none());
    }

    #[test]
    fn literal_wins_over_wildcard() {
        let trie = table(&[(Method::GET, "/a/*/c"), (Method::GET, "/a/b/c")]);
        assert_eq!(found(&trie, Method::GET, "/a/b/c").as_deref(), Some("/a/b/c"));
        assert_eq!(found(&trie, Method::GET, "/a/z/c").as_deref(), Some("/a/*/c"));

        // Precedence is decided at the first differing segment.
        let trie = table(&[(Method::GET, "/x/*/lit"), (Method::GET, "/x/lit/*")]);
        assert_eq!(
            found(&trie, Method::GET, "/x/lit/lit").as_deref(),
            Some("/x/lit/*")
        );
    }

    #[test]
    fn literal_dead_end_falls_back_to_wildcard() {
        let trie = table(&[(Method::GET, "/a/b"), (Method::GET, "/a/*/c")]);
        assert_eq!(found(&trie, Method::GET, "/a/b/c").as_deref(), Some("/a/*/c"));
    }

    #[test]
    fn matching_is_case_sensitive_and_slash_tolerant() {
        let trie = table(&[(Method::GET, "/Users/profile")]);

        assert!(trie.find(&Method::GET, "/Users/profile").is_some());
        assert!(trie.find(&Method::GET, "//Users///profile/").is_some());
        assert!(trie.find(&Method::GET, "/users/profile").is_none());
        assert!(trie.find(&Method::GET, "/USERS/PROFILE").is_none());
    }

    #[test]
    fn empty_and_slash_paths_are_the_same_root() {
        let trie = table(&[(Method::GET, "")]);
        assert!(trie.find(&Method::GET, "/").is_some());
        assert!(trie.find(&Method::GET, "").is_some());
    }
}
