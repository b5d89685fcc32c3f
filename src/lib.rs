//! Embeddable HTTP router with a master/worker hot-restart supervisor.

pub mod app;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;
pub mod routing;

pub use app::Seed;
pub use config::schema::SeedConfig;
pub use http::{Context, Handler, Middleware, MiddlewareRef, Next};
pub use lifecycle::{Mode, SupervisorError};
pub use routing::{RouteError, Router, RouterGroup, Routes};
