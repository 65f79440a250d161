//! Envoy actions are single-purpose types that encapsulate one business
//! operation and know how to expose themselves over HTTP. An action owns its
//! logic (`handle`), optionally how it is adapted to a request
//! (`as_controller`, `authorize`, `validate`, middleware, JSON/HTML
//! responses) and, through [`RouteProvider`], the routes it is served on.
//!
//! Actions register themselves into a link-time registry with
//! [`register_action!`]. At boot, [`register_routes`] walks the registry
//! under one or more discovery roots and lets every action add its routes to
//! the [`Server`].
//!
//! # Examples
//!
//! ```no_run
//! use envoy_actions::prelude::*;
//! use envoy_actions::{register_action, Server};
//!
//! #[derive(Debug, Deserialize)]
//! struct NewArticle {
//!     title: String,
//! }
//!
//! #[derive(Debug, Default)]
//! struct PublishArticle;
//!
//! #[async_trait]
//! impl Action for PublishArticle {
//!     type Input = NewArticle;
//!     type Output = String;
//!
//!     async fn handle(&self, input: NewArticle) -> envoy_actions::Result<String> {
//!         Ok(format!("published {}", input.title))
//!     }
//! }
//!
//! impl AsController for PublishArticle {}
//!
//! impl RouteProvider for PublishArticle {
//!     fn routes(server: &mut Server) -> envoy_actions::Result {
//!         server.at("/articles").post(PublishArticle::controller());
//!         Ok(())
//!     }
//! }
//!
//! register_action!(PublishArticle);
//!
//! fn main() -> Result<(), envoy_actions::RegistrationError> {
//!     let mut app = envoy_actions::new();
//!     envoy_actions::register_routes(&mut app)?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_debug_implementations, nonstandard_style)]
#![warn(missing_docs, unreachable_pub, future_incompatible, rust_2018_idioms)]

mod action;
mod binding;
mod context;
mod controller;
mod endpoint;
mod middleware;
mod registrar;
mod registry;
mod route;
mod router;
mod server;
pub mod config;
pub mod prelude;

pub use action::{Action, AsController, RouteProvider, ValidationErrors};
pub use config::ActionsConfig;
pub use context::Context;
pub use controller::{ActionEndpoint, ActionMethod};
pub use endpoint::Endpoint;
pub use middleware::{Middleware, Next};
pub use registrar::{register_routes, register_routes_in, RegistrationError};
pub use registry::{ActionReference, ActionRegistry, DiscoveryRoot};
pub use route::Route;
pub use router::RouteEntry;
pub use server::Server;

pub use http_types::{self as http, Body, Error, Mime, Status, StatusCode};

#[doc(hidden)]
pub use inventory as __inventory;

/// Create a new Envoy server.
#[must_use]
pub fn new() -> server::Server {
    Server::new()
}

/// A specialized Result type for Envoy.
pub type Result<T = ()> = std::result::Result<T, crate::http::Error>;
