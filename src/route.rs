use std::sync::Arc;

use crate::endpoint::MiddlewareEndpoint;
use crate::http::Method;
use crate::{router::Router, Endpoint, Middleware};

/// A handle to a route.
///
/// All HTTP requests are made against resources. After using [`Server::at`] (or
/// [`Route::at`]) to establish a route, the `Route` type can be used to
/// establish endpoints for various HTTP methods at that path.
///
/// Inside a [`RouteProvider::routes`](crate::RouteProvider::routes) hook,
/// an action registers itself through a `Route`:
///
/// ```no_run
/// # use envoy_actions::{ActionMethod, Server};
/// # fn routes(server: &mut Server) {
/// # async fn export(_: std::sync::Arc<()>, _: &mut envoy_actions::Context) -> envoy_actions::Result { Ok(()) }
/// server.at("/reports/export").get(ActionMethod::new((), export));
/// # }
/// ```
///
/// [`Server::at`]: ./struct.Server.html#method.at
#[allow(missing_debug_implementations)]
pub struct Route<'a> {
    router: &'a mut Router,
    path: String,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl<'a> Route<'a> {
    pub(crate) fn new(router: &'a mut Router, path: String) -> Route<'a> {
        Route {
            router,
            path,
            middleware: Vec::new(),
        }
    }

    /// Extend the route with the given `path`.
    pub fn at<'b>(&'b mut self, path: &str) -> Route<'b> {
        let mut p = self.path.clone();

        if !p.ends_with('/') && !path.starts_with('/') {
            p.push('/');
        }

        if path != "/" {
            p.push_str(path);
        }

        Route {
            router: self.router,
            path: p,
            middleware: self.middleware.clone(),
        }
    }

    /// Get the current path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Apply the given middleware to the current route.
    pub fn with(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        tracing::trace!(
            "Adding middleware {} to route {:?}",
            middleware.name(),
            self.path
        );
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Reset the middleware chain for the current route, if any.
    pub fn reset_middleware(&mut self) -> &mut Self {
        self.middleware.clear();
        self
    }

    /// Add an endpoint for the given HTTP method
    ///
    /// # Panics
    ///
    /// Panics if the path is not a valid route pattern.
    pub fn method(&mut self, method: Method, ep: impl Endpoint + 'static) -> &mut Self {
        let ep = MiddlewareEndpoint::wrap_with_middleware(ep, self.middleware.clone());
        if let Err(err) = self.router.add(&self.path, method, ep) {
            panic!("Invalid route pattern {:?}: {}", self.path, err);
        }
        self
    }

    /// Add an endpoint for all HTTP methods, as a fallback.
    ///
    /// Routes with specific HTTP methods will be tried first.
    ///
    /// # Panics
    ///
    /// Panics if the path is not a valid route pattern.
    pub fn all(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        let ep = MiddlewareEndpoint::wrap_with_middleware(ep, self.middleware.clone());
        if let Err(err) = self.router.add_all(&self.path, ep) {
            panic!("Invalid route pattern {:?}: {}", self.path, err);
        }
        self
    }

    /// Add an endpoint for `GET` requests
    pub fn get(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Get, ep)
    }

    /// Add an endpoint for `HEAD` requests
    pub fn head(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Head, ep)
    }

    /// Add an endpoint for `PUT` requests
    pub fn put(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Put, ep)
    }

    /// Add an endpoint for `POST` requests
    pub fn post(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Post, ep)
    }

    /// Add an endpoint for `DELETE` requests
    pub fn delete(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Delete, ep)
    }

    /// Add an endpoint for `OPTIONS` requests
    pub fn options(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Options, ep)
    }

    /// Add an endpoint for `CONNECT` requests
    pub fn connect(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Connect, ep)
    }

    /// Add an endpoint for `PATCH` requests
    pub fn patch(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Patch, ep)
    }

    /// Add an endpoint for `TRACE` requests
    pub fn trace(&mut self, ep: impl Endpoint + 'static) -> &mut Self {
        self.method(Method::Trace, ep)
    }
}
