//! The route table actions register into, and request dispatch.

use std::sync::Arc;

use crate::middleware::{Middleware, Next};
use crate::router::{RouteEntry, Router, Selection};
use crate::Route;

/// An Envoy server.
///
/// Servers are built up as a combination of *endpoints* and *middleware*:
///
/// - Endpoints provide the actual application-level code corresponding to
/// particular URLs. The [`Server::at`] method creates a new *route* (using
/// standard router syntax), which can then be used to register endpoints
/// for particular HTTP request types. Actions do this themselves from their
/// [`RouteProvider::routes`](crate::RouteProvider::routes) hook.
///
/// - Middleware extends the base framework with additional request or
/// response processing, such as authentication or default headers. To
/// add middleware to an app, use the [`Server::with`] method.
///
/// Requests are dispatched with [`Server::respond`].
pub struct Server {
    router: Arc<Router>,
    /// Holds the middleware stack.
    ///
    /// The outer Arc allows us to clone in .respond() without cloning the array.
    /// The inner Arc-s allow MiddlewareEndpoint-s to be cloned internally.
    #[allow(clippy::rc_buffer)]
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
}

impl Server {
    /// Create a new Envoy server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: Arc::new(Router::new()),
            middleware: Arc::new(Vec::new()),
        }
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    /// Add a new route at the given `path`, relative to root.
    ///
    /// A path is comprised of zero or many segments, i.e. non-empty strings
    /// separated by '/'. There are two kinds of segments: concrete and
    /// wildcard. A concrete segment is used to exactly match the respective
    /// part of the path of the incoming request. A wildcard segment is
    /// written as `:name`, which creates an endpoint parameter called `name`.
    /// A trailing `*` matches the rest of the path.
    ///
    /// ```rust,no_run
    /// # let mut app = envoy_actions::Server::new();
    /// app.at("/");
    /// app.at("/articles/:article");
    /// app.at("files/:user/*");
    /// ```
    ///
    /// Registering the same method and pattern twice keeps both entries in
    /// [`Server::routes`]; requests go to the one registered last.
    ///
    /// # Panics
    ///
    /// Panics once the server has been cloned.
    pub fn at<'a>(&'a mut self, path: &str) -> Route<'a> {
        let router = Arc::get_mut(&mut self.router)
            .expect("Registering routes is not possible after the Server has started");
        Route::new(router, path.to_owned())
    }

    /// Add middleware to an application.
    ///
    /// Middleware is invoked when processing a request, and can either
    /// continue processing (possibly modifying the response) or immediately
    /// return a response. Server middleware runs before route and action
    /// middleware, in the order in which it is applied.
    ///
    /// # Panics
    ///
    /// Panics once the server has been cloned.
    pub fn with(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        tracing::trace!("Adding middleware {}", middleware.name());
        let m = Arc::get_mut(&mut self.middleware)
            .expect("Registering middleware is not possible after the Server has started");
        m.push(Arc::new(middleware));
        self
    }

    /// Every route registered so far, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteEntry] {
        self.router.entries()
    }

    /// Respond to a `Request` with a `Response`.
    ///
    /// Errors returned by endpoints or middleware are turned into a response
    /// carrying the error's status and message.
    pub async fn respond<Req, Res>(&self, req: Req) -> http_types::Result<Res>
    where
        Req: Into<http_types::Request>,
        Res: From<http_types::Response>,
    {
        let req = req.into();
        let method = req.method();
        let Selection {
            endpoint,
            params,
            param_names,
        } = self.router.route(req.url().path(), method);
        let mut ctx = crate::Context::new(req, vec![params], param_names);

        let next = Next::new(endpoint, self.middleware.clone());

        if let Err(err) = next.run(&mut ctx).await {
            tracing::debug!(
                "{} {} failed: {} {}",
                method,
                ctx.url().path(),
                err.status(),
                err
            );
            ctx.res.set_status(err.status());
            ctx.res.set_body(err.to_string());
        }

        Ok(ctx.res.into())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("routes", &self.router.entries().len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

impl Clone for Server {
    fn clone(&self) -> Self {
        Self {
            router: self.router.clone(),
            middleware: self.middleware.clone(),
        }
    }
}
