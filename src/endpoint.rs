use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Future;

use crate::middleware::Next;
use crate::Middleware;

/// An HTTP request handler.
///
/// This trait is automatically implemented for `async fn(&mut Context) -> Result`
/// functions. Actions are turned into endpoints through
/// [`ActionEndpoint`](crate::ActionEndpoint) and
/// [`ActionMethod`](crate::ActionMethod).
///
/// An endpoint writes its response into `ctx.res`:
///
/// ```no_run
/// async fn hello(ctx: &mut envoy_actions::Context) -> envoy_actions::Result {
///     Ok(ctx.set_body("hello"))
/// }
///
/// let mut app = envoy_actions::Server::new();
/// app.at("/hello").get(hello);
/// ```
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Invoke the endpoint within the given context
    async fn call(&self, ctx: &mut crate::Context) -> crate::Result;

    /// The name recorded in the route table. By default it uses the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

pub(crate) type DynEndpoint = dyn Endpoint;

impl Debug for DynEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dyn Endpoint<{:?}>", self.name())
    }
}

#[async_trait]
impl<F> Endpoint for F
where
    F: for<'a1> Fn1<&'a1 mut crate::Context> + Sync + Send,
    for<'a1> <F as Fn1<&'a1 mut crate::Context>>::Output: Future<Output = crate::Result> + Send,
{
    async fn call(&self, ctx: &mut crate::Context) -> crate::Result {
        self(ctx).await
    }
}

trait Fn1<Arg1>: Fn(Arg1) -> <Self as Fn1<Arg1>>::Output {
    type Output;
}
impl<F: Fn(Arg1) -> O, Arg1, O> Fn1<Arg1> for F {
    type Output = O;
}

pub(crate) struct MiddlewareEndpoint {
    endpoint: Arc<DynEndpoint>,
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
}

impl std::fmt::Debug for MiddlewareEndpoint {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            fmt,
            "MiddlewareEndpoint ({}, length: {})",
            self.endpoint.name(),
            self.middleware.len(),
        )
    }
}

impl MiddlewareEndpoint {
    /// Wrap `ep` in `middleware`, innermost last. The wrapper reports the
    /// name of the endpoint it wraps.
    pub(crate) fn wrap_with_middleware(
        ep: impl Endpoint + 'static,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Arc<DynEndpoint> {
        if middleware.is_empty() {
            Arc::new(ep)
        } else {
            Arc::new(Self {
                endpoint: Arc::new(ep),
                middleware: Arc::new(middleware),
            })
        }
    }
}

#[async_trait]
impl Endpoint for MiddlewareEndpoint {
    async fn call(&self, ctx: &mut crate::Context) -> crate::Result {
        let next = Next::new(self.endpoint.clone(), self.middleware.clone());
        next.run(ctx).await
    }

    fn name(&self) -> &str {
        self.endpoint.name()
    }
}

#[async_trait]
impl Endpoint for Box<dyn Endpoint> {
    async fn call(&self, ctx: &mut crate::Context) -> crate::Result {
        self.as_ref().call(ctx).await
    }

    fn name(&self) -> &str {
        self.as_ref().name()
    }
}
