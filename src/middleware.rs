//! Middleware types.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::endpoint::DynEndpoint;

/// Middleware that wraps around the remaining middleware chain.
///
/// Server middleware is added with [`Server::with`](crate::Server::with),
/// route middleware with [`Route::with`](crate::Route::with), and action
/// middleware is returned from
/// [`AsController::controller_middleware`](crate::AsController::controller_middleware).
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Asynchronously handle the request, and return a response.
    async fn handle(&self, ctx: &mut crate::Context, next: Next) -> crate::Result;

    /// Set the middleware's name. By default it uses the type signature.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl Debug for dyn Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dyn Middleware<{:?}>", self.name())
    }
}

#[async_trait]
impl<F> Middleware for F
where
    F: for<'arg1> Fn2<&'arg1 mut crate::Context, Next> + Sync + Send,
    for<'arg1> <F as Fn2<&'arg1 mut crate::Context, Next>>::Output:
        Future<Output = crate::Result> + Send,
{
    async fn handle(&self, ctx: &mut crate::Context, next: Next) -> crate::Result {
        self(ctx, next).await
    }
}

pub(crate) trait Fn2<Arg1, Arg2>: Fn(Arg1, Arg2) -> <Self as Fn2<Arg1, Arg2>>::Output {
    type Output;
}
impl<F: Fn(Arg1, Arg2) -> O, Arg1, Arg2, O> Fn2<Arg1, Arg2> for F {
    type Output = O;
}

/// The remainder of a middleware chain, including the endpoint.
#[derive(Debug)]
pub struct Next {
    endpoint: Arc<DynEndpoint>,
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
    current_index: usize,
}

impl Next {
    /// Create a new Next instance.
    pub fn new(endpoint: Arc<DynEndpoint>, middleware: Arc<Vec<Arc<dyn Middleware>>>) -> Next {
        Next {
            endpoint,
            middleware,
            current_index: 0,
        }
    }

    /// Asynchronously execute the remaining middleware chain.
    pub async fn run(mut self, ctx: &mut crate::Context) -> crate::Result {
        let current_index = self.current_index;
        self.current_index += 1;

        match self.middleware.get(current_index) {
            Some(current) => {
                tracing::trace!("Running middleware {}", current.name());
                current.clone().handle(ctx, self).await
            }
            None => self.endpoint.call(ctx).await,
        }
    }
}
