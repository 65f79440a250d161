//! Endpoints that serve actions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::endpoint::DynEndpoint;
use crate::middleware::{Fn2, Next};
use crate::{Action, AsController, Body, Context, Endpoint, Error, Middleware, StatusCode};

/// Serves an [`AsController`] action.
///
/// The action's [`controller_middleware`](AsController::controller_middleware)
/// is collected once, when the endpoint is created, and wraps every request.
/// Route and server middleware run outside of it.
pub struct ActionEndpoint<A> {
    action: Arc<A>,
    middleware: Arc<Vec<Arc<dyn Middleware>>>,
    pipeline: Arc<DynEndpoint>,
}

impl<A: AsController> ActionEndpoint<A> {
    /// Serve `action`.
    pub fn new(action: A) -> Self {
        Self::shared(Arc::new(action))
    }

    /// Serve an action that is shared with other endpoints.
    pub fn shared(action: Arc<A>) -> Self {
        let middleware = action.controller_middleware();
        for m in &middleware {
            tracing::trace!(
                "Adding middleware {} to action {}",
                m.name(),
                std::any::type_name::<A>()
            );
        }
        Self {
            pipeline: Arc::new(ControllerPipeline {
                action: action.clone(),
            }),
            action,
            middleware: Arc::new(middleware),
        }
    }

    /// The served action.
    #[must_use]
    pub fn action(&self) -> &A {
        &self.action
    }
}

impl<A> fmt::Debug for ActionEndpoint<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionEndpoint")
            .field("action", &std::any::type_name::<A>())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

#[async_trait]
impl<A: AsController> Endpoint for ActionEndpoint<A> {
    async fn call(&self, ctx: &mut Context) -> crate::Result {
        let next = Next::new(self.pipeline.clone(), self.middleware.clone());
        next.run(ctx).await
    }

    fn name(&self) -> &str {
        std::any::type_name::<A>()
    }
}

struct ControllerPipeline<A> {
    action: Arc<A>,
}

#[async_trait]
impl<A: AsController> Endpoint for ControllerPipeline<A> {
    async fn call(&self, ctx: &mut Context) -> crate::Result {
        let action = self.action.as_ref();

        if !action.authorize(ctx).await? {
            return Err(Error::from_str(
                StatusCode::Forbidden,
                "This action is unauthorized.",
            ));
        }

        let input = action.as_controller(ctx).await?;

        if let Err(errors) = action.validate(&input) {
            tracing::debug!(
                "Validation failed for action {}: {:?}",
                std::any::type_name::<A>(),
                errors
            );
            ctx.res.set_status(StatusCode::UnprocessableEntity);
            ctx.res.set_body(Body::from_json(&json!({
                "message": errors.to_string(),
                "errors": errors,
            }))?);
            return Ok(());
        }

        let output = action.handle(input).await?;

        if ctx.expects_json() {
            action.json_response(output, ctx)
        } else {
            action.html_response(output, ctx)
        }
    }

    fn name(&self) -> &str {
        std::any::type_name::<A>()
    }
}

/// Serves an explicit method of an action.
///
/// The method is called with the shared action and the request context:
///
/// ```no_run
/// use std::sync::Arc;
/// use envoy_actions::{ActionMethod, Context, Server};
///
/// #[derive(Debug, Default)]
/// struct ExportReport;
///
/// impl ExportReport {
///     async fn csv(self: Arc<Self>, ctx: &mut Context) -> envoy_actions::Result {
///         ctx.set_body("id,total\n");
///         Ok(())
///     }
/// }
///
/// let mut app = Server::new();
/// app.at("/reports.csv").get(ActionMethod::new(ExportReport, ExportReport::csv));
/// ```
///
/// # Authorization and validation
///
/// An `ActionMethod` bypasses the controller pipeline: `authorize`,
/// `as_controller`, `validate` and the response negotiation of [`AsController`] do not run,
/// and neither does the action's controller middleware. The method is
/// responsible for any checks it needs. Route and server middleware still
/// apply.
pub struct ActionMethod<A, F> {
    action: Arc<A>,
    method: F,
}

impl<A, F> ActionMethod<A, F> {
    /// Serve `method` of `action`.
    pub fn new(action: A, method: F) -> Self {
        Self::shared(Arc::new(action), method)
    }

    /// Serve `method` of an action that is shared with other endpoints.
    pub fn shared(action: Arc<A>, method: F) -> Self {
        Self { action, method }
    }
}

impl<A, F> fmt::Debug for ActionMethod<A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionMethod")
            .field("action", &std::any::type_name::<A>())
            .field("method", &std::any::type_name::<F>())
            .finish()
    }
}

#[async_trait]
impl<A, F> Endpoint for ActionMethod<A, F>
where
    A: Send + Sync + 'static,
    F: for<'a> Fn2<Arc<A>, &'a mut Context> + Send + Sync,
    for<'a> <F as Fn2<Arc<A>, &'a mut Context>>::Output: Future<Output = crate::Result> + Send,
{
    async fn call(&self, ctx: &mut Context) -> crate::Result {
        (self.method)(self.action.clone(), ctx).await
    }

    fn name(&self) -> &str {
        std::any::type_name::<F>()
    }
}
