//! The traits an action implements.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::controller::{ActionEndpoint, ActionMethod};
use crate::{Body, Context, Middleware, Server};

/// A single business operation.
///
/// `handle` is plain Rust: it can be called directly, from another action,
/// or from a controller through [`AsController`].
///
/// ```
/// use envoy_actions::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct Double;
///
/// #[async_trait]
/// impl Action for Double {
///     type Input = i64;
///     type Output = i64;
///
///     async fn handle(&self, input: i64) -> envoy_actions::Result<i64> {
///         Ok(input * 2)
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync + 'static {
    /// The parameters `handle` receives.
    type Input: DeserializeOwned + Send + 'static;
    /// What `handle` produces.
    type Output: Serialize + Send + 'static;

    /// Run the operation.
    async fn handle(&self, input: Self::Input) -> crate::Result<Self::Output>;
}

/// Adapts an [`Action`] to an HTTP controller.
///
/// Every method has a default; an empty `impl AsController for MyAction {}`
/// serves `handle` with its input bound from the request and its output
/// rendered as JSON.
///
/// A request to an [`ActionEndpoint`] goes through, in order:
/// [`controller_middleware`](AsController::controller_middleware),
/// [`authorize`](AsController::authorize),
/// [`as_controller`](AsController::as_controller) to bind the input,
/// [`validate`](AsController::validate), [`Action::handle`] and finally
/// [`json_response`](AsController::json_response) or
/// [`html_response`](AsController::html_response) depending on what the
/// client expects.
#[async_trait]
pub trait AsController: Action {
    /// An endpoint serving this action through the controller pipeline.
    fn controller() -> ActionEndpoint<Self>
    where
        Self: Default + Sized,
    {
        ActionEndpoint::new(Self::default())
    }

    /// An endpoint calling `method` directly, without authorization,
    /// input binding or validation.
    fn controller_method<F>(method: F) -> ActionMethod<Self, F>
    where
        Self: Default + Sized,
    {
        ActionMethod::new(Self::default(), method)
    }

    /// Middleware wrapped around this action's endpoint, outermost first.
    fn controller_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        Vec::new()
    }

    /// Whether the request may run this action. `false` fails with `403`.
    async fn authorize(&self, _ctx: &mut Context) -> crate::Result<bool> {
        Ok(true)
    }

    /// Adapt the request to the action: produce the input `handle` runs
    /// with.
    ///
    /// Defaults to [`Context::input`], which binds route parameters, the
    /// query string and the body. Override it to bind differently, e.g. to
    /// load a model named by a route parameter.
    async fn as_controller(&self, ctx: &mut Context) -> crate::Result<Self::Input> {
        ctx.input().await
    }

    /// Check the bound input. Errors are answered with `422` and a JSON body
    /// listing them.
    fn validate(&self, _input: &Self::Input) -> Result<(), ValidationErrors> {
        Ok(())
    }

    /// Render the output for clients expecting JSON.
    fn json_response(&self, output: Self::Output, ctx: &mut Context) -> crate::Result {
        ctx.res.set_body(Body::from_json(&output)?);
        Ok(())
    }

    /// Render the output for everyone else. Falls back to JSON.
    fn html_response(&self, output: Self::Output, ctx: &mut Context) -> crate::Result {
        self.json_response(output, ctx)
    }
}

/// The route hook: lets a type register its own routes.
///
/// The hook runs once per registrar run with the server being booted. It may
/// register any number of routes; returning an error aborts the run.
///
/// Register the type with [`register_action!`](crate::register_action) or
/// [`ActionRegistry::register`](crate::ActionRegistry::register) so the
/// registrar can find it.
pub trait RouteProvider: 'static {
    /// Register this type's routes on `server`.
    fn routes(server: &mut Server) -> crate::Result;
}

/// Validation failures, keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("The given data was invalid.")]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// No errors yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self
    }

    /// Messages recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when empty, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}
