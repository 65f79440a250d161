//! Boot-time route registration for discovered actions.

use std::collections::HashSet;

use crate::registry::{ActionReference, ActionRegistry, DiscoveryRoot};
use crate::Server;

/// A route hook failed.
///
/// Carries the hook's error unchanged, and names the action it came from.
#[derive(Debug, thiserror::Error)]
#[error("failed to register routes for action `{action}`: {error}")]
pub struct RegistrationError {
    action: String,
    error: crate::Error,
}

impl RegistrationError {
    fn new(reference: &ActionReference, error: crate::Error) -> Self {
        Self {
            action: reference.qualified_name(),
            error,
        }
    }

    /// The qualified name of the action whose hook failed.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The error returned by the hook.
    #[must_use]
    pub fn error(&self) -> &crate::Error {
        &self.error
    }

    /// Unwrap the error returned by the hook.
    #[must_use]
    pub fn into_inner(self) -> crate::Error {
        self.error
    }
}

impl ActionRegistry {
    /// Register the routes of every action under the configured default
    /// roots. See [`ActionRegistry::register_routes_in`].
    pub fn register_routes(&self, server: &mut Server) -> Result<usize, RegistrationError> {
        let roots = self.config().roots().to_vec();
        self.register_routes_in(server, roots)
    }

    /// Register the routes of every action under `roots`.
    ///
    /// Roots are walked in the given order, and the actions under each root
    /// in depth-first lexical order. Every action's route hook runs at most
    /// once per call, even when roots overlap. An empty `roots` registers
    /// nothing.
    ///
    /// Calling this twice registers every route twice.
    ///
    /// Returns the number of hooks that ran.
    ///
    /// # Errors
    ///
    /// Stops at the first hook that fails and returns its error. Routes
    /// added by earlier hooks stay registered; later hooks do not run.
    pub fn register_routes_in<I, R>(
        &self,
        server: &mut Server,
        roots: I,
    ) -> Result<usize, RegistrationError>
    where
        I: IntoIterator<Item = R>,
        R: Into<DiscoveryRoot>,
    {
        let mut visited = HashSet::new();
        let mut invoked = 0;
        let before = server.routes().len();

        for root in roots {
            let root = root.into();
            tracing::debug!("Discovering actions under {:?}", root.as_str());

            for reference in self.discover(&root) {
                if !visited.insert(reference.type_id()) {
                    tracing::trace!("Skipping {}, already registered in this run", reference);
                    continue;
                }

                let count = server.routes().len();
                if let Err(error) = reference.invoke(server) {
                    tracing::error!("Route hook of {} failed: {}", reference, error);
                    return Err(RegistrationError::new(&reference, error));
                }
                tracing::debug!(
                    "Registered {} route(s) for {}",
                    server.routes().len() - count,
                    reference
                );
                invoked += 1;
            }
        }

        tracing::info!(
            "Registered {} route(s) from {} action(s)",
            server.routes().len() - before,
            invoked
        );
        Ok(invoked)
    }
}

/// Register the routes of every action recorded with
/// [`register_action!`](crate::register_action), under the default roots.
///
/// The default roots come from `ENVOY_ACTION_ROOTS`, or are
/// [`DEFAULT_ROOT`](crate::config::DEFAULT_ROOT). Call this once while
/// booting the application; calling it again registers every route again.
///
/// # Errors
///
/// Returns the first route hook failure. See
/// [`ActionRegistry::register_routes_in`].
pub fn register_routes(server: &mut Server) -> Result<usize, RegistrationError> {
    ActionRegistry::collected().register_routes(server)
}

/// Register the routes of every action recorded with
/// [`register_action!`](crate::register_action), under `roots`.
///
/// # Errors
///
/// Returns the first route hook failure. See
/// [`ActionRegistry::register_routes_in`].
pub fn register_routes_in<I, R>(server: &mut Server, roots: I) -> Result<usize, RegistrationError>
where
    I: IntoIterator<Item = R>,
    R: Into<DiscoveryRoot>,
{
    ActionRegistry::collected().register_routes_in(server, roots)
}
