//! Registrar configuration.

use serde::{Deserialize, Serialize};

use crate::DiscoveryRoot;

/// The environment variable holding the default discovery roots,
/// comma-separated.
pub const ROOTS_ENV: &str = "ENVOY_ACTION_ROOTS";

/// The default discovery root: every `actions` module directly under a
/// crate root.
///
/// This matches the `actions` module of *every* crate linked into the
/// binary that records actions with
/// [`register_action!`](crate::register_action), dependencies included.
/// Name the crate (`my_app::actions`) in [`ROOTS_ENV`] or
/// [`ActionsConfig::new`] to register only the application's own actions.
pub const DEFAULT_ROOT: &str = "actions";

/// Registrar configuration.
///
/// Can be deserialized from an application's own configuration:
///
/// ```
/// let config: envoy_actions::ActionsConfig =
///     serde_json::from_str(r#"{ "roots": ["app::actions", "billing/actions"] }"#).unwrap();
/// assert_eq!(config.roots()[1].as_str(), "billing::actions");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsConfig {
    roots: Vec<DiscoveryRoot>,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            roots: vec![DiscoveryRoot::new(DEFAULT_ROOT)],
        }
    }
}

impl ActionsConfig {
    /// A configuration using `roots` as the default roots.
    pub fn new<I, R>(roots: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<DiscoveryRoot>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
        }
    }

    /// Read the default roots from `ENVOY_ACTION_ROOTS`.
    ///
    /// Falls back to [`DEFAULT_ROOT`] when the variable is unset, not valid
    /// unicode, or lists no roots.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(ROOTS_ENV) {
            Ok(value) => Self::parse(&value),
            Err(std::env::VarError::NotPresent) => Self::default(),
            Err(err) => {
                tracing::warn!("Ignoring {}: {}", ROOTS_ENV, err);
                Self::default()
            }
        }
    }

    fn parse(value: &str) -> Self {
        let roots: Vec<DiscoveryRoot> = value
            .split(',')
            .map(str::trim)
            .filter(|root| !root.is_empty())
            .map(DiscoveryRoot::new)
            .collect();
        if roots.is_empty() {
            Self::default()
        } else {
            Self { roots }
        }
    }

    /// The default roots, in discovery order.
    #[must_use]
    pub fn roots(&self) -> &[DiscoveryRoot] {
        &self.roots
    }
}
