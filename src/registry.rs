//! The set of actions the registrar can discover.
//!
//! Actions are recorded at link time with [`register_action!`], or added to
//! an [`ActionRegistry`] by hand. Either way only types implementing
//! [`RouteProvider`] can be recorded, so everything the registrar finds has
//! a route hook.

use std::any::TypeId;
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ActionsConfig;
use crate::{RouteProvider, Server};

/// Identifies a registered action: where it lives and how to run its route
/// hook.
///
/// Two references denote the same action when they refer to the same type;
/// the path is only used for discovery and display.
#[derive(Clone, Copy)]
pub struct ActionReference {
    module_path: &'static str,
    name: &'static str,
    type_id: fn() -> TypeId,
    routes: fn(&mut Server) -> crate::Result,
}

impl ActionReference {
    /// A reference to the action `name` defined in `module_path`.
    ///
    /// This is what [`register_action!`] expands to; prefer
    /// [`ActionReference::of`] when writing it by hand.
    #[must_use]
    pub const fn new(
        module_path: &'static str,
        name: &'static str,
        type_id: fn() -> TypeId,
        routes: fn(&mut Server) -> crate::Result,
    ) -> Self {
        Self {
            module_path,
            name,
            type_id,
            routes,
        }
    }

    /// A reference to `A`, located by its type path.
    ///
    /// Generic arguments stay part of the name, so `Export<Csv>` and
    /// `Export<Json>` are distinct actions in the same module.
    #[must_use]
    pub fn of<A: RouteProvider>() -> Self {
        let type_path = std::any::type_name::<A>();
        let plain = type_path
            .find('<')
            .map_or(type_path, |generics| &type_path[..generics]);
        let (module_path, name) = match plain.rsplit_once("::") {
            Some((module_path, _)) => (module_path, &type_path[module_path.len() + 2..]),
            None => ("", type_path),
        };
        Self::new(module_path, name, TypeId::of::<A>, A::routes)
    }

    /// The module the action is defined in, e.g. `app::actions::users`.
    #[must_use]
    pub fn module_path(&self) -> &'static str {
        self.module_path
    }

    /// The action's type name, e.g. `CreateUser` or `Export<Csv>`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The module path followed by the type name.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        if self.module_path.is_empty() {
            self.name.to_owned()
        } else {
            format!("{}::{}", self.module_path, self.name)
        }
    }

    /// Run the action's route hook.
    pub(crate) fn invoke(&self, server: &mut Server) -> crate::Result {
        (self.routes)(server)
    }

    /// The [`TypeId`] of the action type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    fn segments(&self) -> impl Iterator<Item = &'static str> + Clone {
        split_path(self.module_path).chain(std::iter::once(self.name))
    }

    /// Depth-first, lexical within a module.
    fn traversal_cmp(&self, other: &Self) -> Ordering {
        self.segments().cmp(other.segments())
    }
}

impl fmt::Debug for ActionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionReference")
            .field("module_path", &self.module_path)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ActionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

inventory::collect!(ActionReference);

/// Record an action in the link-time registry.
///
/// The action must implement [`RouteProvider`]. Its location is the module
/// the macro is invoked in, so invoke it next to the action's definition.
///
/// ```no_run
/// use envoy_actions::{register_action, Context, RouteProvider, Server};
///
/// struct Ping;
///
/// async fn pong(ctx: &mut Context) -> envoy_actions::Result {
///     ctx.set_body("pong");
///     Ok(())
/// }
///
/// impl RouteProvider for Ping {
///     fn routes(server: &mut Server) -> envoy_actions::Result {
///         server.at("/ping").get(pong);
///         Ok(())
///     }
/// }
///
/// register_action!(Ping);
/// ```
#[macro_export]
macro_rules! register_action {
    ($($action:ident),+ $(,)?) => {
        $(
            $crate::__inventory::submit! {
                $crate::ActionReference::new(
                    module_path!(),
                    stringify!($action),
                    ::std::any::TypeId::of::<$action>,
                    <$action as $crate::RouteProvider>::routes,
                )
            }
        )+
    };
}

/// A module path under which actions are discovered.
///
/// Segments are separated by `::` (or `/`, so `app/actions` is accepted as
/// well). A root covers an action when the root's segments are a prefix of
/// the action's module path followed by its name, either from the crate name
/// or from the segment after it: for a crate `shop`, both `shop::actions`
/// and `actions` cover `shop::actions::orders::PlaceOrder`. A root naming an
/// action covers only that action; an empty root covers every action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct DiscoveryRoot {
    path: String,
}

impl DiscoveryRoot {
    /// Normalize `path` into a root.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = path
            .as_ref()
            .split(|c| c == '/' || c == ':')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join("::");
        Self { path }
    }

    /// The normalized path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Whether `reference` lives under this root.
    #[must_use]
    pub fn covers(&self, reference: &ActionReference) -> bool {
        let segments = reference.segments();
        starts_with(segments.clone(), split_path(&self.path))
            || starts_with(segments.skip(1), split_path(&self.path))
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> + Clone {
    path.split("::").filter(|segment| !segment.is_empty())
}

fn starts_with<'a, 'b>(
    mut path: impl Iterator<Item = &'a str>,
    mut prefix: impl Iterator<Item = &'b str>,
) -> bool {
    prefix.all(|segment| path.next().map_or(false, |s| s == segment))
}

impl From<&str> for DiscoveryRoot {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for DiscoveryRoot {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<&DiscoveryRoot> for DiscoveryRoot {
    fn from(root: &DiscoveryRoot) -> Self {
        root.clone()
    }
}

impl From<DiscoveryRoot> for String {
    fn from(root: DiscoveryRoot) -> Self {
        root.path
    }
}

impl fmt::Display for DiscoveryRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// The actions a registrar run can discover, and the default roots used
/// when none are given.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<ActionReference>,
    config: ActionsConfig,
}

impl ActionRegistry {
    /// An empty registry using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action recorded with [`register_action!`], configured from the
    /// environment (see [`ActionsConfig::from_env`]).
    #[must_use]
    pub fn collected() -> Self {
        Self {
            actions: inventory::iter::<ActionReference>
                .into_iter()
                .copied()
                .collect(),
            config: ActionsConfig::from_env(),
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: ActionsConfig) -> Self {
        self.config = config;
        self
    }

    /// The configuration used by `register_routes`.
    #[must_use]
    pub fn config(&self) -> &ActionsConfig {
        &self.config
    }

    /// Add `A`.
    pub fn register<A: RouteProvider>(&mut self) -> &mut Self {
        self.push(ActionReference::of::<A>())
    }

    /// Add a reference.
    pub fn push(&mut self, reference: ActionReference) -> &mut Self {
        self.actions.push(reference);
        self
    }

    /// The number of references, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// The references, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionReference> {
        self.actions.iter()
    }

    /// The references under `root`, in traversal order.
    #[must_use]
    pub fn discover(&self, root: &DiscoveryRoot) -> Vec<ActionReference> {
        let mut found: Vec<ActionReference> = self
            .actions
            .iter()
            .filter(|reference| root.covers(reference))
            .copied()
            .collect();
        found.sort_by(ActionReference::traversal_cmp);
        found
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn noop(_: &mut Server) -> crate::Result {
        Ok(())
    }

    fn reference(module_path: &'static str, name: &'static str) -> ActionReference {
        ActionReference::new(module_path, name, TypeId::of::<()>, noop)
    }

    #[test]
    fn roots_normalize_separators() {
        assert_eq!(DiscoveryRoot::new("app/actions/").as_str(), "app::actions");
        assert_eq!(DiscoveryRoot::new("::app::actions").as_str(), "app::actions");
        assert_eq!(DiscoveryRoot::new(" app :: actions ").as_str(), "app::actions");
    }

    #[test]
    fn roots_match_whole_segments_with_or_without_crate() {
        let action = reference("shop::actions::orders", "PlaceOrder");

        assert!(DiscoveryRoot::new("shop::actions").covers(&action));
        assert!(DiscoveryRoot::new("actions").covers(&action));
        assert!(DiscoveryRoot::new("actions::orders::PlaceOrder").covers(&action));
        assert!(DiscoveryRoot::new("").covers(&action));

        assert!(!DiscoveryRoot::new("act").covers(&action));
        assert!(!DiscoveryRoot::new("orders").covers(&action));
        assert!(!DiscoveryRoot::new("actions::users").covers(&action));
    }

    #[test]
    fn unqualified_roots_span_every_crate() {
        let own = reference("shop::actions", "PlaceOrder");
        let dependency = reference("billing::actions", "Charge");

        assert!(DiscoveryRoot::new("actions").covers(&own));
        assert!(DiscoveryRoot::new("actions").covers(&dependency));
        assert!(DiscoveryRoot::new("shop::actions").covers(&own));
        assert!(!DiscoveryRoot::new("shop::actions").covers(&dependency));
    }

    #[test]
    fn discovery_is_depth_first_and_lexical() {
        let mut registry = ActionRegistry::new();
        registry
            .push(reference("app::actions::users", "Delete"))
            .push(reference("app::actions", "Zed"))
            .push(reference("app::actions", "Alpha"))
            .push(reference("app::actions::users", "Create"))
            .push(reference("app::other", "Outside"));

        let names: Vec<_> = registry
            .discover(&DiscoveryRoot::new("app::actions"))
            .iter()
            .map(ActionReference::qualified_name)
            .collect();

        assert_eq!(
            names,
            vec![
                "app::actions::Alpha",
                "app::actions::Zed",
                "app::actions::users::Create",
                "app::actions::users::Delete",
            ]
        );
    }

    #[test]
    fn reference_of_splits_type_path() {
        struct Probe;
        impl RouteProvider for Probe {
            fn routes(_: &mut Server) -> crate::Result {
                Ok(())
            }
        }

        let probe = ActionReference::of::<Probe>();
        assert_eq!(probe.name(), "Probe");
        assert!(probe.module_path().starts_with("envoy_actions::registry"));
        assert_eq!(probe.type_id(), TypeId::of::<Probe>());
    }

    #[test]
    fn generic_instantiations_are_distinct_actions() {
        struct Export<T>(std::marker::PhantomData<T>);
        impl<T: 'static> RouteProvider for Export<T> {
            fn routes(_: &mut Server) -> crate::Result {
                Ok(())
            }
        }

        let bytes = ActionReference::of::<Export<Vec<u8>>>();
        let text = ActionReference::of::<Export<String>>();

        assert_eq!(bytes.module_path(), text.module_path());
        assert!(bytes.name().starts_with("Export<"));
        assert_ne!(bytes.name(), text.name());
        assert_ne!(bytes.type_id(), text.type_id());
        assert!(DiscoveryRoot::new("registry").covers(&bytes));
    }
}
