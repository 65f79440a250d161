use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use routefinder::{Captures, Router as PatternRouter};

use crate::endpoint::DynEndpoint;
use crate::http::{Method, StatusCode};

/// The routing table used by `Server`
///
/// Internally, we have a separate path table per HTTP method, plus one for
/// endpoints registered for every method. Every registration is also kept,
/// in order, in `entries`.
pub(crate) struct Router {
    method_map: HashMap<Method, PathTable>,
    all_method_router: PathTable,
    entries: Vec<RouteEntry>,
    not_found: Arc<DynEndpoint>,
    method_not_allowed: Arc<DynEndpoint>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("entries", &self.entries)
            .finish()
    }
}

/// The result of routing a URL
pub(crate) struct Selection {
    pub(crate) endpoint: Arc<DynEndpoint>,
    pub(crate) params: Captures<'static, 'static>,
    pub(crate) param_names: Vec<String>,
}

/// One registration recorded in the route table.
///
/// Entries are kept in registration order. Registering the same method and
/// path twice produces two entries; the later one is the endpoint that
/// requests are dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    method: Option<Method>,
    path: String,
    handler: String,
}

impl RouteEntry {
    /// The HTTP method, or `None` for an endpoint registered with `Route::all`.
    #[must_use]
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// The path pattern, as passed to `Server::at`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The name of the registered endpoint.
    ///
    /// For actions this is the action's type name; for explicit action
    /// methods it is the method's path.
    #[must_use]
    pub fn handler(&self) -> &str {
        &self.handler
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Some(method) => write!(f, "{} {} -> {}", method, self.path, self.handler),
            None => write!(f, "* {} -> {}", self.path, self.handler),
        }
    }
}

/// Endpoints for one method, keyed by pattern. A pattern is only added to
/// the matcher once; re-registering it replaces the endpoint in its slot.
struct PathTable {
    matcher: PatternRouter<usize>,
    slots: Vec<(Arc<DynEndpoint>, Vec<String>)>,
    by_path: HashMap<String, usize>,
}

impl Default for PathTable {
    fn default() -> Self {
        Self {
            matcher: PatternRouter::new(),
            slots: Vec::new(),
            by_path: HashMap::new(),
        }
    }
}

impl PathTable {
    fn add(&mut self, path: &str, ep: Arc<DynEndpoint>) -> Result<(), String> {
        if let Some(&slot) = self.by_path.get(path) {
            self.slots[slot].0 = ep;
            return Ok(());
        }

        let slot = self.slots.len();
        self.matcher.add(path, slot).map_err(|err| err.to_string())?;
        self.slots.push((ep, param_names(path)));
        self.by_path.insert(path.to_owned(), slot);
        Ok(())
    }

    fn best_match(&self, path: &str) -> Option<Selection> {
        self.matcher.best_match(path).map(|m| {
            let (endpoint, param_names) = &self.slots[*m.handler()];
            Selection {
                endpoint: endpoint.clone(),
                params: m.captures().into_owned(),
                param_names: param_names.clone(),
            }
        })
    }

    fn matches(&self, path: &str) -> bool {
        self.matcher.best_match(path).is_some()
    }
}

impl Router {
    pub(crate) fn new() -> Self {
        Router {
            method_map: HashMap::default(),
            all_method_router: PathTable::default(),
            entries: Vec::new(),
            not_found: Arc::new(not_found_endpoint),
            method_not_allowed: Arc::new(method_not_allowed),
        }
    }

    pub(crate) fn add(
        &mut self,
        path: &str,
        method: Method,
        ep: Arc<DynEndpoint>,
    ) -> Result<(), String> {
        let handler = ep.name().to_owned();
        self.method_map
            .entry(method)
            .or_insert_with(PathTable::default)
            .add(path, ep)?;
        tracing::trace!("Registered {} {} -> {}", method, path, handler);
        self.entries.push(RouteEntry {
            method: Some(method),
            path: path.to_owned(),
            handler,
        });
        Ok(())
    }

    pub(crate) fn add_all(&mut self, path: &str, ep: Arc<DynEndpoint>) -> Result<(), String> {
        let handler = ep.name().to_owned();
        self.all_method_router.add(path, ep)?;
        tracing::trace!("Registered * {} -> {}", path, handler);
        self.entries.push(RouteEntry {
            method: None,
            path: path.to_owned(),
            handler,
        });
        Ok(())
    }

    pub(crate) fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub(crate) fn route(&self, path: &str, method: Method) -> Selection {
        if let Some(selection) = self
            .method_map
            .get(&method)
            .and_then(|table| table.best_match(path))
        {
            selection
        } else if let Some(selection) = self.all_method_router.best_match(path) {
            selection
        } else if method == Method::Head {
            // If it is a HTTP HEAD request then check if there is a callback in the endpoints map
            // if not then fallback to the behavior of HTTP GET else proceed as usual
            self.route(path, Method::Get)
        } else if self
            .method_map
            .iter()
            .filter(|(k, _)| **k != method)
            .any(|(_, table)| table.matches(path))
        {
            // If this `path` can be handled by a callback registered with a different HTTP method
            // should return 405 Method Not Allowed
            Selection {
                endpoint: self.method_not_allowed.clone(),
                params: Captures::default(),
                param_names: Vec::new(),
            }
        } else {
            Selection {
                endpoint: self.not_found.clone(),
                params: Captures::default(),
                param_names: Vec::new(),
            }
        }
    }
}

fn param_names(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

async fn not_found_endpoint(ctx: &mut crate::Context) -> crate::Result {
    ctx.res.set_status(StatusCode::NotFound);
    Ok(())
}

async fn method_not_allowed(ctx: &mut crate::Context) -> crate::Result {
    ctx.res.set_status(StatusCode::MethodNotAllowed);
    Ok(())
}
