//! The Envoy actions prelude.
pub use crate::action::{Action, AsController, RouteProvider, ValidationErrors};
pub use crate::Context;
pub use async_trait::async_trait;
pub use serde::{Deserialize, Serialize};
