pub mod client;
pub mod configuration;
pub mod diff;
pub mod error;
pub mod object_type;
pub mod reconciler;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{RpcRequest, ZabbixSession};
pub use error::ZabbixError;
pub use object_type::ObjectType;
pub use reconciler::{DeclaredState, Decision, DesiredObject, ReconcileOutcome, Reconciler};
pub use traits::ZabbixOperations;
