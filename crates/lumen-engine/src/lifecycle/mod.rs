//! GPU resource lifecycle.
//!
//! Resources are created along a fixed dependency chain
//! (instance → surface → adapter → device → queue → pipelines → buffers →
//! bind groups) and released in exactly the reverse order.
//!
//! [`Stage`] names the links of that chain. [`ResourceStack`] owns the
//! pipeline-level resources of a renderer or compute job, refuses pushes that
//! would break the chain, and releases its contents last-in first-out.

mod stack;
mod stage;

pub use stack::{ResourceStack, Slot};
pub use stage::Stage;
