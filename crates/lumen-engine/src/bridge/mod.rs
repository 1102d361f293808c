//! Blocking adapters over wgpu's callback/future based requests.
//!
//! Adapter acquisition, device acquisition, buffer mapping and error scope
//! pops all complete asynchronously. The engine drives them from
//! straight-line code, so each request is wrapped in a [`PendingRequest`]
//! whose completion half is handed to the driver, then waited on while an
//! [`EventPump`] drains driver callbacks.
//!
//! The wait is bounded by a [`WaitPolicy`]; a driver that never reports back
//! surfaces as [`RequestError::TimedOut`] instead of hanging the process.

mod error;
mod pending;
mod policy;
mod pump;
mod requests;

pub use error::RequestError;
pub use pending::{Completion, PendingRequest};
pub use policy::{WaitMode, WaitPolicy};
pub use pump::{DevicePump, EventPump, FuturePump};
pub use requests::{map_read_sync, pop_error_scope_sync, request_adapter_sync, request_device_sync};
