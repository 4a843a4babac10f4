//! Task lifecycle controller.
//!
//! Sequences user actions through the temporal policy, mutates the in-memory
//! state optimistically and writes through the [`SyncGateway`]. A periodic
//! clock tick drives the daily rollover and produces a [`TickView`].
//!
//! ```text
//! action -> policy check -> local mutation -> gateway write
//!                                              | error
//!                                              v
//!                                   rollback + ActionError
//! ```
//!
//! [`SyncGateway`]: crate::gateway::SyncGateway

mod controller;
mod view;

pub use controller::{LifecycleController, NewTask};
pub use view::{TaskView, TickView};
