//! Application layer coordinating a transaction attempt.
//!
//! The `Coordinator` starts each attempt on its own tokio task. The worker
//! and the interaction surface meet only at the attempt's `PinChannel`, and
//! the outcome travels back to the caller through a `ResultDispatcher`.

pub mod channel;
pub mod coordinator;
pub mod dispatcher;
pub mod surface;
pub mod worker;
