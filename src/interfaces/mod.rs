//! Adapters facing the outside world: batch files in and out, and the PIN
//! entry surfaces.

pub mod console;
pub mod csv;
pub mod scripted;
