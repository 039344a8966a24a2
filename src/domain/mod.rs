//! Domain types and the ports through which the coordinator reaches the
//! engine, the random source, and the interaction surface.

pub mod outcome;
pub mod pin;
pub mod ports;
pub mod transaction;
