pub mod rng;
pub mod simulated;
