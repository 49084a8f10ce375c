//! Domain layer - billing model and shared primitives.

pub mod billing;
pub mod foundation;
