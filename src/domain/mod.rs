//! Domain layer: pure business types and logic, free of I/O.

pub mod foundation;
pub mod group;
pub mod payment;
