//! Application layer: use-case handlers wiring domain logic to ports.

pub mod handlers;
