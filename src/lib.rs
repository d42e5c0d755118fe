//! Smart Ajo - Rotating Savings Group Payments Core
//!
//! This crate implements payment verification and idempotent membership
//! activation for the Smart Ajo platform: Paystack transaction verification,
//! signed webhook processing, and atomic payout-slot assignment.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
