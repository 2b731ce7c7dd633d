//! Food order storefront library.
//!
//! Cart, pricing and checkout orchestration for a food-ordering storefront,
//! plus the HTTP surface the binary serves. Exposed as a library so the
//! orchestrator can be driven directly in tests and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod orders;
pub mod pricing;
pub mod routes;
pub mod sessions;
pub mod state;
