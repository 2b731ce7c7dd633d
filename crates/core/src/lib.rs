//! Food Order Core - Shared domain types.
//!
//! This crate provides the types shared by every food-order component:
//! - `storefront` - Cart, checkout orchestration and the browser-facing API
//! - `integration-tests` - End-to-end checkout tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, phone numbers and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
