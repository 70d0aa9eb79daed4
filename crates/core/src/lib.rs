//! Star Burger Core - Shared types library.
//!
//! This crate provides common types used across all Star Burger components:
//! - `server` - Public order API and the staff dashboard
//! - `cli` - Command-line tools for migrations, seeding and cache housekeeping
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, coordinates, prices and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
