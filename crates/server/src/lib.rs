//! Star Burger server library.
//!
//! This crate provides the order API, the staff dashboard and the
//! geocoding-backed restaurant matching as a library, allowing it to be
//! tested and reused by the CLI.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod geo;
pub mod matching;
pub mod models;
pub mod routes;
pub mod state;
