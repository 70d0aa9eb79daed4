//! CLI subcommands.

pub mod geocode;
pub mod migrate;
pub mod seed;
