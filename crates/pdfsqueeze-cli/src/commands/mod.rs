//! CLI subcommands.

pub mod compress;
