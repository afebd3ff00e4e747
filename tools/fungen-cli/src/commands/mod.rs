//! CLI subcommand implementations.

pub mod info;
pub mod postprocess;
pub mod recommend;
