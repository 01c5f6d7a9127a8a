//! CLI subcommand implementations.

pub mod placements;
pub mod simulate;
