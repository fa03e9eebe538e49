//! Subcommand implementations

pub mod eval;
pub mod precompile;
pub mod run;
