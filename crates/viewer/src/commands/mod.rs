//! Viewer subcommands

pub mod gpu;
pub mod hosts;
pub mod system;
