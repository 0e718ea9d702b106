//! Command-line interface of the reference host.

mod args;
pub mod build;
pub mod clean;

pub use args::{BuildArgs, Cli, Commands};
