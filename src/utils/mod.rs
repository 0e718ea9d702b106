//! Utility modules shared by the pipeline and the host binary.

pub mod exec;
pub mod html;
pub mod path;
mod plural;

pub use plural::{plural_count, plural_s};
