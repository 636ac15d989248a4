//! CLI command implementations.

pub mod common;
pub mod list;
pub mod render;
pub mod run;
pub mod screenshot;
