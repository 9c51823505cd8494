//! Helper functions for templates and commands

mod date;
mod url;

pub use date::*;
pub use url::*;
