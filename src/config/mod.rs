//! Service configuration.
//!
//! Values come from an optional `config.yaml`, overridden by command-line
//! flags. The resulting [`Config`] is passed explicitly to
//! [`build_backend`]; nothing is read from global state.

mod args;
mod model;
mod operations;

pub use args::Cli;
pub use model::{BackendKind, Config};
pub use operations::{build_backend, ConfigError};
