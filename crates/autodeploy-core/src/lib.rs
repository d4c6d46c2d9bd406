pub mod branch;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod manifest;
pub mod orchestrator;
pub mod paths;
pub mod run_log;
pub mod script;
pub mod session;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{DeployError, Result};
