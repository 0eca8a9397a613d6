//! Configuration loading
//!
//! Builds a [`credstore_domain::Config`] from `CREDSTORE_*` environment
//! variables or a TOML/JSON file.

pub mod loader;

pub use loader::{load, load_from_env, load_from_file, find_config_path};
