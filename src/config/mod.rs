//! Configuration management for viva.
//!
//! Application configuration lives in a TOML file in the user's config
//! directory and is created with defaults on first run.

pub mod file;

pub use file::{
    get_config_path, AudioConfig, BackendConfig, ProfileConfig, SessionConfig, VivaConfig,
};
