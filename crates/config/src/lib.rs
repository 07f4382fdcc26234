//! Configuration loading, validation and env substitution.
//!
//! Config files: `teamwire.toml`, `teamwire.yaml`, `teamwire.yml` or
//! `teamwire.json`, searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod gating;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{BotConfig, ServerConfig, TeamwireConfig},
    validate::{
        Diagnostic, Severity, ValidationResult, validate, validate_file, validate_toml_str,
    },
};
