//! Step program loading.
//!
//! Programs are TOML files with the same `${VAR}` environment expansion as
//! the main configuration, so chain-specific launch parameters (tax rates,
//! external router addresses) stay out of the program text.

use crate::{resolve_env_vars, ConfigError};
use deployer_types::StepProgram;
use std::path::Path;

/// Loads a step program from a TOML file, resolving environment
/// references and validating its structure.
pub fn load_program(path: impl AsRef<Path>) -> Result<StepProgram, ConfigError> {
	let text = std::fs::read_to_string(path)?;
	parse_program(&text)
}

/// Parses and validates a step program from TOML text.
pub fn parse_program(text: &str) -> Result<StepProgram, ConfigError> {
	let resolved = resolve_env_vars(text)?;
	let program: StepProgram = toml::from_str(&resolved)?;
	program
		.validate()
		.map_err(|err| ConfigError::Validation(err.to_string()))?;
	Ok(program)
}
