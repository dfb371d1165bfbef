//! Typed function-call descriptors.
//!
//! A [`FunctionCall`] carries a function name, its ordered Solidity
//! parameter types, and the argument values as display strings. The chain
//! layer resolves a descriptor into a selector and ABI-coded input exactly
//! once; nothing else in the system builds call data from strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A fully resolved contract call: function name, ordered parameter types,
/// and argument values in display form (addresses as 0x hex, numbers as
/// decimal strings, bytes as 0x hex).
///
/// Arity is validated when the call is encoded; a descriptor with mismatched
/// `params`/`args` lengths is rejected before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
	/// Function name, e.g. `initialize`.
	pub name: String,
	/// Canonical Solidity parameter types, e.g. `["address", "uint256"]`.
	pub params: Vec<String>,
	/// Argument values, one per parameter.
	pub args: Vec<String>,
}

impl FunctionCall {
	/// Creates a call descriptor from a name, parameter types, and argument
	/// values.
	pub fn new(
		name: impl Into<String>,
		params: Vec<String>,
		args: Vec<String>,
	) -> Self {
		Self {
			name: name.into(),
			params,
			args,
		}
	}

	/// Creates a descriptor for a zero-argument call, e.g. a role getter.
	pub fn no_args(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			params: Vec::new(),
			args: Vec::new(),
		}
	}

	/// Returns the canonical signature, e.g. `initialize(address,uint256)`.
	pub fn signature(&self) -> String {
		format!("{}({})", self.name, self.params.join(","))
	}
}

impl fmt::Display for FunctionCall {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.signature())
	}
}

/// An argument value as written in a step program.
///
/// Three forms are recognized: `@signer` resolves to the transaction
/// signer's address, `@<alias>` to the registered address of a previously
/// deployed alias (redirected through the proxy once a binding exists),
/// and anything else is a literal value coerced against the declared
/// parameter type when the call is encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArgument {
	/// The orchestrator's transaction signer address.
	Signer,
	/// The address recorded for a logical alias.
	Alias(String),
	/// A literal value string.
	Literal(String),
}

impl CallArgument {
	/// Parses the program text form of an argument.
	pub fn parse(text: &str) -> Self {
		match text.strip_prefix('@') {
			Some("signer") => CallArgument::Signer,
			Some(alias) => CallArgument::Alias(alias.to_string()),
			None => CallArgument::Literal(text.to_string()),
		}
	}

	/// Returns the alias this argument references, if any.
	pub fn referenced_alias(&self) -> Option<&str> {
		match self {
			CallArgument::Alias(alias) => Some(alias),
			_ => None,
		}
	}
}

impl fmt::Display for CallArgument {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CallArgument::Signer => write!(f, "@signer"),
			CallArgument::Alias(alias) => write!(f, "@{}", alias),
			CallArgument::Literal(value) => write!(f, "{}", value),
		}
	}
}

impl Serialize for CallArgument {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for CallArgument {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let text = String::deserialize(deserializer)?;
		Ok(CallArgument::parse(&text))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_signature_formatting() {
		let call = FunctionCall::new(
			"initialize",
			vec!["address".to_string(), "uint256".to_string()],
			vec!["0x0000000000000000000000000000000000000001".to_string(), "100".to_string()],
		);
		assert_eq!(call.signature(), "initialize(address,uint256)");

		let getter = FunctionCall::no_args("ADMIN_ROLE");
		assert_eq!(getter.signature(), "ADMIN_ROLE()");
	}

	#[test]
	fn test_call_argument_parsing() {
		assert_eq!(CallArgument::parse("@signer"), CallArgument::Signer);
		assert_eq!(
			CallArgument::parse("@FFactory"),
			CallArgument::Alias("FFactory".to_string())
		);
		assert_eq!(
			CallArgument::parse("100"),
			CallArgument::Literal("100".to_string())
		);
		assert_eq!(
			CallArgument::parse("0xAA00000000000000000000000000000000000000"),
			CallArgument::Literal("0xAA00000000000000000000000000000000000000".to_string())
		);
	}

	#[test]
	fn test_call_argument_round_trip() {
		for text in ["@signer", "@FFactoryProxy", "12345", "0x00"] {
			let arg = CallArgument::parse(text);
			assert_eq!(arg.to_string(), text);
			let json = serde_json::to_string(&arg).unwrap();
			let back: CallArgument = serde_json::from_str(&json).unwrap();
			assert_eq!(back, arg);
		}
	}
}
