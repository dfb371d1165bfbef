//! ABI encoding from string-form calls.
//!
//! Step programs carry parameter types and arguments as strings; the
//! helpers here coerce them through dynamic Solidity types, so the
//! orchestrator needs no compile-time contract bindings.

use crate::ChainError;
use alloy_dyn_abi::{DynSolType, JsonAbiExt};
use alloy_json_abi::Function;
use alloy_primitives::U256;
use deployer_types::FunctionCall;

pub use alloy_dyn_abi::DynSolValue;

/// Encodes a function call to selector-prefixed calldata.
pub fn encode_call(call: &FunctionCall) -> Result<Vec<u8>, ChainError> {
	let signature = call.signature();
	let function = Function::parse(&signature)
		.map_err(|err| ChainError::Encoding(format!("bad signature {signature}: {err}")))?;
	let values = coerce_values(&call.params, &call.args)?;
	function
		.abi_encode_input(&values)
		.map_err(|err| ChainError::Encoding(format!("encode {signature}: {err}")))
}

/// ABI-encodes constructor arguments for appending to creation bytecode.
/// No arguments encode to nothing.
pub fn encode_constructor_args(
	params: &[String],
	args: &[String],
) -> Result<Vec<u8>, ChainError> {
	if params.is_empty() {
		return Ok(Vec::new());
	}
	let values = coerce_values(params, args)?;
	Ok(DynSolValue::Tuple(values).abi_encode_params())
}

/// Decodes return data as a single value of the given Solidity type.
pub fn decode_single(ty: &str, data: &[u8]) -> Result<DynSolValue, ChainError> {
	let parsed = DynSolType::parse(ty)
		.map_err(|err| ChainError::Encoding(format!("bad type {ty}: {err}")))?;
	parsed
		.abi_decode(data)
		.map_err(|err| ChainError::Encoding(format!("decode {ty} return: {err}")))
}

/// Parses a decimal ether amount (e.g. `"0.5"`) into wei.
pub fn parse_ether_value(value: &str) -> Result<U256, ChainError> {
	alloy_primitives::utils::parse_ether(value)
		.map_err(|err| ChainError::Encoding(format!("bad ether value {value:?}: {err}")))
}

fn coerce_values(params: &[String], args: &[String]) -> Result<Vec<DynSolValue>, ChainError> {
	params
		.iter()
		.zip(args)
		.map(|(param, arg)| {
			let ty = DynSolType::parse(param)
				.map_err(|err| ChainError::Encoding(format!("bad type {param}: {err}")))?;
			ty.coerce_str(arg).map_err(|err| {
				ChainError::Encoding(format!("argument {arg:?} does not fit {param}: {err}"))
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, hex};

	#[test]
	fn test_encode_call_prefixes_selector() {
		let call = FunctionCall::new(
			"transfer",
			vec!["address".to_string(), "uint256".to_string()],
			vec![
				"0x00000000000000000000000000000000000000aa".to_string(),
				"1000".to_string(),
			],
		);
		let data = encode_call(&call).unwrap();
		// transfer(address,uint256) selector.
		assert_eq!(&data[..4], hex!("a9059cbb"));
		assert_eq!(data.len(), 4 + 64);
	}

	#[test]
	fn test_encode_call_without_arguments() {
		let call = FunctionCall::no_args("ADMIN_ROLE");
		let data = encode_call(&call).unwrap();
		assert_eq!(data.len(), 4);
	}

	#[test]
	fn test_encode_constructor_args() {
		let encoded = encode_constructor_args(
			&["address".to_string()],
			&["0x00000000000000000000000000000000000000aa".to_string()],
		)
		.unwrap();
		assert_eq!(encoded.len(), 32);
		assert_eq!(
			&encoded[12..],
			address!("00000000000000000000000000000000000000aa").as_slice()
		);

		assert!(encode_constructor_args(&[], &[]).unwrap().is_empty());
	}

	#[test]
	fn test_coercion_failure_is_an_encoding_error() {
		let call = FunctionCall::new(
			"setRouter",
			vec!["address".to_string()],
			vec!["not-an-address".to_string()],
		);
		assert!(matches!(encode_call(&call), Err(ChainError::Encoding(_))));
	}

	#[test]
	fn test_decode_single_bool() {
		let mut data = [0u8; 32];
		data[31] = 1;
		let value = decode_single("bool", &data).unwrap();
		assert_eq!(value.as_bool(), Some(true));
	}

	#[test]
	fn test_parse_ether_value() {
		assert_eq!(
			parse_ether_value("1").unwrap(),
			U256::from(10u64).pow(U256::from(18u64))
		);
		assert!(parse_ether_value("one").is_err());
	}
}
