//! Shared domain models used by providers, quotes and execution

pub mod amount;
pub mod chain;
pub mod secret_string;
pub mod token;

pub use amount::{AmountError, AmountResult, TokenAmount};
pub use chain::{
	find_supported_chain, is_chain_supported, supported_chains, Chain, FiatCurrency,
	ETHEREUM_CHAIN_ID, ZKSYNC_ERA_CHAIN_ID,
};
pub use secret_string::SecretString;
pub use token::{Token, TokenKey};
