//! Quote domain

pub mod errors;
pub mod request;
pub mod response;

pub use errors::{QuoteError, QuoteResult, QuoteValidationError, QuoteValidationResult};
pub use request::{QuoteOptions, QuoteRequest};
pub use response::{
	PayDetails, PaymentMethodQuote, ProviderQuote, QuoteResponse, QuoteStep, ReceiveDetails,
	StepKind,
};
