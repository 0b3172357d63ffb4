//! Payment-intent parsing and validation.

pub mod parser;
pub mod types;

pub use parser::IntentParser;
pub use types::{IntentError, PaymentIntent};
