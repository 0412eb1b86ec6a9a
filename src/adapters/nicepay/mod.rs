//! NicePay Adapter
//!
//! PaymentProvider implementation for the NicePay merchant API.

mod client;
mod signature;
mod types;

pub use client::{NicePayClient, NicePayConfig};
pub use signature::merchant_token;
pub use types::{NicePayResponse, RESULT_CODE_OK};
