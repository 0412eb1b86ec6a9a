//! PSPWare Adapter
//!
//! PaymentProvider implementation for PSPWare. The only provider here that
//! handles pay-outs (sell orders).

mod client;
mod types;

pub use client::{PspWareClient, PspWareConfig};
pub use types::{
    CreateOrderBody, MerchantInfo, PspOrder, Withdrawal, WithdrawalBody, ORDER_TYPE_PAY_IN,
    ORDER_TYPE_PAY_OUT,
};
