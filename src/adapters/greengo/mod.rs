//! Greengo Adapter

mod client;
mod types;

pub use client::{GreengoClient, GreengoConfig};
pub use types::GreengoResponse;
