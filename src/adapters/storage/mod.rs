//! Order storage adapters

mod memory;
mod json_file;

pub use memory::{MemoryOrderStore, OrderTable};
pub use json_file::{JsonOrderStore, DEFAULT_ORDER_FILE};
