//! Domain Layer - Core business logic for the exchanger
//!
//! Pure types with no I/O: the order record with its lifecycle state machine
//! and the operator roster that gates who may drive it.

pub mod order;
pub mod operators;

pub use order::{LifecycleEvent, OperatorNote, Order, OrderError, OrderStatus, Transition};
pub use operators::{Actor, OperatorRoster};
