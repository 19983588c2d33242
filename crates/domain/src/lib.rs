//! feed-relay domain crate
//!
//! This crate contains the core relay logic following hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `usecases`: Filtering, rendering, command replies, and the relay loop

pub mod model;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;
