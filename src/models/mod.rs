//! Data models for sqlframe.
//!
//! This module re-exports the value and record types used throughout the crate.

pub mod entity;
pub mod value;

// Re-export commonly used types
pub use entity::{Entity, Field};
pub use value::{Decimal, FromValue, ToValue, Value, ValueError};
