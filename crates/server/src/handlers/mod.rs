//! HTTP request handlers.

pub mod health;
pub mod records;

pub use health::*;
pub use records::*;
