//! Repository traits for metadata operations.

pub mod records;

pub use records::RecordRepo;
