//! # Common structs and functions
//!
//! Addresses and profile identifiers shared by the cluster library.

pub mod address;
pub mod profile_identifier;

pub use profile_identifier::ProfileIdentifier;
