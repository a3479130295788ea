//! # ZCL data
//!
//! Wire level types of the Zigbee Cluster Library. Frame headers, attribute
//! data types and values, foundation commands and the payloads of the
//! cluster specific commands handled by `zcl-service`.
//!

#![warn(missing_docs)]

#[macro_use]
extern crate bitflags;

#[macro_use]
mod utils;

pub mod cluster_library; // ZCL
pub mod common;
pub mod error;
pub mod pack;

pub use common::address::{Address, ExtendedAddress, ShortAddress};
pub use common::profile_identifier::ProfileIdentifier;
pub use error::Error;
