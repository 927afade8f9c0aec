//! Wire-level types shared between the SDO server, PDO engines, and the
//! Object Dictionary model of a CANopen device-side protocol stack.
//!
//! This crate has no knowledge of handler dispatch or device state; it only
//! defines the address space, the typed value representation, frame shape,
//! and the abort/error code taxonomy that the rest of the stack speaks.
#![cfg_attr(not(feature = "std"), no_std)]

pub mod address;
pub mod error;
pub mod frame;
pub mod node_id;
pub mod ordered_map;
pub mod types;

pub use address::Address;
pub use error::ErrorCode;
pub use frame::Frame;
pub use node_id::NodeId;
pub use ordered_map::OrderedMap;
pub use types::{AccessType, DataType, Entry, PdoMapping, Value};
