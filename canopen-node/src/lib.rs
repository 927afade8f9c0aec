//! Device-side CANopen protocol core.
//!
//! Wires together an Object Dictionary, a typed handler registry, an SDO
//! server, and 4 RPDO / 4 TPDO channels into a single [`Device`] value owned
//! by the host application. The host is responsible for the CAN transceiver,
//! the monotonic clock, and the cooperative loop that feeds frames into
//! [`Device::process_message`] and periodically calls [`Device::update`].
#![cfg_attr(not(feature = "std"), no_std)]

pub mod device;
pub mod pdo_config;
pub mod registry;
pub mod rpdo;
pub mod sdo;
pub mod tpdo;

pub use device::{Device, DeviceBuildError};
pub use registry::{HandlerRegistry, ReadSlot, RegistrationError, WriteSlot};
pub use rpdo::RpdoChannel;
pub use tpdo::{TpdoChannel, TransmitMode};
