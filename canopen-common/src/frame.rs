//! CAN frame representation and CANopen COB-ID derivation.

const MAX_DATA_LENGTH: usize = 8;

/// A CAN data frame as exchanged with the (out-of-scope) transceiver driver.
///
/// Only standard 11-bit identifiers are produced or consumed by this stack;
/// extended frames received from the driver are ignored by [`crate`]'s
/// consumers.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    /// The CAN identifier. 11 bits are significant unless `extended`.
    pub id: u32,
    /// True if `id` is a 29-bit extended identifier.
    pub extended: bool,
    /// Number of valid bytes in `data`, 0..=8.
    pub len: u8,
    pub data: [u8; MAX_DATA_LENGTH],
}

impl Frame {
    /// Build a new standard (11-bit) frame from `id` and `data`.
    ///
    /// Panics if `data` is longer than 8 bytes.
    pub fn new(id: u32, data: &[u8]) -> Self {
        assert!(data.len() <= MAX_DATA_LENGTH, "CAN frame data exceeds 8 bytes");
        let mut buf = [0u8; MAX_DATA_LENGTH];
        buf[..data.len()].copy_from_slice(data);
        Frame {
            id,
            extended: false,
            len: data.len() as u8,
            data: buf,
        }
    }

    /// The valid portion of `data`, as a slice.
    pub fn data(&self) -> &[u8] {
        &self.data[0..self.len as usize]
    }
}

/// Derive the SDO server's request (client-to-server) COB-ID for `node_id`.
pub const fn sdo_request_cob_id(node_id: u8) -> u32 {
    0x600 + node_id as u32
}

/// Derive the SDO server's response (server-to-client) COB-ID for `node_id`.
pub const fn sdo_response_cob_id(node_id: u8) -> u32 {
    0x580 + node_id as u32
}

/// Derive the default COB-ID of TPDO channel `n` (0..=3) for `node_id`.
pub const fn default_tpdo_cob_id(n: u8, node_id: u8) -> u32 {
    0x180 + 0x100 * n as u32 + node_id as u32
}

/// Derive the default COB-ID of RPDO channel `n` (0..=3) for `node_id`.
pub const fn default_rpdo_cob_id(n: u8, node_id: u8) -> u32 {
    0x200 + 0x100 * n as u32 + node_id as u32
}
