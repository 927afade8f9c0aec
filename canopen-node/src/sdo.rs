//! Expedited-only SDO server.
//!
//! Reduces `zencan-node::sdo_server::sdo_server`'s segmented/block-capable
//! state machine to the expedited upload/download/abort subset this stack
//! supports (`SPEC_FULL.md` §1 non-goals exclude segmented and block
//! transfers).
//!
//! Decoding a request and dispatching it against the Object Dictionary are
//! deliberately split into two steps ([`SdoServer::decode`] then
//! [`build_response`]) rather than handled inline with read/write callbacks:
//! [`crate::Device`] needs to dispatch an upload against one borrow shape and
//! a download against another (the latter touching the PDO channel arrays
//! too), and holding two live closures over the same device state at once
//! doesn't borrow-check. Decoding first keeps the SDO command parsing here,
//! while the actual dispatch stays in `device.rs` where the borrows are
//! available.

use canopen_common::{
    frame::{sdo_request_cob_id, sdo_response_cob_id},
    Address, ErrorCode, Frame, Value,
};
use defmt_or_log::debug;

/// A decoded SDO request, ready to be dispatched against the Object
/// Dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdoRequest {
    Upload {
        address: Address,
    },
    Download {
        address: Address,
        data: [u8; 4],
        declared_size: Option<usize>,
    },
    Unsupported {
        address: Address,
    },
}

/// Decodes inbound SDO requests against `node_id`'s request COB-ID.
///
/// Holds no per-transfer state: every request is handled to completion (or
/// aborted) within a single request/response pair, since only expedited
/// transfers are supported.
#[derive(Debug, Default)]
pub struct SdoServer;

impl SdoServer {
    pub const fn new() -> Self {
        SdoServer
    }

    /// Decode one inbound frame. Returns `None` if it isn't an SDO request
    /// addressed to this node. Otherwise returns the response COB-ID to
    /// reply on, and the decoded request.
    pub fn decode(&self, frame: &Frame, node_id: u8) -> Option<(u32, SdoRequest)> {
        if frame.extended || frame.id != sdo_request_cob_id(node_id) || frame.len != 8 {
            return None;
        }
        let data = frame.data();
        let cmd = data[0];
        let index = u16::from_le_bytes([data[1], data[2]]);
        let sub = data[3];
        let address = Address::new(index, sub);
        let response_id = sdo_response_cob_id(node_id);

        if cmd & 0xE0 == 0x40 {
            return Some((response_id, SdoRequest::Upload { address }));
        }
        if cmd & 0xE2 == 0x22 {
            let declared_size = if cmd & 1 != 0 {
                Some(4 - ((cmd >> 2) & 3) as usize)
            } else {
                None
            };
            let mut payload = [0u8; 4];
            payload.copy_from_slice(&data[4..8]);
            return Some((
                response_id,
                SdoRequest::Download {
                    address,
                    data: payload,
                    declared_size,
                },
            ));
        }

        debug!("SDO: unsupported command byte {:#04x}", cmd);
        Some((response_id, SdoRequest::Unsupported { address }))
    }
}

/// Build the expedited upload response for a successful read.
pub fn upload_response(response_id: u32, address: Address, value: Value) -> Frame {
    if !value.supports_expedited_transfer() {
        return abort_frame(response_id, address, ErrorCode::UnsupportedAccess);
    }
    let mut payload = [0u8; 8];
    let size = value.to_bytes(&mut payload);
    let mut out = [0u8; 8];
    out[0] = 0x43 | (((4 - size) as u8) << 2);
    out[1..3].copy_from_slice(&address.index.to_le_bytes());
    out[3] = address.subindex;
    out[4..4 + size].copy_from_slice(&payload[0..size]);
    Frame::new(response_id, &out)
}

/// Build the download confirmation response for a successful write.
pub fn download_response(response_id: u32, address: Address) -> Frame {
    let mut out = [0u8; 8];
    out[0] = 0x60;
    out[1..3].copy_from_slice(&address.index.to_le_bytes());
    out[3] = address.subindex;
    Frame::new(response_id, &out)
}

/// Build an SDO abort frame carrying `code`.
pub fn abort_frame(response_id: u32, address: Address, code: ErrorCode) -> Frame {
    let mut out = [0u8; 8];
    out[0] = 0x80;
    out[1..3].copy_from_slice(&address.index.to_le_bytes());
    out[3] = address.subindex;
    out[4..8].copy_from_slice(&(code as u32).to_le_bytes());
    Frame::new(response_id, &out)
}
