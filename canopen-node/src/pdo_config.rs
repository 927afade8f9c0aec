//! PDO configuration shim: exposes RPDO/TPDO channel state as the standard
//! CANopen communication/mapping parameter objects (0x1400-0x17FF for
//! RPDOs, 0x1800-0x1BFF for TPDOs).
//!
//! Generalizes the sub-index decomposition of
//! `zencan-node::pdo::{PdoCommObject, PdoMappingObject}`, but is driven
//! directly by [`crate::Device::read`]/[`crate::Device::write`] rather than
//! through the registry — see `DESIGN.md` for why.

use canopen_common::{Address, Entry, ErrorCode, PdoMapping, Value};

use crate::rpdo::RpdoChannel;
use crate::tpdo::TpdoChannel;

/// Which of the four standard PDO parameter ranges an address falls in, and
/// which channel (0..=3) it addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdoConfigTarget {
    RpdoComm(u8),
    TpdoComm(u8),
    RpdoMapping(u8),
    TpdoMapping(u8),
}

/// Classify `index` as a PDO-configuration address, if it is one.
pub fn classify(index: u16) -> Option<PdoConfigTarget> {
    match index {
        0x1400..=0x1403 => Some(PdoConfigTarget::RpdoComm((index - 0x1400) as u8)),
        0x1600..=0x1603 => Some(PdoConfigTarget::RpdoMapping((index - 0x1600) as u8)),
        0x1800..=0x1803 => Some(PdoConfigTarget::TpdoComm((index - 0x1800) as u8)),
        0x1A00..=0x1A03 => Some(PdoConfigTarget::TpdoMapping((index - 0x1A00) as u8)),
        _ => None,
    }
}

pub fn read_rpdo_comm(ch: &RpdoChannel, sub: u8) -> Result<Value, ErrorCode> {
    match sub {
        0 => Ok(Value::U8(2)),
        1 => {
            let disabled_bit = if ch.active() { 0 } else { 1 << 31 };
            Ok(Value::U32(ch.cob_id() | disabled_bit))
        }
        2 => Ok(Value::U8(0xFF)),
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}

pub fn write_rpdo_comm(
    ch: &mut RpdoChannel,
    sub: u8,
    value: Value,
    node_id: u8,
    n: u8,
    od: &[Entry],
) -> Result<(), ErrorCode> {
    match (sub, value) {
        (1, Value::U32(raw)) => write_cob_id(
            raw,
            node_id,
            n,
            false,
            |cob_id| ch.set_cob_id(cob_id),
            |active| {
                if active {
                    ch.set_active(od)
                } else {
                    ch.set_inactive();
                    Ok(())
                }
            },
        ),
        (0, _) => Err(ErrorCode::WriteOfReadOnlyObject),
        (2, _) => Err(ErrorCode::WriteOfReadOnlyObject),
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}

pub fn read_tpdo_comm(ch: &TpdoChannel, sub: u8) -> Result<Value, ErrorCode> {
    match sub {
        0 => Ok(Value::U8(5)),
        1 => {
            let disabled_bit = if ch.active() { 0 } else { 1 << 31 };
            Ok(Value::U32(ch.cob_id() | disabled_bit))
        }
        2 => Ok(Value::U8(0xFF)),
        3 => Ok(Value::U16((ch.inhibit_time_us() / 100) as u16)),
        5 => Ok(Value::U16((ch.event_timeout_us() / 1000) as u16)),
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}

pub fn write_tpdo_comm(
    ch: &mut TpdoChannel,
    sub: u8,
    value: Value,
    node_id: u8,
    n: u8,
    od: &[Entry],
) -> Result<(), ErrorCode> {
    match (sub, value) {
        (1, Value::U32(raw)) => write_cob_id(
            raw,
            node_id,
            n,
            true,
            |cob_id| ch.set_cob_id(cob_id),
            |active| {
                if active {
                    ch.set_active(od)
                } else {
                    ch.set_inactive();
                    Ok(())
                }
            },
        ),
        (2, Value::U8(0xFF)) => Ok(()),
        (2, _) => Err(ErrorCode::UnsupportedAccess),
        (3, Value::U16(v)) => {
            ch.set_inhibit_time_us(v as u32 * 100);
            Ok(())
        }
        (5, Value::U16(v)) => {
            ch.set_event_timeout_us(v as u32 * 1000);
            Ok(())
        }
        (0, _) | (4, _) => Err(ErrorCode::WriteOfReadOnlyObject),
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}

/// Shared COB-ID write validation: the low 30 bits must equal the default
/// COB-ID for this channel/node; bit 31 selects active/inactive.
fn write_cob_id(
    raw: u32,
    node_id: u8,
    n: u8,
    is_tpdo: bool,
    set_cob_id: impl FnOnce(u32),
    set_active: impl FnOnce(bool) -> Result<(), ErrorCode>,
) -> Result<(), ErrorCode> {
    let requested_id = raw & 0x3FFF_FFFF;
    let default_id = if is_tpdo {
        canopen_common::frame::default_tpdo_cob_id(n, node_id)
    } else {
        canopen_common::frame::default_rpdo_cob_id(n, node_id)
    };
    if requested_id != default_id {
        return Err(ErrorCode::InvalidValue);
    }
    set_cob_id(requested_id);
    let disabled = raw & (1 << 31) != 0;
    set_active(!disabled)
}

pub fn read_rpdo_mapping(ch: &RpdoChannel, sub: u8) -> Result<Value, ErrorCode> {
    if sub == 0 {
        return Ok(Value::U8(ch.mapping_count()));
    }
    if !(1..=8).contains(&sub) {
        return Err(ErrorCode::ObjectDoesNotExist);
    }
    Ok(Value::U32(
        ch.mapping((sub - 1) as usize).unwrap_or_default().to_u32(),
    ))
}

pub fn write_rpdo_mapping(
    ch: &mut RpdoChannel,
    sub: u8,
    value: Value,
    od: &[Entry],
) -> Result<(), ErrorCode> {
    match (sub, value) {
        (0, Value::U8(count)) => ch.set_mapping_count(count, od),
        (s, Value::U32(raw)) if (1..=8).contains(&s) => {
            ch.set_mapping((s - 1) as usize, PdoMapping::from_u32(raw), od)
        }
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}

pub fn read_tpdo_mapping(ch: &TpdoChannel, sub: u8) -> Result<Value, ErrorCode> {
    if sub == 0 {
        return Ok(Value::U8(ch.mapping_count()));
    }
    if !(1..=8).contains(&sub) {
        return Err(ErrorCode::ObjectDoesNotExist);
    }
    Ok(Value::U32(
        ch.mapping((sub - 1) as usize).unwrap_or_default().to_u32(),
    ))
}

pub fn write_tpdo_mapping(
    ch: &mut TpdoChannel,
    sub: u8,
    value: Value,
    od: &[Entry],
) -> Result<(), ErrorCode> {
    match (sub, value) {
        (0, Value::U8(count)) => ch.set_mapping_count(count, od),
        (s, Value::U32(raw)) if (1..=8).contains(&s) => {
            ch.set_mapping((s - 1) as usize, PdoMapping::from_u32(raw), od)
        }
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}

/// The OD address of the COB-ID sub-index for RPDO/TPDO channel `n`, used by
/// [`crate::Device`] to find the target channel when dispatching a PDO
/// configuration write.
pub const fn rpdo_comm_address(n: u8) -> Address {
    Address::new(0x1400 + n as u16, 1)
}

pub const fn tpdo_comm_address(n: u8) -> Address {
    Address::new(0x1800 + n as u16, 1)
}
