//! RPDO (received process data object) decode engine.
//!
//! Generalizes the mapping-array shape of `zencan-node::pdo::Pdo` into a
//! channel that validates its mappings against the Object Dictionary up
//! front, then decodes matching frames with no further OD lookups on the
//! hot path.

use canopen_common::{Address, DataType, Entry, ErrorCode, Frame, PdoMapping, Value};
use heapless::Vec;

const MAX_MAPPINGS: usize = 8;

/// A single RPDO channel: up to 8 byte-aligned mappings decoded from one
/// CAN identifier.
#[derive(Debug, Clone, Copy)]
pub struct RpdoChannel {
    cob_id: u32,
    active: bool,
    mapping_count: u8,
    mappings: [PdoMapping; MAX_MAPPINGS],
    resolved_types: [DataType; MAX_MAPPINGS],
}

impl RpdoChannel {
    pub const fn new(default_cob_id: u32) -> Self {
        RpdoChannel {
            cob_id: default_cob_id,
            active: false,
            mapping_count: 0,
            mappings: [PdoMapping::new(Address::new(0, 0), 0); MAX_MAPPINGS],
            resolved_types: [DataType::Empty; MAX_MAPPINGS],
        }
    }

    pub const fn cob_id(&self) -> u32 {
        self.cob_id
    }

    pub const fn active(&self) -> bool {
        self.active
    }

    pub const fn mapping_count(&self) -> u8 {
        self.mapping_count
    }

    pub fn mapping(&self, i: usize) -> Option<PdoMapping> {
        if i < self.mapping_count as usize {
            Some(self.mappings[i])
        } else {
            None
        }
    }

    pub fn set_cob_id(&mut self, cob_id: u32) {
        self.cob_id = cob_id;
    }

    /// Validate one mapping slot against `od` without touching the mapping
    /// count. Rejected while the channel is [`Self::active`].
    pub fn set_mapping(
        &mut self,
        i: usize,
        mapping: PdoMapping,
        od: &[Entry],
    ) -> Result<(), ErrorCode> {
        if self.active {
            return Err(ErrorCode::UnsupportedAccess);
        }
        if i >= MAX_MAPPINGS {
            return Err(ErrorCode::MappingsExceedPdoLength);
        }
        let entry = validate_mapping(mapping, od, |e| e.is_rpdo_mappable())?;
        self.mappings[i] = mapping;
        self.resolved_types[i] = entry;
        Ok(())
    }

    /// Set how many of the populated mapping slots are active, re-validating
    /// each against `od`. Rejected while the channel is active.
    pub fn set_mapping_count(&mut self, count: u8, od: &[Entry]) -> Result<(), ErrorCode> {
        if self.active {
            return Err(ErrorCode::UnsupportedAccess);
        }
        if count as usize > MAX_MAPPINGS {
            return Err(ErrorCode::MappingsExceedPdoLength);
        }
        let mut total_bits: u32 = 0;
        for i in 0..count as usize {
            let entry = validate_mapping(self.mappings[i], od, |e| e.is_rpdo_mappable())?;
            self.resolved_types[i] = entry;
            total_bits += self.mappings[i].bit_length as u32;
        }
        if total_bits > 64 {
            return Err(ErrorCode::MappingsExceedPdoLength);
        }
        self.mapping_count = count;
        Ok(())
    }

    /// Activate the channel, re-validating every populated mapping.
    pub fn set_active(&mut self, od: &[Entry]) -> Result<(), ErrorCode> {
        let mut total_bits: u32 = 0;
        for i in 0..self.mapping_count as usize {
            let entry = validate_mapping(self.mappings[i], od, |e| e.is_rpdo_mappable())?;
            self.resolved_types[i] = entry;
            total_bits += self.mappings[i].bit_length as u32;
        }
        if total_bits > 64 {
            return Err(ErrorCode::MappingsExceedPdoLength);
        }
        self.active = true;
        Ok(())
    }

    pub fn set_inactive(&mut self) {
        self.active = false;
    }

    /// Decode `frame` into `(address, value)` pairs if it matches this
    /// channel's COB-ID and all mappings fit within the received length.
    /// Returns `None` for any mismatch (dropped silently per CANopen
    /// convention, not surfaced as an error).
    pub fn decode(&self, frame: &Frame) -> Option<Vec<(Address, Value), MAX_MAPPINGS>> {
        if !self.active || self.mapping_count == 0 || frame.id != self.cob_id {
            return None;
        }
        let total_len: usize = (0..self.mapping_count as usize)
            .map(|i| self.mappings[i].bit_length as usize / 8)
            .sum();
        if total_len > frame.len as usize {
            return None;
        }
        let data = frame.data();
        let mut out = Vec::new();
        let mut offset = 0usize;
        for i in 0..self.mapping_count as usize {
            let ty = self.resolved_types[i];
            let size = ty.size();
            let value = Value::from_bytes(ty, &data[offset..offset + size]);
            offset += size;
            // Capacity is bounded by MAX_MAPPINGS so this cannot fail.
            let _ = out.push((self.mappings[i].address, value));
        }
        Some(out)
    }
}

fn validate_mapping(
    mapping: PdoMapping,
    od: &[Entry],
    mappable: impl Fn(&Entry) -> bool,
) -> Result<DataType, ErrorCode> {
    let entry = od
        .iter()
        .find(|e| e.address == mapping.address)
        .ok_or(ErrorCode::ObjectDoesNotExist)?;
    if !mappable(entry) {
        return Err(ErrorCode::PdoMappingError);
    }
    if !mapping.matches_data_type(entry.data_type) {
        return Err(ErrorCode::PdoMappingError);
    }
    Ok(entry.data_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopen_common::AccessType;

    const OD: [Entry; 1] = [Entry::new(
        Address::new(0x2100, 0),
        DataType::U16,
        AccessType::RwRpdo,
        true,
    )];

    #[test]
    fn decodes_mapped_value() {
        let mut ch = RpdoChannel::new(0x205);
        ch.set_mapping(0, PdoMapping::new(Address::new(0x2100, 0), 16), &OD)
            .unwrap();
        ch.set_mapping_count(1, &OD).unwrap();
        ch.set_active(&OD).unwrap();

        let frame = Frame::new(0x205, &[0x34, 0x12]);
        let decoded = ch.decode(&frame).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], (Address::new(0x2100, 0), Value::U16(0x1234)));
    }

    #[test]
    fn drops_frame_with_wrong_cob_id() {
        let mut ch = RpdoChannel::new(0x205);
        ch.set_mapping(0, PdoMapping::new(Address::new(0x2100, 0), 16), &OD)
            .unwrap();
        ch.set_mapping_count(1, &OD).unwrap();
        ch.set_active(&OD).unwrap();

        let frame = Frame::new(0x206, &[0x34, 0x12]);
        assert!(ch.decode(&frame).is_none());
    }

    #[test]
    fn rejects_mapping_change_while_active() {
        let mut ch = RpdoChannel::new(0x205);
        ch.set_mapping_count(0, &OD).unwrap();
        ch.set_active(&OD).unwrap();
        assert_eq!(
            ch.set_mapping(0, PdoMapping::new(Address::new(0x2100, 0), 16), &OD),
            Err(ErrorCode::UnsupportedAccess)
        );
    }
}
