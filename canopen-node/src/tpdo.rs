//! TPDO (transmitted process data object) encode/scheduling engine.
//!
//! Mirrors the mapping-array shape of [`crate::rpdo::RpdoChannel`], adding
//! the inhibit-time/event-timer scheduling policy that
//! `zencan-node::node::process()` applies to its `Pdo` values on every tick.

use canopen_common::{Address, DataType, Entry, ErrorCode, Frame, PdoMapping, Value};

const MAX_MAPPINGS: usize = 8;

/// When a TPDO channel is eligible to transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitMode {
    /// Transmit once per `Device::sync()` call, if armed.
    OnSync,
    /// Transmit when a mapped value changes (subject to inhibit time) or
    /// when the event timer elapses.
    OnEvent,
}

/// A single TPDO channel.
#[derive(Debug, Clone, Copy)]
pub struct TpdoChannel {
    cob_id: u32,
    active: bool,
    mapping_count: u8,
    mappings: [PdoMapping; MAX_MAPPINGS],
    resolved_types: [DataType; MAX_MAPPINGS],
    transmit_mode: TransmitMode,
    /// Microseconds; 0 disables the event timer.
    event_timeout_us: u32,
    /// Microseconds.
    inhibit_time_us: u32,
    last_sent_us: u64,
    updated: bool,
    sync_pending: bool,
}

impl TpdoChannel {
    pub const fn new(default_cob_id: u32) -> Self {
        TpdoChannel {
            cob_id: default_cob_id,
            active: false,
            mapping_count: 0,
            mappings: [PdoMapping::new(Address::new(0, 0), 0); MAX_MAPPINGS],
            resolved_types: [DataType::Empty; MAX_MAPPINGS],
            transmit_mode: TransmitMode::OnEvent,
            event_timeout_us: 0,
            inhibit_time_us: 0,
            last_sent_us: 0,
            updated: false,
            sync_pending: false,
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

    pub const fn transmit_mode(&self) -> TransmitMode {
        self.transmit_mode
    }

    pub const fn inhibit_time_us(&self) -> u32 {
        self.inhibit_time_us
    }

    pub const fn event_timeout_us(&self) -> u32 {
        self.event_timeout_us
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

    pub fn set_transmit_mode(&mut self, mode: TransmitMode) {
        self.transmit_mode = mode;
    }

    pub fn set_inhibit_time_us(&mut self, value: u32) {
        self.inhibit_time_us = value;
    }

    pub fn set_event_timeout_us(&mut self, value: u32) {
        self.event_timeout_us = value;
    }

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
        let entry = validate_mapping(mapping, od)?;
        self.mappings[i] = mapping;
        self.resolved_types[i] = entry;
        Ok(())
    }

    pub fn set_mapping_count(&mut self, count: u8, od: &[Entry]) -> Result<(), ErrorCode> {
        if self.active {
            return Err(ErrorCode::UnsupportedAccess);
        }
        if count as usize > MAX_MAPPINGS {
            return Err(ErrorCode::MappingsExceedPdoLength);
        }
        let mut total_bits: u32 = 0;
        for i in 0..count as usize {
            let entry = validate_mapping(self.mappings[i], od)?;
            self.resolved_types[i] = entry;
            total_bits += self.mappings[i].bit_length as u32;
        }
        if total_bits > 64 {
            return Err(ErrorCode::MappingsExceedPdoLength);
        }
        self.mapping_count = count;
        Ok(())
    }

    pub fn set_active(&mut self, od: &[Entry]) -> Result<(), ErrorCode> {
        let mut total_bits: u32 = 0;
        for i in 0..self.mapping_count as usize {
            let entry = validate_mapping(self.mappings[i], od)?;
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

    /// Mark that a mapped value changed. Has no effect unless
    /// [`TransmitMode::OnEvent`].
    pub fn set_value_updated(&mut self) {
        self.updated = true;
    }

    /// Returns true if `addr` is one of this channel's populated mappings.
    pub fn maps(&self, addr: Address) -> bool {
        self.mappings[0..self.mapping_count as usize]
            .iter()
            .any(|m| m.address == addr)
    }

    /// Arm this channel for the next `update` call, consumed by a SYNC
    /// observation. Has no effect unless [`TransmitMode::OnSync`].
    pub fn sync(&mut self) {
        self.sync_pending = true;
    }

    /// Consider emitting a frame at time `now_us`, reading mapped values via
    /// `read`. Returns `None` if inactive, not yet due, or if any mapped
    /// read fails (in which case the channel's schedule is left untouched so
    /// the next call retries).
    pub fn next_message(
        &mut self,
        now_us: u64,
        read: impl Fn(Address) -> Result<Value, ErrorCode>,
    ) -> Option<Frame> {
        if !self.active {
            return None;
        }
        let inhibit_elapsed = now_us.saturating_sub(self.last_sent_us) > self.inhibit_time_us as u64;
        if !inhibit_elapsed {
            return None;
        }

        let due = match self.transmit_mode {
            TransmitMode::OnSync => self.sync_pending,
            TransmitMode::OnEvent => {
                self.updated
                    || (self.event_timeout_us > 0
                        && now_us.saturating_sub(self.last_sent_us) > self.event_timeout_us as u64)
            }
        };
        if !due {
            return None;
        }

        let mut data = [0u8; 8];
        let mut offset = 0usize;
        for i in 0..self.mapping_count as usize {
            let value = read(self.mappings[i].address).ok()?;
            let size = value.size();
            let mut buf = [0u8; 8];
            value.to_bytes(&mut buf);
            data[offset..offset + size].copy_from_slice(&buf[0..size]);
            offset += size;
        }

        self.updated = false;
        self.sync_pending = false;
        self.last_sent_us = now_us;
        Some(Frame::new(self.cob_id, &data[0..offset]))
    }
}

fn validate_mapping(mapping: PdoMapping, od: &[Entry]) -> Result<DataType, ErrorCode> {
    let entry = od
        .iter()
        .find(|e| e.address == mapping.address)
        .ok_or(ErrorCode::ObjectDoesNotExist)?;
    if !entry.is_tpdo_mappable() {
        return Err(ErrorCode::PdoMappingError);
    }
    if !mapping.matches_data_type(entry.data_type) {
        return Err(ErrorCode::PdoMappingError);
    }
    Ok(entry.data_type)
}
