//! The device façade: owns the handler registry, the SDO server, and the 4
//! RPDO / 4 TPDO channels, and routes inbound frames and periodic ticks.
//!
//! Unlike `zencan-node::node::Node`, which is reached through `'static`
//! references from a process-wide singleton, `Device` is a plain value the
//! host owns and mutates through `&mut self` — see `DESIGN.md`.

use canopen_common::{frame, Address, Entry, ErrorCode, Frame, NodeId, Value};
use defmt_or_log::{debug, info};

use crate::pdo_config::{self, PdoConfigTarget};
use crate::registry::{call_read, call_write, HandlerRegistry, RegistrationError};
use crate::rpdo::RpdoChannel;
use crate::sdo::{self, SdoRequest, SdoServer};
use crate::tpdo::TpdoChannel;

const N_PDO: usize = 4;

/// Error constructing a [`Device`]: the handler registry doesn't cover every
/// readable/writable Object Dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceBuildError {
    IncompleteHandlers(RegistrationError),
}

impl From<RegistrationError> for DeviceBuildError {
    fn from(value: RegistrationError) -> Self {
        DeviceBuildError::IncompleteHandlers(value)
    }
}

/// The device-side CANopen protocol core.
///
/// `R`/`W` are the handler registry's read/write slot capacities — see
/// [`HandlerRegistry`]. `od` MUST be sorted by [`Address`]; it is searched
/// with binary search on every dispatch.
pub struct Device<'od, const R: usize, const W: usize> {
    node_id: u8,
    od: &'od [Entry],
    registry: HandlerRegistry<R, W>,
    sdo: SdoServer,
    rpdos: [RpdoChannel; N_PDO],
    tpdos: [TpdoChannel; N_PDO],
}

impl<'od, const R: usize, const W: usize> Device<'od, R, W> {
    /// Build a new device for `node_id` over the build-time OD table `od`,
    /// with handlers already installed in `registry`.
    ///
    /// Rejects `registry` if it doesn't have a non-empty handler for every
    /// readable/writable entry in `od` — an incomplete handler table is a
    /// programmer error, caught here rather than surfaced at runtime.
    pub fn new(
        node_id: NodeId,
        od: &'od [Entry],
        registry: HandlerRegistry<R, W>,
    ) -> Result<Self, DeviceBuildError> {
        registry.check_complete()?;
        let node_id = node_id.raw();
        info!("starting CANopen device with node id {}", node_id);

        let rpdos = [
            RpdoChannel::new(frame::default_rpdo_cob_id(0, node_id)),
            RpdoChannel::new(frame::default_rpdo_cob_id(1, node_id)),
            RpdoChannel::new(frame::default_rpdo_cob_id(2, node_id)),
            RpdoChannel::new(frame::default_rpdo_cob_id(3, node_id)),
        ];
        let tpdos = [
            TpdoChannel::new(frame::default_tpdo_cob_id(0, node_id)),
            TpdoChannel::new(frame::default_tpdo_cob_id(1, node_id)),
            TpdoChannel::new(frame::default_tpdo_cob_id(2, node_id)),
            TpdoChannel::new(frame::default_tpdo_cob_id(3, node_id)),
        ];

        Ok(Device {
            node_id,
            od,
            registry,
            sdo: SdoServer::new(),
            rpdos,
            tpdos,
        })
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    /// Handle one inbound CAN frame: route it to every RPDO channel and to
    /// the SDO server. `send` is invoked inline with any response frame
    /// produced (SDO upload/download/abort).
    pub fn process_message(&mut self, frame: &Frame, send: &mut dyn FnMut(Frame)) {
        if frame.extended || frame.id & 0x7F != self.node_id as u32 {
            return;
        }

        for i in 0..N_PDO {
            if let Some(writes) = self.rpdos[i].decode(frame) {
                for (addr, value) in writes.iter() {
                    let _ = self.write_value(*addr, *value);
                }
            }
        }

        let Some((response_id, request)) = self.sdo.decode(frame, self.node_id) else {
            return;
        };

        let resp = match request {
            SdoRequest::Upload { address } => {
                match read_dispatch(self.od, &self.registry, &self.rpdos, &self.tpdos, address) {
                    Ok(value) => sdo::upload_response(response_id, address, value),
                    Err(e) => sdo::abort_frame(response_id, address, e),
                }
            }
            SdoRequest::Download {
                address,
                data,
                declared_size,
            } => {
                let result = write_dispatch(
                    self.od,
                    &self.registry,
                    &mut self.rpdos,
                    &mut self.tpdos,
                    self.node_id,
                    address,
                    &data,
                    declared_size,
                );
                match result {
                    Ok(()) => {
                        self.set_value_changed(address);
                        sdo::download_response(response_id, address)
                    }
                    Err(e) => sdo::abort_frame(response_id, address, e),
                }
            }
            SdoRequest::Unsupported { address } => {
                sdo::abort_frame(response_id, address, ErrorCode::UnsupportedAccess)
            }
        };
        debug!("SDO response id={:#x} len={}", resp.id, resp.len);
        send(resp);
    }

    /// Drive periodic TPDO transmission. Should be called regularly by the
    /// host with a non-decreasing `now_us`.
    pub fn update(&mut self, now_us: u64, send: &mut dyn FnMut(Frame)) {
        let od = self.od;
        let registry = &self.registry;
        for tpdo in self.tpdos.iter_mut() {
            if let Some(frame) = tpdo.next_message(now_us, |addr| read_only_dispatch(od, registry, addr)) {
                send(frame);
            }
        }
    }

    /// Notify the device that `addr`'s value changed, so event-driven TPDOs
    /// mapping it become eligible to transmit on the next [`Self::update`].
    pub fn set_value_changed(&mut self, addr: Address) {
        for tpdo in self.tpdos.iter_mut() {
            if tpdo.active() && tpdo.maps(addr) {
                tpdo.set_value_updated();
            }
        }
    }

    /// Fan a SYNC observation out to every TPDO channel in
    /// [`crate::tpdo::TransmitMode::OnSync`].
    pub fn sync(&mut self) {
        for tpdo in self.tpdos.iter_mut() {
            tpdo.sync();
        }
    }

    pub fn rpdo(&self, n: usize) -> &RpdoChannel {
        &self.rpdos[n]
    }

    pub fn rpdo_mut(&mut self, n: usize) -> &mut RpdoChannel {
        &mut self.rpdos[n]
    }

    pub fn tpdo(&self, n: usize) -> &TpdoChannel {
        &self.tpdos[n]
    }

    pub fn tpdo_mut(&mut self, n: usize) -> &mut TpdoChannel {
        &mut self.tpdos[n]
    }

    /// Read an OD value directly (not via the wire). Exposed for
    /// application/test code; the SDO path uses the byte-oriented
    /// `read_dispatch` free function instead.
    pub fn read(&self, addr: Address) -> Result<Value, ErrorCode> {
        read_dispatch(self.od, &self.registry, &self.rpdos, &self.tpdos, addr)
    }

    /// Write an already-decoded value to `addr`, as an RPDO decode does.
    fn write_value(&mut self, addr: Address, value: Value) -> Result<(), ErrorCode> {
        match pdo_config::classify(addr.index) {
            Some(PdoConfigTarget::RpdoComm(n)) => pdo_config::write_rpdo_comm(
                &mut self.rpdos[n as usize],
                addr.subindex,
                value,
                self.node_id,
                n,
                self.od,
            ),
            Some(PdoConfigTarget::TpdoComm(n)) => pdo_config::write_tpdo_comm(
                &mut self.tpdos[n as usize],
                addr.subindex,
                value,
                self.node_id,
                n,
                self.od,
            ),
            Some(PdoConfigTarget::RpdoMapping(n)) => {
                pdo_config::write_rpdo_mapping(&mut self.rpdos[n as usize], addr.subindex, value, self.od)
            }
            Some(PdoConfigTarget::TpdoMapping(n)) => {
                pdo_config::write_tpdo_mapping(&mut self.tpdos[n as usize], addr.subindex, value, self.od)
            }
            None => {
                let entry = find_entry(self.od, addr).ok_or(ErrorCode::ObjectDoesNotExist)?;
                if !entry.access_type.is_writable() {
                    return Err(ErrorCode::WriteOfReadOnlyObject);
                }
                let slot = self
                    .registry
                    .lookup_write(addr)
                    .ok_or(ErrorCode::ObjectDoesNotExist)?;
                if value.data_type() as u8 != slot.data_type() as u8 {
                    return Err(ErrorCode::GeneralError);
                }
                let code = call_write(slot, value);
                if code == ErrorCode::NoError {
                    self.set_value_changed(addr);
                    Ok(())
                } else {
                    Err(code)
                }
            }
        }
    }
}

fn find_entry(od: &[Entry], addr: Address) -> Option<Entry> {
    od.binary_search_by_key(&addr, |e| e.address).ok().map(|i| od[i])
}

fn read_dispatch<const R: usize, const W: usize>(
    od: &[Entry],
    registry: &HandlerRegistry<R, W>,
    rpdos: &[RpdoChannel; N_PDO],
    tpdos: &[TpdoChannel; N_PDO],
    addr: Address,
) -> Result<Value, ErrorCode> {
    match pdo_config::classify(addr.index) {
        Some(PdoConfigTarget::RpdoComm(n)) => pdo_config::read_rpdo_comm(&rpdos[n as usize], addr.subindex),
        Some(PdoConfigTarget::TpdoComm(n)) => pdo_config::read_tpdo_comm(&tpdos[n as usize], addr.subindex),
        Some(PdoConfigTarget::RpdoMapping(n)) => {
            pdo_config::read_rpdo_mapping(&rpdos[n as usize], addr.subindex)
        }
        Some(PdoConfigTarget::TpdoMapping(n)) => {
            pdo_config::read_tpdo_mapping(&tpdos[n as usize], addr.subindex)
        }
        None => read_only_dispatch(od, registry, addr),
    }
}

/// Read a registry-backed (non-PDO-configuration) OD entry.
fn read_only_dispatch<const R: usize, const W: usize>(
    od: &[Entry],
    registry: &HandlerRegistry<R, W>,
    addr: Address,
) -> Result<Value, ErrorCode> {
    let entry = find_entry(od, addr).ok_or(ErrorCode::ObjectDoesNotExist)?;
    if !entry.access_type.is_readable() {
        return Err(ErrorCode::ReadOfWriteOnlyObject);
    }
    let slot = registry.lookup_read(addr).ok_or(ErrorCode::ObjectDoesNotExist)?;
    Ok(call_read(slot))
}

#[allow(clippy::too_many_arguments)]
fn write_dispatch<const R: usize, const W: usize>(
    od: &[Entry],
    registry: &HandlerRegistry<R, W>,
    rpdos: &mut [RpdoChannel; N_PDO],
    tpdos: &mut [TpdoChannel; N_PDO],
    node_id: u8,
    addr: Address,
    data: &[u8],
    declared_size: Option<usize>,
) -> Result<(), ErrorCode> {
    match pdo_config::classify(addr.index) {
        Some(PdoConfigTarget::RpdoComm(n)) => {
            let value = decode_config_value(addr, data)?;
            pdo_config::write_rpdo_comm(&mut rpdos[n as usize], addr.subindex, value, node_id, n, od)
        }
        Some(PdoConfigTarget::TpdoComm(n)) => {
            let value = decode_config_value(addr, data)?;
            pdo_config::write_tpdo_comm(&mut tpdos[n as usize], addr.subindex, value, node_id, n, od)
        }
        Some(PdoConfigTarget::RpdoMapping(n)) => {
            let value = decode_mapping_value(addr, data)?;
            pdo_config::write_rpdo_mapping(&mut rpdos[n as usize], addr.subindex, value, od)
        }
        Some(PdoConfigTarget::TpdoMapping(n)) => {
            let value = decode_mapping_value(addr, data)?;
            pdo_config::write_tpdo_mapping(&mut tpdos[n as usize], addr.subindex, value, od)
        }
        None => {
            let entry = find_entry(od, addr).ok_or(ErrorCode::ObjectDoesNotExist)?;
            if !entry.access_type.is_writable() {
                return Err(ErrorCode::WriteOfReadOnlyObject);
            }
            if let Some(size) = declared_size {
                if size != entry.data_type.size() {
                    return Err(ErrorCode::UnsupportedAccess);
                }
            }
            if data.len() < entry.data_type.size() {
                return Err(ErrorCode::UnsupportedAccess);
            }
            let value = Value::from_bytes(entry.data_type, data);
            let slot = registry.lookup_write(addr).ok_or(ErrorCode::ObjectDoesNotExist)?;
            let code = call_write(slot, value);
            if code == ErrorCode::NoError {
                Ok(())
            } else {
                Err(code)
            }
        }
    }
}

/// Decode the fixed-width value expected at a PDO communication parameter
/// sub-index (sub 1 is u32, sub 2 is u8, subs 3/5 are u16) directly from the
/// SDO payload, since these addresses have no registry-backed [`Entry`].
fn decode_config_value(addr: Address, data: &[u8]) -> Result<Value, ErrorCode> {
    match addr.subindex {
        0 | 2 => Ok(Value::U8(data[0])),
        1 => Ok(Value::U32(u32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        3 | 5 => Ok(Value::U16(u16::from_le_bytes([data[0], data[1]]))),
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}

fn decode_mapping_value(addr: Address, data: &[u8]) -> Result<Value, ErrorCode> {
    match addr.subindex {
        0 => Ok(Value::U8(data[0])),
        1..=8 => Ok(Value::U32(u32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        _ => Err(ErrorCode::ObjectDoesNotExist),
    }
}
