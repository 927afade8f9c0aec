//! Scenario: configuring RPDO0 through SDO writes to its communication and
//! mapping parameters, then feeding a matching data frame through
//! `process_message` and observing the write handler fire.

use std::sync::atomic::{AtomicU32, Ordering};

use canopen_common::{AccessType, Address, DataType, Entry, ErrorCode, Frame, NodeId};
use canopen_node::{Device, HandlerRegistry, ReadSlot, WriteSlot};

static VALUE: AtomicU32 = AtomicU32::new(0);

fn read_value() -> u16 {
    VALUE.load(Ordering::Relaxed) as u16
}

fn write_value(v: u16) -> ErrorCode {
    VALUE.store(v as u32, Ordering::Relaxed);
    ErrorCode::NoError
}

const OD: [Entry; 1] = [Entry::new(
    Address::new(0x2100, 0),
    DataType::U16,
    AccessType::RwRpdo,
    true,
)];

fn download(index: u16, sub: u8, payload: [u8; 4]) -> Frame {
    let mut data = [0u8; 8];
    data[0] = 0x23;
    data[1..3].copy_from_slice(&index.to_le_bytes());
    data[3] = sub;
    data[4..8].copy_from_slice(&payload);
    Frame::new(0x605, &data)
}

fn send_and_discard(device: &mut Device<1, 1>, frame: &Frame) {
    let mut responses = Vec::new();
    device.process_message(frame, &mut |f| responses.push(f));
    assert_eq!(responses.len(), 1, "expected exactly one SDO response");
    assert_eq!(responses[0].data()[0] & 0x80, 0, "unexpected SDO abort");
}

#[test]
fn decodes_rpdo_frame_into_write_handler() {
    let mut registry: HandlerRegistry<1, 1> = HandlerRegistry::new();
    registry.build(&OD).unwrap();
    registry
        .set_read_handler(Address::new(0x2100, 0), ReadSlot::U16(read_value), &OD)
        .unwrap();
    registry
        .set_write_handler(Address::new(0x2100, 0), WriteSlot::U16(write_value), &OD)
        .unwrap();

    let mut device: Device<1, 1> = Device::new(NodeId::new(5).unwrap(), &OD, registry).unwrap();

    send_and_discard(&mut device, &download(0x1600, 0, [0, 0, 0, 0]));
    let mapping = canopen_common::PdoMapping::new(Address::new(0x2100, 0), 16).to_u32();
    send_and_discard(&mut device, &download(0x1600, 1, mapping.to_le_bytes()));
    send_and_discard(&mut device, &download(0x1600, 0, [1, 0, 0, 0]));
    // Enable with the default COB-ID (0x205 for RPDO0/node 5).
    send_and_discard(&mut device, &download(0x1400, 1, 0x205u32.to_le_bytes()));
    assert!(device.rpdo(0).active());

    let rpdo_frame = Frame::new(0x205, &[0x34, 0x12]);
    let mut responses = Vec::new();
    device.process_message(&rpdo_frame, &mut |f| responses.push(f));

    assert!(responses.is_empty(), "an RPDO frame produces no response");
    assert_eq!(VALUE.load(Ordering::Relaxed), 0x1234);
}
