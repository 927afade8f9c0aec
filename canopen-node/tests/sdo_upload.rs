//! Scenario: an SDO expedited upload of a U32 object returns the value the
//! installed read handler reports, framed per CiA 301 expedited upload.

use std::sync::atomic::{AtomicU32, Ordering};

use canopen_common::{AccessType, Address, DataType, Entry, Frame, NodeId};
use canopen_node::{Device, HandlerRegistry, ReadSlot, WriteSlot};

static VALUE: AtomicU32 = AtomicU32::new(42);

fn read_value() -> u32 {
    VALUE.load(Ordering::Relaxed)
}

fn write_value(v: u32) -> canopen_common::ErrorCode {
    VALUE.store(v, Ordering::Relaxed);
    canopen_common::ErrorCode::NoError
}

const OD: [Entry; 1] = [Entry::new(
    Address::new(0x2002, 0),
    DataType::U32,
    AccessType::Rw,
    false,
)];

#[test]
fn uploads_u32_value() {
    let mut registry: HandlerRegistry<1, 1> = HandlerRegistry::new();
    registry.build(&OD).unwrap();
    registry
        .set_read_handler(Address::new(0x2002, 0), ReadSlot::U32(read_value), &OD)
        .unwrap();
    registry
        .set_write_handler(Address::new(0x2002, 0), WriteSlot::U32(write_value), &OD)
        .unwrap();

    let mut device: Device<1, 1> = Device::new(NodeId::new(5).unwrap(), &OD, registry).unwrap();

    let request = Frame::new(0x605, &[0x40, 0x02, 0x20, 0x00, 0, 0, 0, 0]);
    let mut responses = Vec::new();
    device.process_message(&request, &mut |f| responses.push(f));

    assert_eq!(responses.len(), 1);
    let resp = &responses[0];
    assert_eq!(resp.id, 0x585);
    assert_eq!(
        resp.data(),
        &[0x43, 0x02, 0x20, 0x00, 0x2A, 0x00, 0x00, 0x00]
    );
}
