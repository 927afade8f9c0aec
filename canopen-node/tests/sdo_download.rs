//! Scenario: an SDO expedited download writes through to the installed
//! write handler, and a subsequent upload observes the new value.

use std::sync::atomic::{AtomicU32, Ordering};

use canopen_common::{AccessType, Address, DataType, Entry, ErrorCode, Frame, NodeId};
use canopen_node::{Device, HandlerRegistry, ReadSlot, WriteSlot};

static VALUE: AtomicU32 = AtomicU32::new(0);

fn read_value() -> u32 {
    VALUE.load(Ordering::Relaxed)
}

fn write_value(v: u32) -> ErrorCode {
    VALUE.store(v, Ordering::Relaxed);
    ErrorCode::NoError
}

const OD: [Entry; 1] = [Entry::new(
    Address::new(0x2002, 0),
    DataType::U32,
    AccessType::Rw,
    false,
)];

#[test]
fn downloads_then_uploads_new_value() {
    let mut registry: HandlerRegistry<1, 1> = HandlerRegistry::new();
    registry.build(&OD).unwrap();
    registry
        .set_read_handler(Address::new(0x2002, 0), ReadSlot::U32(read_value), &OD)
        .unwrap();
    registry
        .set_write_handler(Address::new(0x2002, 0), WriteSlot::U32(write_value), &OD)
        .unwrap();

    let mut device: Device<1, 1> = Device::new(NodeId::new(5).unwrap(), &OD, registry).unwrap();

    let download = Frame::new(0x605, &[0x23, 0x02, 0x20, 0x00, 0xEF, 0xBE, 0xAD, 0xDE]);
    let mut responses = Vec::new();
    device.process_message(&download, &mut |f| responses.push(f));

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].id, 0x585);
    assert_eq!(
        responses[0].data(),
        &[0x60, 0x02, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00]
    );
    assert_eq!(VALUE.load(Ordering::Relaxed), 0xDEAD_BEEF);

    let upload = Frame::new(0x605, &[0x40, 0x02, 0x20, 0x00, 0, 0, 0, 0]);
    responses.clear();
    device.process_message(&upload, &mut |f| responses.push(f));

    assert_eq!(responses.len(), 1);
    assert_eq!(
        responses[0].data(),
        &[0x43, 0x02, 0x20, 0x00, 0xEF, 0xBE, 0xAD, 0xDE]
    );
}
