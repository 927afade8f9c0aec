//! Scenario: configuring TPDO0 entirely through SDO writes to its
//! communication/mapping parameters, then driving it via `set_value_changed`
//! and `update`.

use std::sync::atomic::{AtomicU32, Ordering};

use canopen_common::{AccessType, Address, DataType, Entry, ErrorCode, Frame, NodeId};
use canopen_node::{Device, HandlerRegistry, ReadSlot, WriteSlot};

static VALUE: AtomicU32 = AtomicU32::new(0xDEAD_BEEF);

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
    AccessType::RwTpdo,
    true,
)];

/// Build an expedited-shaped download frame. The PDO-configuration
/// addresses ignore the command byte's declared size and instead fix the
/// width by sub-index, so a full 4-byte payload works for every sub-index.
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
fn emits_once_on_value_change_then_stays_quiet() {
    let mut registry: HandlerRegistry<1, 1> = HandlerRegistry::new();
    registry.build(&OD).unwrap();
    registry
        .set_read_handler(Address::new(0x2002, 0), ReadSlot::U32(read_value), &OD)
        .unwrap();
    registry
        .set_write_handler(Address::new(0x2002, 0), WriteSlot::U32(write_value), &OD)
        .unwrap();

    let mut device: Device<1, 1> = Device::new(NodeId::new(5).unwrap(), &OD, registry).unwrap();

    // Mapping count to 0, then install mapping slot 0, then raise the count
    // to 1 (mirrors how a real SDO client configures a PDO: clear, fill,
    // re-enable the count).
    send_and_discard(&mut device, &download(0x1A00, 0, [0, 0, 0, 0]));
    let mapping = canopen_common::PdoMapping::new(Address::new(0x2002, 0), 32).to_u32();
    send_and_discard(&mut device, &download(0x1A00, 1, mapping.to_le_bytes()));
    send_and_discard(&mut device, &download(0x1A00, 0, [1, 0, 0, 0]));

    // Event timer: 500ms.
    send_and_discard(&mut device, &download(0x1800, 5, u16_payload(500)));

    // Enable the channel with its default COB-ID (0x185 for TPDO0/node 5).
    send_and_discard(&mut device, &download(0x1800, 1, 0x185u32.to_le_bytes()));
    assert!(device.tpdo(0).active());

    device.set_value_changed(Address::new(0x2002, 0));

    // `update` at t=0 would never be due: the inhibit/event checks require
    // strictly elapsed time past the channel's zero-initialized last-sent
    // timestamp, so the first observation must be at a later tick.
    let mut frames = Vec::new();
    device.update(1, &mut |f| frames.push(f));
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].id, 0x185);
    assert_eq!(frames[0].data(), &0xDEAD_BEEFu32.to_le_bytes());

    // Immediately after, nothing new is due.
    frames.clear();
    device.update(2, &mut |f| frames.push(f));
    assert!(frames.is_empty());
}

fn u16_payload(v: u16) -> [u8; 4] {
    let b = v.to_le_bytes();
    [b[0], b[1], 0, 0]
}
