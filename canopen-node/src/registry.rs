//! Typed dispatch table mapping Object Dictionary addresses to application
//! read/write handlers.
//!
//! Generalizes `zencan-common::objects::CallbackObject`'s function-pointer
//! callback shape into a typed tagged union keyed by [`DataType`], with no
//! `Any`-erased context pointer: a handler is a plain `fn`, and any state it
//! needs is the application's own to manage (typically a `'static` with
//! interior mutability, exactly as application code would provide the
//! closures backing a code-generated OD table).

use canopen_common::{Address, DataType, Entry, ErrorCode, OrderedMap, Value};
use defmt_or_log::error;

/// A typed read handler slot.
///
/// The discriminant of each variant matches [`DataType`]'s, so a slot's
/// [`ReadSlot::data_type`] can be compared directly against an [`Entry`]'s
/// declared type without unsafe discriminant reinterpretation.
#[derive(Clone, Copy)]
#[repr(u8)]
pub enum ReadSlot {
    Empty = 0,
    U8(fn() -> u8) = 1,
    U16(fn() -> u16) = 2,
    U32(fn() -> u32) = 3,
    U64(fn() -> u64) = 4,
    I8(fn() -> i8) = 5,
    I16(fn() -> i16) = 6,
    I32(fn() -> i32) = 7,
    I64(fn() -> i64) = 8,
}

impl ReadSlot {
    pub const fn data_type(&self) -> DataType {
        match self {
            ReadSlot::Empty => DataType::Empty,
            ReadSlot::U8(_) => DataType::U8,
            ReadSlot::U16(_) => DataType::U16,
            ReadSlot::U32(_) => DataType::U32,
            ReadSlot::U64(_) => DataType::U64,
            ReadSlot::I8(_) => DataType::I8,
            ReadSlot::I16(_) => DataType::I16,
            ReadSlot::I32(_) => DataType::I32,
            ReadSlot::I64(_) => DataType::I64,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, ReadSlot::Empty)
    }
}

/// A typed write handler slot. See [`ReadSlot`].
#[derive(Clone, Copy)]
#[repr(u8)]
pub enum WriteSlot {
    Empty = 0,
    U8(fn(u8) -> ErrorCode) = 1,
    U16(fn(u16) -> ErrorCode) = 2,
    U32(fn(u32) -> ErrorCode) = 3,
    U64(fn(u64) -> ErrorCode) = 4,
    I8(fn(i8) -> ErrorCode) = 5,
    I16(fn(i16) -> ErrorCode) = 6,
    I32(fn(i32) -> ErrorCode) = 7,
    I64(fn(i64) -> ErrorCode) = 8,
}

impl WriteSlot {
    pub const fn data_type(&self) -> DataType {
        match self {
            WriteSlot::Empty => DataType::Empty,
            WriteSlot::U8(_) => DataType::U8,
            WriteSlot::U16(_) => DataType::U16,
            WriteSlot::U32(_) => DataType::U32,
            WriteSlot::U64(_) => DataType::U64,
            WriteSlot::I8(_) => DataType::I8,
            WriteSlot::I16(_) => DataType::I16,
            WriteSlot::I32(_) => DataType::I32,
            WriteSlot::I64(_) => DataType::I64,
        }
    }

    pub const fn is_empty(&self) -> bool {
        matches!(self, WriteSlot::Empty)
    }
}

/// Error registering a handler: the address isn't in the OD, the access
/// direction doesn't allow it, or the handler's type disagrees with the
/// entry's declared [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    NoSuchObject,
    WrongAccessDirection,
    TypeMismatch,
}

/// Call `read_slot`, returning a [`Value`] tagged the same as the slot.
pub fn call_read(slot: &ReadSlot) -> Value {
    match *slot {
        ReadSlot::Empty => Value::Empty,
        ReadSlot::U8(f) => Value::U8(f()),
        ReadSlot::U16(f) => Value::U16(f()),
        ReadSlot::U32(f) => Value::U32(f()),
        ReadSlot::U64(f) => Value::U64(f()),
        ReadSlot::I8(f) => Value::I8(f()),
        ReadSlot::I16(f) => Value::I16(f()),
        ReadSlot::I32(f) => Value::I32(f()),
        ReadSlot::I64(f) => Value::I64(f()),
    }
}

/// Call `write_slot` with `value`, returning [`ErrorCode::GeneralError`] if
/// `value`'s tag disagrees with the slot's.
pub fn call_write(slot: &WriteSlot, value: Value) -> ErrorCode {
    match (*slot, value) {
        (WriteSlot::Empty, _) => ErrorCode::UnsupportedAccess,
        (WriteSlot::U8(f), Value::U8(v)) => f(v),
        (WriteSlot::U16(f), Value::U16(v)) => f(v),
        (WriteSlot::U32(f), Value::U32(v)) => f(v),
        (WriteSlot::U64(f), Value::U64(v)) => f(v),
        (WriteSlot::I8(f), Value::I8(v)) => f(v),
        (WriteSlot::I16(f), Value::I16(v)) => f(v),
        (WriteSlot::I32(f), Value::I32(v)) => f(v),
        (WriteSlot::I64(f), Value::I64(v)) => f(v),
        _ => ErrorCode::GeneralError,
    }
}

/// Typed read/write handler dispatch table.
///
/// `R` and `W` bound the number of readable and writable entries the
/// application's OD declares; they are independent because an entry may be
/// read-only, write-only, or both.
pub struct HandlerRegistry<const R: usize, const W: usize> {
    read: OrderedMap<Address, ReadSlot, R>,
    write: OrderedMap<Address, WriteSlot, W>,
}

impl<const R: usize, const W: usize> HandlerRegistry<R, W> {
    pub const fn new() -> Self {
        HandlerRegistry {
            read: OrderedMap::new(),
            write: OrderedMap::new(),
        }
    }

    /// Reserve empty slots for every readable/writable entry in `od`, in
    /// preparation for [`Self::set_read_handler`]/[`Self::set_write_handler`]
    /// calls. Returns `Err` if `od` has more readable or writable entries
    /// than `R`/`W` allow.
    pub fn build(&mut self, od: &[Entry]) -> Result<(), RegistrationError> {
        for entry in od {
            if entry.access_type.is_readable() {
                self.read
                    .insert(entry.address, ReadSlot::Empty)
                    .map_err(|_| RegistrationError::NoSuchObject)?;
            }
            if entry.access_type.is_writable() {
                self.write
                    .insert(entry.address, WriteSlot::Empty)
                    .map_err(|_| RegistrationError::NoSuchObject)?;
            }
        }
        self.read.sort();
        self.write.sort();
        Ok(())
    }

    /// Install a read handler for `addr`. `od` MUST be the same
    /// (sorted-by-address) table passed to [`Self::build`], and is used to
    /// verify `slot`'s `DataType` agrees with the entry's declared type.
    pub fn set_read_handler(
        &mut self,
        addr: Address,
        slot: ReadSlot,
        od: &[Entry],
    ) -> Result<(), RegistrationError> {
        let entry = find_entry(od, addr).ok_or(RegistrationError::NoSuchObject)?;
        if slot.data_type() != entry.data_type {
            return Err(RegistrationError::TypeMismatch);
        }
        let existing = self
            .read
            .get_mut(addr)
            .ok_or(RegistrationError::NoSuchObject)?;
        *existing = slot;
        Ok(())
    }

    /// Install a write handler for `addr`. See [`Self::set_read_handler`].
    pub fn set_write_handler(
        &mut self,
        addr: Address,
        slot: WriteSlot,
        od: &[Entry],
    ) -> Result<(), RegistrationError> {
        let entry = find_entry(od, addr).ok_or(RegistrationError::NoSuchObject)?;
        if slot.data_type() != entry.data_type {
            return Err(RegistrationError::TypeMismatch);
        }
        let existing = self
            .write
            .get_mut(addr)
            .ok_or(RegistrationError::NoSuchObject)?;
        *existing = slot;
        Ok(())
    }

    pub fn lookup_read(&self, addr: Address) -> Option<&ReadSlot> {
        self.read.get(addr)
    }

    pub fn lookup_write(&self, addr: Address) -> Option<&WriteSlot> {
        self.write.get(addr)
    }

    /// The first readable address whose read slot is still [`ReadSlot::Empty`],
    /// if any.
    pub fn find_missing_read_handler(&self) -> Option<Address> {
        self.read
            .iter()
            .find(|(_, slot)| slot.is_empty())
            .map(|(addr, _)| *addr)
    }

    /// The first writable address whose write slot is still
    /// [`WriteSlot::Empty`], if any.
    pub fn find_missing_write_handler(&self) -> Option<Address> {
        self.write
            .iter()
            .find(|(_, slot)| slot.is_empty())
            .map(|(addr, _)| *addr)
    }

    /// Verify every reserved slot has been installed, logging the first gap
    /// found at error level. Called once by [`crate::Device::new`].
    pub fn check_complete(&self) -> Result<(), RegistrationError> {
        if let Some(addr) = self.find_missing_read_handler() {
            error!(
                "missing read handler for {:04x}:{:02x}",
                addr.index, addr.subindex
            );
            return Err(RegistrationError::NoSuchObject);
        }
        if let Some(addr) = self.find_missing_write_handler() {
            error!(
                "missing write handler for {:04x}:{:02x}",
                addr.index, addr.subindex
            );
            return Err(RegistrationError::NoSuchObject);
        }
        Ok(())
    }
}

impl<const R: usize, const W: usize> Default for HandlerRegistry<R, W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Binary-search `od` (assumed sorted by address, as required of
/// [`crate::Device`]'s OD table) for `addr`.
fn find_entry(od: &[Entry], addr: Address) -> Option<Entry> {
    od.binary_search_by_key(&addr, |e| e.address).ok().map(|i| od[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopen_common::AccessType;

    fn read_42() -> u32 {
        42
    }

    fn accept_write(_v: u32) -> ErrorCode {
        ErrorCode::NoError
    }

    const OD: [Entry; 2] = [
        Entry::new(Address::new(0x2000, 0), DataType::U32, AccessType::Rw, false),
        Entry::new(Address::new(0x2001, 0), DataType::U8, AccessType::Ro, false),
    ];

    #[test]
    fn detects_missing_handlers_until_installed() {
        let mut reg: HandlerRegistry<4, 4> = HandlerRegistry::new();
        reg.build(&OD).unwrap();
        assert!(reg.check_complete().is_err());

        reg.set_read_handler(Address::new(0x2000, 0), ReadSlot::U32(read_42), &OD)
            .unwrap();
        reg.set_write_handler(Address::new(0x2000, 0), WriteSlot::U32(accept_write), &OD)
            .unwrap();
        assert!(reg.check_complete().is_err()); // 0x2001 read still missing

        reg.set_read_handler(Address::new(0x2001, 0), ReadSlot::U8(|| 7), &OD)
            .unwrap();
        assert!(reg.check_complete().is_ok());
    }

    #[test]
    fn rejects_handler_whose_type_disagrees_with_the_entry() {
        let mut reg: HandlerRegistry<4, 4> = HandlerRegistry::new();
        reg.build(&OD).unwrap();

        assert_eq!(
            reg.set_read_handler(Address::new(0x2000, 0), ReadSlot::U8(|| 1), &OD),
            Err(RegistrationError::TypeMismatch)
        );
        assert_eq!(
            reg.set_write_handler(Address::new(0x2000, 0), WriteSlot::U8(|_| ErrorCode::NoError), &OD),
            Err(RegistrationError::TypeMismatch)
        );
    }

    #[test]
    fn dispatch_round_trips_value() {
        let slot = ReadSlot::U32(read_42);
        assert_eq!(call_read(&slot), Value::U32(42));

        let slot = WriteSlot::U32(accept_write);
        assert_eq!(call_write(&slot, Value::U32(9)), ErrorCode::NoError);
        assert_eq!(call_write(&slot, Value::U8(9)), ErrorCode::GeneralError);
    }
}
