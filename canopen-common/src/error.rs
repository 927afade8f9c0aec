//! SDO abort / error codes
//!
//! Mirrors the CANopen object-access abort code taxonomy (CiA 301 §7.3) for
//! exactly the subset this stack can produce: object/sub-index existence,
//! access-direction mismatches, PDO mapping validation, and value-range
//! checks on the PDO-configuration surface.

use int_enum::IntEnum;

/// A CANopen SDO abort / access error code.
///
/// The numeric values match the on-wire SDO abort codes exactly, so an
/// `ErrorCode` can be turned directly into the 4-byte little-endian field of
/// an SDO abort frame via `as u32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntEnum)]
#[repr(u32)]
pub enum ErrorCode {
    NoError = 0x0000_0000,
    /// Unsupported access to an object
    UnsupportedAccess = 0x0601_0000,
    /// Attempt to read a write-only object
    ReadOfWriteOnlyObject = 0x0601_0001,
    /// Attempt to write a read-only object
    WriteOfReadOnlyObject = 0x0601_0002,
    /// Object does not exist in the object dictionary
    ObjectDoesNotExist = 0x0602_0000,
    /// Object cannot be mapped to a PDO
    PdoMappingError = 0x0604_0041,
    /// The number and length of mapped objects would exceed PDO length
    MappingsExceedPdoLength = 0x0604_0042,
    /// Invalid value for download parameter
    InvalidValue = 0x0609_0030,
    /// General error
    GeneralError = 0x0800_0000,
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            ErrorCode::NoError => "no error",
            ErrorCode::UnsupportedAccess => "unsupported access to an object",
            ErrorCode::ReadOfWriteOnlyObject => "attempt to read a write-only object",
            ErrorCode::WriteOfReadOnlyObject => "attempt to write a read-only object",
            ErrorCode::ObjectDoesNotExist => "object does not exist in the object dictionary",
            ErrorCode::PdoMappingError => "object cannot be mapped to a PDO",
            ErrorCode::MappingsExceedPdoLength => {
                "number and length of mapped objects exceeds PDO length"
            }
            ErrorCode::InvalidValue => "invalid value for download parameter",
            ErrorCode::GeneralError => "general error",
        };
        write!(f, "{msg}")
    }
}

impl core::error::Error for ErrorCode {}

#[cfg(test)]
mod tests {
    use super::*;
    use assertables::assert_contains;

    #[test]
    fn display_message_names_the_faulting_access() {
        let msg = ErrorCode::WriteOfReadOnlyObject.to_string();
        assert_contains!(msg, "read-only");
    }

    #[test]
    fn wire_values_match_canopen_abort_codes() {
        assert_eq!(ErrorCode::UnsupportedAccess.int_value(), 0x0601_0000);
        assert_eq!(ErrorCode::ObjectDoesNotExist.int_value(), 0x0602_0000);
        assert_eq!(ErrorCode::PdoMappingError.int_value(), 0x0604_0041);
        assert_eq!(ErrorCode::MappingsExceedPdoLength.int_value(), 0x0604_0042);
        assert_eq!(ErrorCode::InvalidValue.int_value(), 0x0609_0030);
        assert_eq!(ErrorCode::GeneralError.int_value(), 0x0800_0000);
    }
}
