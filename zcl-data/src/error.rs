//! # Error handling

/// Errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Not enough space for the operation
    NotEnoughSpace,
    /// Wrong number of bytes provided to the operation
    WrongNumberOfBytes,
    /// The value provided is invalid
    InvalidValue,
    /// The code path has not been implemented
    NotImplemented,
    /// The frame type is unknown
    UnknownFrameType,
    /// Reserved bits in the frame control field are set
    ReservedBitsSet,
    /// The cluster identifier is unknown
    UnknownClusterIdentifier,
    /// The command identifier is unknown for the cluster
    UnknownCommand,
    /// The attribute value is unsupported
    UnsupportedAttributeValue,
    /// A string does not hold valid UTF-8
    InvalidString,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::NotEnoughSpace => "not enough space",
            Error::WrongNumberOfBytes => "wrong number of bytes",
            Error::InvalidValue => "invalid value",
            Error::NotImplemented => "not implemented",
            Error::UnknownFrameType => "unknown frame type",
            Error::ReservedBitsSet => "reserved bits set",
            Error::UnknownClusterIdentifier => "unknown cluster identifier",
            Error::UnknownCommand => "unknown command",
            Error::UnsupportedAttributeValue => "unsupported attribute value",
            Error::InvalidString => "invalid string",
        };
        f.write_str(text)
    }
}

impl std::error::Error for Error {}
