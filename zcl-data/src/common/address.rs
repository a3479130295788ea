//! # Addresses seen by the cluster library

use core::default::Default;

use crate::pack::PackFixed;
use crate::Error;

use byteorder::{ByteOrder, LittleEndian};

/// Short address size
pub const SHORT_ADDRESS_SIZE: usize = 2;
/// Short address, broadcast to all devices
pub const SHORT_ADDRESS_BROADCAST: u16 = 0xffff;
/// Short address, no address, used as the address-mode none sentinel
pub const SHORT_ADDRESS_NONE: u16 = 0xffff;
/// Short address, unassigned address
pub const SHORT_ADDRESS_UNASSIGNED: u16 = 0xfffe;

/// 16-bit short address
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShortAddress(u16);

impl ShortAddress {
    /// Create a short address
    pub fn new(value: u16) -> Self {
        Self(value)
    }

    /// The broadcast address
    pub fn broadcast() -> Self {
        Self(SHORT_ADDRESS_BROADCAST)
    }

    /// Is this the broadcast address
    pub fn is_broadcast(self) -> bool {
        self.0 >= 0xfffc
    }

    /// Is this an assigned unicast address
    pub fn is_assigned(self) -> bool {
        self.0 < 0xfff8
    }
}

impl PackFixed<ShortAddress, Error> for ShortAddress {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() == SHORT_ADDRESS_SIZE {
            LittleEndian::write_u16(data, self.0);
            Ok(())
        } else {
            Err(Error::NotEnoughSpace)
        }
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() == SHORT_ADDRESS_SIZE {
            Ok(ShortAddress(LittleEndian::read_u16(data)))
        } else {
            Err(Error::WrongNumberOfBytes)
        }
    }
}

impl From<u16> for ShortAddress {
    fn from(value: u16) -> Self {
        ShortAddress(value)
    }
}

impl From<ShortAddress> for u16 {
    fn from(value: ShortAddress) -> Self {
        value.0
    }
}

impl PartialEq<u16> for ShortAddress {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

impl Default for ShortAddress {
    fn default() -> Self {
        Self(SHORT_ADDRESS_NONE)
    }
}

impl core::fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04x}", self.0)
    }
}

/// Extended IEEE address size
pub const EXTENDED_ADDRESS_SIZE: usize = 8;
/// Extended IEEE address, all ones, address is unknown
pub const EXTENDED_ADDRESS_UNKNOWN: u64 = 0xffff_ffff_ffff_ffffu64;

/// 64-bit extended IEEE address
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtendedAddress(u64);

impl ExtendedAddress {
    /// Create a extended address
    pub fn new(address: u64) -> Self {
        Self(address)
    }

    /// The unknown address
    pub fn unknown() -> Self {
        Self(EXTENDED_ADDRESS_UNKNOWN)
    }

    /// Is this the all ones, unknown, address
    pub fn is_unknown(self) -> bool {
        self.0 == EXTENDED_ADDRESS_UNKNOWN
    }

    /// Is this a usable address, not zero and not unknown
    pub fn is_valid(self) -> bool {
        self.0 != 0 && !self.is_unknown()
    }
}

impl PackFixed<ExtendedAddress, Error> for ExtendedAddress {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() == EXTENDED_ADDRESS_SIZE {
            LittleEndian::write_u64(data, self.0);
            Ok(())
        } else {
            Err(Error::NotEnoughSpace)
        }
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() == EXTENDED_ADDRESS_SIZE {
            Ok(ExtendedAddress(LittleEndian::read_u64(data)))
        } else {
            Err(Error::WrongNumberOfBytes)
        }
    }
}

impl From<u64> for ExtendedAddress {
    fn from(value: u64) -> Self {
        ExtendedAddress(value)
    }
}

impl From<ExtendedAddress> for u64 {
    fn from(value: ExtendedAddress) -> Self {
        value.0
    }
}

impl PartialEq<u64> for ExtendedAddress {
    fn eq(&self, other: &u64) -> bool {
        self.0 == *other
    }
}

impl Default for ExtendedAddress {
    fn default() -> Self {
        Self(EXTENDED_ADDRESS_UNKNOWN)
    }
}

impl core::fmt::Display for ExtendedAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            ((self.0 >> 56) & 0xff) as u8,
            ((self.0 >> 48) & 0xff) as u8,
            ((self.0 >> 40) & 0xff) as u8,
            ((self.0 >> 32) & 0xff) as u8,
            ((self.0 >> 24) & 0xff) as u8,
            ((self.0 >> 16) & 0xff) as u8,
            ((self.0 >> 8) & 0xff) as u8,
            ((self.0) & 0xff) as u8,
        )
    }
}

/// Source or destination of a cluster library frame
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// 16-bit network address
    Short(ShortAddress),
    /// 64-bit IEEE address
    Extended(ExtendedAddress),
    /// Green power device identified by its 32-bit source identifier
    GreenPowerSource(u32),
    /// Green power device identified by IEEE address and endpoint
    GreenPowerIeee(ExtendedAddress, u8),
}

impl Address {
    /// The IEEE address, when the address carries one
    pub fn extended(&self) -> Option<ExtendedAddress> {
        match self {
            Address::Extended(address) | Address::GreenPowerIeee(address, _) => Some(*address),
            _ => None,
        }
    }

    /// The short address, when the address carries one
    pub fn short(&self) -> Option<ShortAddress> {
        match self {
            Address::Short(address) => Some(*address),
            _ => None,
        }
    }
}

impl Default for Address {
    fn default() -> Self {
        Address::Short(ShortAddress::default())
    }
}

impl core::fmt::Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Address::Short(a) => write!(f, "{}", a),
            Address::Extended(a) => write!(f, "{}", a),
            Address::GreenPowerSource(id) => write!(f, "gp:{:08x}", id),
            Address::GreenPowerIeee(a, endpoint) => write!(f, "gp:{}/{}", a, endpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_address() {
        let a_zero = ShortAddress(0);
        assert_eq!(format!("{}", a_zero), "0000");
        assert_eq!(a_zero, 0u16);
        let a = ShortAddress::unpack(&[0x81, 0x45]).unwrap();
        assert_eq!(format!("{}", a), "4581");
        assert_eq!(a, 0x4581);
        let mut buf = [0; 2];
        a.pack(&mut buf).unwrap();
        assert_eq!(buf, [0x81, 0x45]);
        assert!(ShortAddress::default().is_broadcast());
        assert!(!ShortAddress::default().is_assigned());
    }

    #[test]
    fn extended_address() {
        let a = ExtendedAddress::unpack(&[0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22]).unwrap();
        assert_eq!(format!("{}", a), "22:33:44:55:66:77:88:99");
        assert_eq!(a, 0x2233_4455_6677_8899);
        let mut buf = [0; 8];
        a.pack(&mut buf).unwrap();
        assert_eq!(buf, [0x99, 0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22]);
        assert!(a.is_valid());
        assert!(ExtendedAddress::default().is_unknown());
        assert!(!ExtendedAddress::new(0).is_valid());
    }

    #[test]
    fn address_variants() {
        let ieee = ExtendedAddress::new(0x0011_2233_4455_6677);
        assert_eq!(Address::Extended(ieee).extended(), Some(ieee));
        assert_eq!(Address::GreenPowerIeee(ieee, 2).extended(), Some(ieee));
        assert_eq!(Address::GreenPowerSource(0x1234_5678).extended(), None);
        assert_eq!(
            Address::Short(ShortAddress::new(0x1234)).short(),
            Some(ShortAddress::new(0x1234))
        );
        assert_eq!(format!("{}", Address::GreenPowerSource(0xabcd)), "gp:0000abcd");
    }
}
