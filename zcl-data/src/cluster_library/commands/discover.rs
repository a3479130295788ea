//! Attribute and command discovery

use byteorder::{ByteOrder, LittleEndian};

use super::attributes::data_type;
use crate::cluster_library::{AttributeDataType, AttributeIdentifier};
use crate::pack::Pack;
use crate::utils::check_length;
use crate::Error;

/// Discover attributes request, also used for the extended variant
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscoverAttributes {
    /// First attribute identifier to include
    pub start: AttributeIdentifier,
    /// Maximum number of attributes to return
    pub maximum: u8,
}

impl Pack<DiscoverAttributes, Error> for DiscoverAttributes {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 3 {
            return Err(Error::NotEnoughSpace);
        }
        LittleEndian::write_u16(&mut data[0..2], self.start);
        data[2] = self.maximum;
        Ok(3)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 3)?;
        Ok((
            Self {
                start: LittleEndian::read_u16(&data[0..2]),
                maximum: data[2],
            },
            3,
        ))
    }
}

/// Discovered attribute
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttributeInformation {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Data type
    pub data_type: AttributeDataType,
}

/// Discover attributes response
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoverAttributesResponse {
    /// No more attributes remain after these
    pub complete: bool,
    /// Discovered attributes
    pub attributes: Vec<AttributeInformation>,
}

impl Pack<DiscoverAttributesResponse, Error> for DiscoverAttributesResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 1 + self.attributes.len() * 3 {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = self.complete as u8;
        let mut offset = 1;
        for attribute in self.attributes.iter() {
            LittleEndian::write_u16(&mut data[offset..offset + 2], attribute.identifier);
            data[offset + 2] = u8::from(attribute.data_type);
            offset += 3;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 1)?;
        if (data.len() - 1) % 3 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut attributes = Vec::with_capacity((data.len() - 1) / 3);
        for chunk in data[1..].chunks_exact(3) {
            attributes.push(AttributeInformation {
                identifier: LittleEndian::read_u16(&chunk[0..2]),
                data_type: data_type(chunk[2])?,
            });
        }
        Ok((
            Self {
                complete: data[0] != 0,
                attributes,
            },
            data.len(),
        ))
    }
}

bitflags! {
    /// Access control reported by discover attributes extended
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct AttributeAccessControl: u8 {
        /// Readable
        const READ = 0b0000_0001;
        /// Writable
        const WRITE = 0b0000_0010;
        /// Reportable
        const REPORT = 0b0000_0100;
    }
}

/// Discovered attribute with access control
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtendedAttributeInformation {
    /// Attribute identifier
    pub identifier: AttributeIdentifier,
    /// Data type
    pub data_type: AttributeDataType,
    /// Access control
    pub access: AttributeAccessControl,
}

/// Discover attributes extended response
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoverAttributesExtendedResponse {
    /// No more attributes remain after these
    pub complete: bool,
    /// Discovered attributes
    pub attributes: Vec<ExtendedAttributeInformation>,
}

impl Pack<DiscoverAttributesExtendedResponse, Error> for DiscoverAttributesExtendedResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 1 + self.attributes.len() * 4 {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = self.complete as u8;
        let mut offset = 1;
        for attribute in self.attributes.iter() {
            LittleEndian::write_u16(&mut data[offset..offset + 2], attribute.identifier);
            data[offset + 2] = u8::from(attribute.data_type);
            data[offset + 3] = attribute.access.bits();
            offset += 4;
        }
        Ok(offset)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 1)?;
        if (data.len() - 1) % 4 != 0 {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut attributes = Vec::with_capacity((data.len() - 1) / 4);
        for chunk in data[1..].chunks_exact(4) {
            attributes.push(ExtendedAttributeInformation {
                identifier: LittleEndian::read_u16(&chunk[0..2]),
                data_type: data_type(chunk[2])?,
                access: AttributeAccessControl::from_bits_truncate(chunk[3]),
            });
        }
        Ok((
            Self {
                complete: data[0] != 0,
                attributes,
            },
            data.len(),
        ))
    }
}

/// Discover commands received or generated request
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscoverCommands {
    /// First command identifier to include
    pub start: u8,
    /// Maximum number of commands to return
    pub maximum: u8,
}

impl Pack<DiscoverCommands, Error> for DiscoverCommands {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 2 {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = self.start;
        data[1] = self.maximum;
        Ok(2)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 2)?;
        Ok((
            Self {
                start: data[0],
                maximum: data[1],
            },
            2,
        ))
    }
}

/// Discover commands received or generated response
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoverCommandsResponse {
    /// No more commands remain after these
    pub complete: bool,
    /// Command identifiers
    pub commands: Vec<u8>,
}

impl Pack<DiscoverCommandsResponse, Error> for DiscoverCommandsResponse {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        if data.len() < 1 + self.commands.len() {
            return Err(Error::NotEnoughSpace);
        }
        data[0] = self.complete as u8;
        data[1..=self.commands.len()].copy_from_slice(&self.commands);
        Ok(1 + self.commands.len())
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        check_length(data, 1)?;
        Ok((
            Self {
                complete: data[0] != 0,
                commands: data[1..].to_vec(),
            },
            data.len(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_attributes() {
        let (cmd, used) = DiscoverAttributes::unpack(&[0x00, 0x00, 0x10]).unwrap();
        assert_eq!(used, 3);
        assert_eq!(cmd, DiscoverAttributes { start: 0, maximum: 16 });
        assert_eq!(DiscoverAttributes::unpack(&[0x00, 0x00]), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn discover_attributes_response() {
        let response = DiscoverAttributesResponse {
            complete: true,
            attributes: vec![
                AttributeInformation {
                    identifier: 0x0000,
                    data_type: AttributeDataType::Boolean,
                },
                AttributeInformation {
                    identifier: 0xfffd,
                    data_type: AttributeDataType::Unsigned16,
                },
            ],
        };
        let mut out = [0u8; 16];
        let used = response.pack(&mut out).unwrap();
        assert_eq!(out[..used], [0x01, 0x00, 0x00, 0x10, 0xfd, 0xff, 0x21]);
        let (parsed, _) = DiscoverAttributesResponse::unpack(&out[..used]).unwrap();
        assert_eq!(parsed, response);
    }

    #[test]
    fn discover_attributes_extended_response() {
        let data = [0x00, 0x00, 0x00, 0x10, 0x05, 0x00, 0x40, 0x21, 0x03];
        let (parsed, _) = DiscoverAttributesExtendedResponse::unpack(&data).unwrap();
        assert!(!parsed.complete);
        assert_eq!(
            parsed.attributes[0].access,
            AttributeAccessControl::READ | AttributeAccessControl::REPORT
        );
        assert_eq!(
            parsed.attributes[1].access,
            AttributeAccessControl::READ | AttributeAccessControl::WRITE
        );
    }

    #[test]
    fn discover_commands() {
        let (cmd, _) = DiscoverCommands::unpack(&[0x02, 0x05]).unwrap();
        assert_eq!(cmd.start, 2);
        let response = DiscoverCommandsResponse {
            complete: true,
            commands: vec![0x00, 0x01, 0x02],
        };
        let mut out = [0u8; 8];
        let used = response.pack(&mut out).unwrap();
        assert_eq!(out[..used], [0x01, 0x00, 0x01, 0x02]);
    }
}
