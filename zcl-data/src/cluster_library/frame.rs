use core::convert::TryFrom;

use crate::error::Error;
use crate::pack::{Pack, PackFixed};

use byteorder::{ByteOrder, LittleEndian};

/// Header size without manufacturer code
pub const HEADER_SIZE: usize = 3;
/// Header size with manufacturer code
pub const HEADER_SIZE_MANUFACTURER: usize = 5;

const FRAME_TYPE_MASK: u8 = 0b0000_0011;
const MANUFACTURER_SPECIFIC: u8 = 0b0000_0100;
const DIRECTION: u8 = 0b0000_1000;
const DISABLE_DEFAULT_RESPONSE: u8 = 0b0001_0000;
const RESERVED_MASK: u8 = 0b1110_0000;

// ZCL, 2.4.1.1.1 Frame Type Sub-field
/// Frame type field
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Foundation command, common for all clusters
    Global = 0b00,
    /// Command is specific or local to a cluster
    Local = 0b01,
}

impl TryFrom<u8> for FrameType {
    type Error = Error;
    /// Get `FrameType` from the frame control field
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value & FRAME_TYPE_MASK {
            0b00 => Ok(FrameType::Global),
            0b01 => Ok(FrameType::Local),
            _ => Err(Error::UnknownFrameType),
        }
    }
}

/// Direction of the command
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Sent from the client side to the server side
    ToServer = 0,
    /// Sent from the server side to the client side
    ToClient = 1,
}

impl Direction {
    /// The direction of a reply to a frame sent in this direction
    pub fn reverse(self) -> Self {
        match self {
            Direction::ToServer => Direction::ToClient,
            Direction::ToClient => Direction::ToServer,
        }
    }
}

impl From<u8> for Direction {
    /// Get `Direction` from the frame control field
    fn from(value: u8) -> Self {
        if value & DIRECTION == DIRECTION {
            Direction::ToClient
        } else {
            Direction::ToServer
        }
    }
}

impl From<Direction> for u8 {
    /// Get the frame control bit of `Direction`
    fn from(value: Direction) -> u8 {
        match value {
            Direction::ToServer => 0,
            Direction::ToClient => DIRECTION,
        }
    }
}

// ZCL, 2.4.1.1 Frame Control Field
/// Cluster library frame control field
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FrameControl {
    /// Frame type, see `FrameType`
    pub frame_type: FrameType,
    /// Manufacturer specific command
    pub manufacturer_specific: bool,
    /// Command direction, see `Direction`
    pub direction: Direction,
    /// Disable default response mechanism
    pub disable_default_response: bool,
}

impl FrameControl {
    /// Frame control for a frame of `frame_type` sent in `direction`
    pub fn new(frame_type: FrameType, direction: Direction) -> Self {
        Self {
            frame_type,
            manufacturer_specific: false,
            direction,
            disable_default_response: false,
        }
    }

    /// Is the frame a cluster specific command
    pub fn is_cluster_specific(&self) -> bool {
        self.frame_type == FrameType::Local
    }
}

impl PackFixed<FrameControl, Error> for FrameControl {
    fn pack(&self, data: &mut [u8]) -> Result<(), Error> {
        if data.len() != 1 {
            Err(Error::WrongNumberOfBytes)
        } else {
            data[0] = self.frame_type as u8
                | if self.manufacturer_specific { MANUFACTURER_SPECIFIC } else { 0 }
                | u8::from(self.direction)
                | if self.disable_default_response { DISABLE_DEFAULT_RESPONSE } else { 0 };
            Ok(())
        }
    }

    fn unpack(data: &[u8]) -> Result<Self, Error> {
        if data.len() != 1 {
            return Err(Error::WrongNumberOfBytes);
        }
        if data[0] & RESERVED_MASK != 0 {
            return Err(Error::ReservedBitsSet);
        }
        Ok(Self {
            frame_type: FrameType::try_from(data[0])?,
            manufacturer_specific: data[0] & MANUFACTURER_SPECIFIC == MANUFACTURER_SPECIFIC,
            direction: Direction::from(data[0]),
            disable_default_response: data[0] & DISABLE_DEFAULT_RESPONSE
                == DISABLE_DEFAULT_RESPONSE,
        })
    }
}

// ZCL, 2.4.1 General ZCL Frame Format
/// Cluster library frame header
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClusterLibraryHeader {
    /// Frame control, see `FrameControl`
    pub control: FrameControl,
    /// Manufacturer code, present when the manufacturer specific bit is set
    pub manufacturer: Option<u16>,
    /// Transaction sequence number
    pub transaction_sequence: u8,
    /// Command identifier
    pub command: u8,
}

impl ClusterLibraryHeader {
    /// Create a header, the manufacturer specific bit follows `manufacturer`
    pub fn new(
        frame_type: FrameType,
        direction: Direction,
        manufacturer: Option<u16>,
        transaction_sequence: u8,
        command: u8,
    ) -> Self {
        let mut control = FrameControl::new(frame_type, direction);
        control.manufacturer_specific = manufacturer.is_some();
        Self {
            control,
            manufacturer,
            transaction_sequence,
            command,
        }
    }

    /// Number of bytes used by the header on the wire
    pub fn size(&self) -> usize {
        if self.manufacturer.is_some() {
            HEADER_SIZE_MANUFACTURER
        } else {
            HEADER_SIZE
        }
    }
}

impl Pack<ClusterLibraryHeader, Error> for ClusterLibraryHeader {
    fn pack(&self, data: &mut [u8]) -> Result<usize, Error> {
        let length = self.size();
        if data.len() < length {
            return Err(Error::WrongNumberOfBytes);
        }
        let mut control = self.control;
        control.manufacturer_specific = self.manufacturer.is_some();
        control.pack(&mut data[0..1])?;
        let mut offset = 1;
        if let Some(manufacturer) = self.manufacturer {
            LittleEndian::write_u16(&mut data[offset..offset + 2], manufacturer);
            offset += 2;
        }
        data[offset] = self.transaction_sequence;
        data[offset + 1] = self.command;
        Ok(offset + 2)
    }

    fn unpack(data: &[u8]) -> Result<(Self, usize), Error> {
        if data.len() < HEADER_SIZE {
            return Err(Error::WrongNumberOfBytes);
        }
        let control = FrameControl::unpack(&data[0..1])?;
        let mut offset = 1;
        let manufacturer = if control.manufacturer_specific {
            if data.len() < HEADER_SIZE_MANUFACTURER {
                return Err(Error::WrongNumberOfBytes);
            }
            let manufacturer = LittleEndian::read_u16(&data[offset..offset + 2]);
            offset += 2;
            Some(manufacturer)
        } else {
            None
        };
        let transaction_sequence = data[offset];
        let command = data[offset + 1];
        Ok((
            Self {
                control,
                manufacturer,
                transaction_sequence,
                command,
            },
            offset + 2,
        ))
    }
}

/// Read the transaction sequence number and command identifier of a frame
/// whose frame control could not be parsed, used to answer malformed frames
pub fn peek_sequence_and_command(data: &[u8]) -> Option<(Direction, u8, u8)> {
    let first = *data.first()?;
    let offset = if first & MANUFACTURER_SPECIFIC == MANUFACTURER_SPECIFIC {
        3
    } else {
        1
    };
    if data.len() < offset + 2 {
        return None;
    }
    Some((Direction::from(first), data[offset], data[offset + 1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_frame_control() {
        let control = FrameControl::unpack(&[0x19]).unwrap();
        assert_eq!(control.frame_type, FrameType::Local);
        assert_eq!(control.manufacturer_specific, false);
        assert_eq!(control.direction, Direction::ToClient);
        assert_eq!(control.disable_default_response, true);

        let control = FrameControl::unpack(&[0x04]).unwrap();
        assert_eq!(control.frame_type, FrameType::Global);
        assert_eq!(control.manufacturer_specific, true);
        assert_eq!(control.direction, Direction::ToServer);
        assert_eq!(control.disable_default_response, false);
    }

    #[test]
    fn unpack_frame_control_rejects_reserved() {
        assert_eq!(FrameControl::unpack(&[0x21]), Err(Error::ReservedBitsSet));
        assert_eq!(FrameControl::unpack(&[0x80]), Err(Error::ReservedBitsSet));
        assert_eq!(FrameControl::unpack(&[0x02]), Err(Error::UnknownFrameType));
        assert_eq!(FrameControl::unpack(&[0x03]), Err(Error::UnknownFrameType));
        assert_eq!(FrameControl::unpack(&[]), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn pack_frame_control() {
        let mut data = [0u8; 1];
        let mut control = FrameControl::new(FrameType::Local, Direction::ToServer);
        control.pack(&mut data).unwrap();
        assert_eq!(data[0], 0x01);
        control.disable_default_response = true;
        control.pack(&mut data).unwrap();
        assert_eq!(data[0], 0x11);
        let mut control = FrameControl::new(FrameType::Global, Direction::ToClient);
        control.manufacturer_specific = true;
        control.pack(&mut data).unwrap();
        assert_eq!(data[0], 0x0c);
    }

    #[test]
    fn unpack_read_attributes_header() {
        // Read attributes, zcl version and power source
        let data = [0x00, 0x2a, 0x00, 0x00, 0x00, 0x07, 0x00];
        let (header, used) = ClusterLibraryHeader::unpack(&data[..]).unwrap();
        assert_eq!(used, 3);
        assert_eq!(header.control.frame_type, FrameType::Global);
        assert_eq!(header.control.direction, Direction::ToServer);
        assert_eq!(header.control.disable_default_response, false);
        assert_eq!(header.manufacturer, None);
        assert_eq!(header.transaction_sequence, 0x2a);
        assert_eq!(header.command, 0x00);
    }

    #[test]
    fn unpack_manufacturer_header() {
        let data = [0x05, 0x5f, 0x11, 0x07, 0x42, 0x01];
        let (header, used) = ClusterLibraryHeader::unpack(&data[..]).unwrap();
        assert_eq!(used, 5);
        assert_eq!(header.control.frame_type, FrameType::Local);
        assert_eq!(header.manufacturer, Some(0x115f));
        assert_eq!(header.transaction_sequence, 0x07);
        assert_eq!(header.command, 0x42);

        let truncated = [0x05, 0x5f, 0x11, 0x07];
        assert_eq!(
            ClusterLibraryHeader::unpack(&truncated[..]),
            Err(Error::WrongNumberOfBytes)
        );
    }

    #[test]
    fn pack_header() {
        let mut buffer = [0u8; 8];
        let header = ClusterLibraryHeader::new(FrameType::Local, Direction::ToClient, None, 0x34, 0x18);
        let used = header.pack(&mut buffer).unwrap();
        assert_eq!(used, 3);
        assert_eq!(buffer[..3], [0x09, 0x34, 0x18]);

        let header = ClusterLibraryHeader::new(
            FrameType::Local,
            Direction::ToClient,
            Some(0x7654),
            0x01,
            0xee,
        );
        let used = header.pack(&mut buffer).unwrap();
        assert_eq!(used, 5);
        assert_eq!(buffer[..5], [0x0d, 0x54, 0x76, 0x01, 0xee]);

        let mut short = [0u8; 4];
        assert_eq!(header.pack(&mut short), Err(Error::WrongNumberOfBytes));
    }

    #[test]
    fn header_round_trip() {
        let frames: [&[u8]; 4] = [
            &[0x00, 0x01, 0x00],
            &[0x18, 0xff, 0x0b],
            &[0x11, 0x80, 0x40],
            &[0x1d, 0x34, 0x12, 0x55, 0x02],
        ];
        for frame in frames.iter() {
            let (header, used) = ClusterLibraryHeader::unpack(frame).unwrap();
            assert_eq!(used, frame.len());
            let mut output = [0u8; 5];
            let written = header.pack(&mut output).unwrap();
            assert_eq!(&output[..written], *frame);
        }
    }

    #[test]
    fn peek_malformed() {
        assert_eq!(
            peek_sequence_and_command(&[0xe0, 0x10, 0x02]),
            Some((Direction::ToServer, 0x10, 0x02))
        );
        assert_eq!(peek_sequence_and_command(&[0x00, 0x10]), None);
    }
}
